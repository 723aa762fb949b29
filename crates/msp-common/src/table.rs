//! Result-table types returned by the zonal aggregators.
//!
//! Both aggregators return ordered rows with a fixed column set, and
//! the column headers survive even when no rows do, so downstream
//! rendering distinguishes "no data" from "error" by the table shape.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::class::EcosystemClass;

/// A secondary metric that is either a number or explicitly
/// not applicable.
///
/// "Not applicable" and `0.0` are different statements: accretion of
/// zero on a saltmarsh is a measurement, accretion on upland is not a
/// defined quantity. The sentinel is preserved verbatim through
/// serialization, never coerced to a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    NotApplicable(NaMarker),
}

/// Serialization marker for [`Metric::NotApplicable`], rendered "N/A".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NaMarker {
    #[serde(rename = "N/A")]
    Na,
}

impl Metric {
    /// The not-applicable sentinel.
    pub const NA: Metric = Metric::NotApplicable(NaMarker::Na);

    /// A numeric value rounded to `dp` decimal places.
    pub fn rounded(value: f64, dp: u32) -> Self {
        Metric::Value(round_to(value, dp))
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Metric::NotApplicable(_))
    }

    pub fn as_value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::NotApplicable(_) => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v}"),
            Metric::NotApplicable(_) => write!(f, "N/A"),
        }
    }
}

/// Round half-away-from-zero to `dp` decimal places.
pub fn round_to(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

/// One row of the vector (EUNIS) summary: habitat category, extent in
/// km² and the area-weighted condition score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorZonalRow {
    pub category: String,
    pub extent_km2: f64,
    pub condition: Metric,
}

/// The vector summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorZonalTable {
    /// Column headers, stable even for zero rows.
    pub columns: Vec<String>,
    pub rows: Vec<VectorZonalRow>,
}

impl VectorZonalTable {
    pub const COLUMNS: [&'static str; 3] = ["Habitat type", "Area (km²)", "Condition"];

    /// An empty table with the canonical headers.
    pub fn empty() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<VectorZonalRow>) -> Self {
        Self {
            columns: Self::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the raster (saltmarsh) summary: ecosystem class, extent
/// in hectares and the accretion volume in m³/yr.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterZonalRow {
    pub ecosystem_class: EcosystemClass,
    pub extent_ha: f64,
    pub accretion_m3_per_yr: Metric,
}

/// The raster summary table: always exactly one row per class, in the
/// fixed class order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterZonalTable {
    pub columns: Vec<String>,
    pub rows: Vec<RasterZonalRow>,
}

impl RasterZonalTable {
    pub const COLUMNS: [&'static str; 3] =
        ["Ecosystem class", "Extent (ha)", "Accretion (m³/yr)"];

    pub fn with_rows(rows: Vec<RasterZonalRow>) -> Self {
        debug_assert_eq!(rows.len(), EcosystemClass::ALL.len());
        Self {
            columns: Self::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// The all-zero table reported for an empty query geometry:
    /// wetland classes measure 0.0 accretion, the rest stay N/A.
    pub fn zeroed() -> Self {
        let rows = EcosystemClass::ALL
            .iter()
            .map(|&class| RasterZonalRow {
                ecosystem_class: class,
                extent_ha: 0.0,
                accretion_m3_per_yr: if class.supports_accretion() {
                    Metric::Value(0.0)
                } else {
                    Metric::NA
                },
            })
            .collect();
        Self::with_rows(rows)
    }
}

/// Bucket a 0–5 condition score into the discrete legend class 0..=5,
/// where 0 is nodata. Scores at a bin edge fall into the lower bin,
/// matching the choropleth legend ranges.
pub fn condition_class(score: Option<f64>) -> u8 {
    match score {
        None => 0,
        Some(v) if !v.is_finite() || v < 0.0 => 0,
        Some(v) => {
            let v = v.min(5.0);
            (v.ceil().max(1.0)) as u8
        }
    }
}
