//! The fixed habitat classification used by the saltmarsh rasters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ecosystem class codes of the classified habitat rasters.
///
/// Every habitat raster pixel holds one of these four integer codes.
/// Result tables always report the classes in this order, present in
/// the query geometry or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcosystemClass {
    Mudflat = 0,
    Saltmarsh = 1,
    Upland = 2,
    Channel = 3,
}

impl EcosystemClass {
    /// All classes in display order.
    pub const ALL: [EcosystemClass; 4] = [
        EcosystemClass::Mudflat,
        EcosystemClass::Saltmarsh,
        EcosystemClass::Upland,
        EcosystemClass::Channel,
    ];

    /// Decode a raster pixel value. Values outside 0..=3 are nodata.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EcosystemClass::Mudflat),
            1 => Some(EcosystemClass::Saltmarsh),
            2 => Some(EcosystemClass::Upland),
            3 => Some(EcosystemClass::Channel),
            _ => None,
        }
    }

    /// The integer pixel code of this class.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Human-readable label used in result tables and legends.
    pub fn label(&self) -> &'static str {
        match self {
            EcosystemClass::Mudflat => "Mudflat",
            EcosystemClass::Saltmarsh => "Saltmarsh",
            EcosystemClass::Upland => "Upland Areas",
            EcosystemClass::Channel => "Channel",
        }
    }

    /// Legend color for map rendering.
    pub fn color(&self) -> &'static str {
        match self {
            EcosystemClass::Mudflat => "#8B4513",
            EcosystemClass::Saltmarsh => "#006400",
            EcosystemClass::Upland => "#636363",
            EcosystemClass::Channel => "#31C2F3",
        }
    }

    /// Accretion is only a defined quantity on wetland surfaces.
    pub fn supports_accretion(&self) -> bool {
        matches!(self, EcosystemClass::Mudflat | EcosystemClass::Saltmarsh)
    }
}

impl fmt::Display for EcosystemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
