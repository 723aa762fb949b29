//! Climate-scenario raster lookup.
//!
//! The scenario cube maps (study area × scenario × year) to the raster
//! pair holding the projected habitat classification and its accretion
//! layer. Missing combinations are "unavailable", not errors: a study
//! area may lack future-scenario rasters while still supporting
//! current-condition analysis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::registry::RasterPair;

/// Climate-change scenario identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Scenario {
    /// Regional downscaled model, moderate emissions (RCP4.5).
    #[serde(rename = "regional_rcp45")]
    RegionalModerate,
    /// Regional downscaled model, high emissions (RCP8.5).
    #[serde(rename = "regional_rcp85")]
    RegionalHigh,
    /// Global model, moderate emissions (RCP4.5).
    #[serde(rename = "global_rcp45")]
    GlobalModerate,
}

impl Scenario {
    /// All scenarios in display order.
    pub const ALL: [Scenario; 3] = [
        Scenario::RegionalModerate,
        Scenario::RegionalHigh,
        Scenario::GlobalModerate,
    ];

    /// Stable key used in registry files and raster directory names.
    pub fn key(&self) -> &'static str {
        match self {
            Scenario::RegionalModerate => "regional_rcp45",
            Scenario::RegionalHigh => "regional_rcp85",
            Scenario::GlobalModerate => "global_rcp45",
        }
    }

    /// Human-readable label for tab headers.
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::RegionalModerate => "Regional RCP4.5",
            Scenario::RegionalHigh => "Regional RCP8.5",
            Scenario::GlobalModerate => "Global RCP4.5",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Rasters of one (area, scenario) pair, keyed by year label.
type YearMap = BTreeMap<String, RasterPair>;

/// The (study area × scenario × year) → raster-pair lookup structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioCube {
    areas: BTreeMap<String, BTreeMap<Scenario, YearMap>>,
}

impl ScenarioCube {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster pair. Replaces any previous entry for the key.
    pub fn insert(
        &mut self,
        area: impl Into<String>,
        scenario: Scenario,
        year: impl Into<String>,
        pair: RasterPair,
    ) {
        self.areas
            .entry(area.into())
            .or_default()
            .entry(scenario)
            .or_default()
            .insert(year.into(), pair);
    }

    /// Year labels available for an (area, scenario) pair, in stable
    /// order: numeric when every label parses as an integer, lexical
    /// otherwise. Unconfigured pairs yield an empty listing.
    pub fn years_for(&self, area: &str, scenario: Scenario) -> Vec<String> {
        let mut years: Vec<String> = self
            .areas
            .get(area)
            .and_then(|scens| scens.get(&scenario))
            .map(|by_year| by_year.keys().cloned().collect())
            .unwrap_or_default();

        if years.iter().all(|y| y.parse::<i64>().is_ok()) {
            years.sort_by_key(|y| y.parse::<i64>().unwrap_or(i64::MAX));
        } else {
            years.sort();
        }
        years
    }

    /// The raster pair for (area, scenario, year), or `None` when the
    /// combination is unavailable.
    pub fn paths_for(&self, area: &str, scenario: Scenario, year: &str) -> Option<&RasterPair> {
        self.areas
            .get(area)?
            .get(&scenario)?
            .get(year)
    }

    /// True when the area has at least one scenario configured.
    pub fn area_available(&self, area: &str) -> bool {
        self.areas
            .get(area)
            .map(|scens| scens.values().any(|by_year| !by_year.is_empty()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str) -> RasterPair {
        RasterPair {
            habitat: format!("{name}.tif").into(),
            accretion: format!("{name}_accretion.tif").into(),
        }
    }

    #[test]
    fn test_years_sorted_numerically() {
        let mut cube = ScenarioCube::new();
        cube.insert("Cadiz_Bay", Scenario::RegionalModerate, "2123", pair("c"));
        cube.insert("Cadiz_Bay", Scenario::RegionalModerate, "2023", pair("a"));
        cube.insert("Cadiz_Bay", Scenario::RegionalModerate, "2073", pair("b"));
        assert_eq!(
            cube.years_for("Cadiz_Bay", Scenario::RegionalModerate),
            vec!["2023", "2073", "2123"]
        );
    }

    #[test]
    fn test_years_fall_back_to_lexical() {
        let mut cube = ScenarioCube::new();
        cube.insert("X", Scenario::GlobalModerate, "baseline", pair("a"));
        cube.insert("X", Scenario::GlobalModerate, "2100", pair("b"));
        assert_eq!(
            cube.years_for("X", Scenario::GlobalModerate),
            vec!["2100", "baseline"]
        );
    }

    #[test]
    fn test_unconfigured_pair_is_unavailable_not_error() {
        let cube = ScenarioCube::new();
        assert!(cube.years_for("Nowhere", Scenario::RegionalHigh).is_empty());
        assert!(cube
            .paths_for("Nowhere", Scenario::RegionalHigh, "2062")
            .is_none());
        assert!(!cube.area_available("Nowhere"));
    }

    #[test]
    fn test_paths_for_hit() {
        let mut cube = ScenarioCube::new();
        cube.insert("Urdaibai_Estuary", Scenario::RegionalHigh, "2067", pair("oka"));
        let hit = cube
            .paths_for("Urdaibai_Estuary", Scenario::RegionalHigh, "2067")
            .unwrap();
        assert_eq!(hit.habitat.to_str().unwrap(), "oka.tif");
        assert!(cube.area_available("Urdaibai_Estuary"));
    }

    #[test]
    fn test_scenario_keys_roundtrip_serde() {
        let yaml = "regional_rcp85";
        let s: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s, Scenario::RegionalHigh);
        assert_eq!(serde_yaml::to_string(&s).unwrap().trim(), "regional_rcp85");
    }
}
