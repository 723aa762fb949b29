//! Reference-layer registry.
//!
//! A read-only configuration store mapping study areas to their
//! reference datasets: the EUNIS habitat layer and the current-condition
//! saltmarsh raster pair, plus the climate-scenario cube. Loaded once at
//! process start by the hosting application and injected into the
//! aggregators as a parameter, never consulted through a global.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{MspError, MspResult};
use crate::scenario::ScenarioCube;

/// A habitat-classification raster and its paired accretion raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterPair {
    /// Single-band classified habitat raster (integer class codes).
    pub habitat: PathBuf,
    /// Continuous annual-accretion raster, co-registered or
    /// reprojectable onto the habitat grid.
    pub accretion: PathBuf,
}

/// Static mapping from study-area identifiers to reference datasets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerRegistry {
    /// Study area → EUNIS reference polygon layer path.
    #[serde(default)]
    eunis: BTreeMap<String, PathBuf>,

    /// Study area → current-condition saltmarsh raster pair.
    #[serde(default)]
    saltmarsh: BTreeMap<String, RasterPair>,

    /// Projected future habitat states.
    #[serde(default)]
    scenarios: ScenarioCube,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry from a YAML file.
    pub fn from_yaml_file(path: &Path) -> MspResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse the registry from YAML text.
    pub fn from_yaml_str(text: &str) -> MspResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| MspError::ConfigError(format!("registry YAML: {e}")))
    }

    /// Register an EUNIS layer for a study area.
    pub fn with_eunis_layer(mut self, area: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.eunis.insert(area.into(), path.into());
        self
    }

    /// Register a current-condition raster pair for a study area.
    pub fn with_saltmarsh_pair(mut self, area: impl Into<String>, pair: RasterPair) -> Self {
        self.saltmarsh.insert(area.into(), pair);
        self
    }

    /// Mutable access to the scenario cube, for registry construction.
    pub fn scenarios_mut(&mut self) -> &mut ScenarioCube {
        &mut self.scenarios
    }

    /// The scenario cube.
    pub fn scenarios(&self) -> &ScenarioCube {
        &self.scenarios
    }

    pub fn eunis_available(&self, area: &str) -> bool {
        self.eunis.contains_key(area)
    }

    /// The EUNIS layer path for a study area, or an `UnknownStudyArea`
    /// error naming the area.
    pub fn eunis_path(&self, area: &str) -> MspResult<&Path> {
        self.eunis
            .get(area)
            .map(PathBuf::as_path)
            .ok_or_else(|| MspError::UnknownStudyArea(area.to_string()))
    }

    pub fn saltmarsh_available(&self, area: &str) -> bool {
        self.saltmarsh.contains_key(area)
    }

    /// The current-condition raster pair for a study area.
    pub fn saltmarsh_pair(&self, area: &str) -> MspResult<&RasterPair> {
        self.saltmarsh
            .get(area)
            .ok_or_else(|| MspError::UnknownStudyArea(area.to_string()))
    }

    /// Study areas with any reference data, for UI listings.
    pub fn areas(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .eunis
            .keys()
            .chain(self.saltmarsh.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Locate the accretion raster paired with a habitat raster.
///
/// The expected name is `<stem>_accretion.<ext>` next to the habitat
/// file; when that exact file is missing, the directory is scanned for
/// the first `<stem>*_accretion.<ext>` variant.
pub fn discover_accretion_path(habitat: &Path) -> Option<PathBuf> {
    let stem = habitat.file_stem()?.to_str()?;
    let ext = habitat.extension()?.to_str()?;
    let dir = habitat.parent()?;

    let exact = dir.join(format!("{stem}_accretion.{ext}"));
    if exact.exists() {
        return Some(exact);
    }

    let suffix = format!("_accretion.{ext}");
    let mut hits: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(stem) && n.ends_with(&suffix))
                .unwrap_or(false)
        })
        .collect();
    hits.sort();
    hits.into_iter().next()
}
