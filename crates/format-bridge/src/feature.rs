//! The canonical in-memory feature collection.

use geo_types::Geometry;
use serde_json::{Map, Value};

use msp_common::CrsDef;

/// One input row/feature: a geometry plus its remaining attributes.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl FeatureRecord {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    /// A property as f64, when present and numeric.
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    /// A property rendered as a display string. Strings come through
    /// unquoted; other JSON values use their JSON rendering.
    pub fn property_string(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// The FeatureCollection-equivalent every format path converges on.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub features: Vec<FeatureRecord>,
    /// CRS of the feature geometries.
    pub crs: CrsDef,
    /// Rows/features dropped during parsing; observable so callers and
    /// tests can assert on partial-failure behavior.
    pub skipped: usize,
}

impl FeatureSet {
    /// An empty collection in the canonical geographic CRS.
    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            crs: CrsDef::wgs84(),
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// All attribute column names appearing on any feature, sorted.
    pub fn attribute_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .features
            .iter()
            .flat_map(|f| f.properties.keys().cloned())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Resolve a column name case-insensitively to the stored spelling.
    pub fn resolve_column(&self, name: &str) -> Option<String> {
        let wanted = name.to_ascii_lowercase();
        self.features
            .iter()
            .flat_map(|f| f.properties.keys())
            .find(|k| k.to_ascii_lowercase() == wanted)
            .cloned()
    }
}
