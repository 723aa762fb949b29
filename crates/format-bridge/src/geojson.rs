//! GeoJSON ingestion (RFC 7946).

use geojson::GeoJson;
use serde_json::Map;
use tracing::debug;

use msp_common::{CrsDef, MspError, MspResult};

use crate::feature::{FeatureRecord, FeatureSet};

/// Parse GeoJSON text into the canonical feature collection.
///
/// Accepts a `FeatureCollection`, a single `Feature` or a bare
/// geometry. Features whose geometry is missing or fails conversion
/// are skipped and counted. RFC 7946 fixes the CRS to WGS84.
pub fn parse_geojson_str(text: &str) -> MspResult<FeatureSet> {
    let parsed: GeoJson = text
        .parse()
        .map_err(|e| MspError::vector_read(format!("GeoJSON parse: {e}")))?;

    let gj_features = match parsed {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    let mut features = Vec::with_capacity(gj_features.len());
    let mut skipped = 0usize;

    for gj_feature in gj_features {
        let Some(gj_geometry) = gj_feature.geometry else {
            skipped += 1;
            continue;
        };
        match geo_types::Geometry::<f64>::try_from(gj_geometry.value) {
            Ok(geometry) => features.push(FeatureRecord {
                geometry,
                properties: gj_feature.properties.unwrap_or_else(Map::new),
            }),
            Err(e) => {
                debug!(error = %e, "skipping unconvertible GeoJSON geometry");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!(skipped, kept = features.len(), "GeoJSON ingestion dropped features");
    }

    Ok(FeatureSet {
        features,
        crs: CrsDef::wgs84(),
        skipped,
    })
}
