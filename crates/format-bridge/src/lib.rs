//! Vector file format bridging.
//!
//! Converts uploaded vector files (GeoJSON per RFC 7946 or
//! Parquet-encoded vector data) into the one canonical in-memory
//! feature collection consumed by the aggregation core. Individual
//! rows or features that fail to parse are skipped and counted, not
//! fatal: partial success beats refusing an entire upload over one
//! malformed feature.

pub mod feature;
pub mod geojson;
pub mod parquet;

pub use feature::{FeatureRecord, FeatureSet};

use std::path::Path;

use msp_common::{MspError, MspResult};

/// Read a vector file into the canonical feature collection,
/// dispatching on the file extension.
pub fn read_vector_file(path: &Path) -> MspResult<FeatureSet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" | "geojson" => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| MspError::vector_read(format!("{}: {e}", path.display())))?;
            geojson::parse_geojson_str(&text)
        }
        "parquet" => parquet::read_parquet_file(path),
        other => Err(MspError::vector_read(format!(
            "unsupported vector format '.{other}' for {}",
            path.display()
        ))),
    }
}
