//! Parquet-encoded vector ingestion.
//!
//! Tries the geometry-aware path first: GeoParquet files carry a `geo`
//! entry in the file metadata naming the primary WKB geometry column.
//! Files without it fall back to recovery heuristics, in priority
//! order: a well-known-text column (any name containing "wkt"), a
//! well-known-binary `geometry` column, then paired longitude/latitude
//! columns. The first heuristic yielding at least one parseable
//! geometry wins; rows that fail to parse are dropped and counted.

use std::fs::File;
use std::path::Path;

use arrow::array::{
    Array, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeBinaryArray, LargeStringArray, StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use geo_types::{Geometry, Point};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value;
use tracing::debug;
use wkt::TryFromWkt;

use msp_common::{CrsDef, MspError, MspResult};

use crate::feature::{FeatureRecord, FeatureSet};

const LON_NAMES: [&str; 3] = ["lon", "longitude", "x"];
const LAT_NAMES: [&str; 3] = ["lat", "latitude", "y"];

/// Read a Parquet vector file into the canonical feature collection.
pub fn read_parquet_file(path: &Path) -> MspResult<FeatureSet> {
    let file = File::open(path)
        .map_err(|e| MspError::vector_read(format!("{}: {e}", path.display())))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| MspError::vector_read(format!("{}: {e}", path.display())))?;

    let geo_meta: Option<Value> = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kvs| kvs.iter().find(|kv| kv.key == "geo"))
        .and_then(|kv| kv.value.as_ref())
        .and_then(|text| serde_json::from_str(text).ok());

    let reader = builder
        .build()
        .map_err(|e| MspError::vector_read(format!("{}: {e}", path.display())))?;
    let batches: Vec<RecordBatch> = reader
        .collect::<Result<_, _>>()
        .map_err(|e| MspError::vector_read(format!("{}: {e}", path.display())))?;

    let total_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    if total_rows == 0 {
        return Ok(FeatureSet::empty());
    }

    // Geometry-aware path: GeoParquet metadata names the WKB column.
    if let Some(meta) = &geo_meta {
        if let Some(primary) = meta.get("primary_column").and_then(Value::as_str) {
            if let Some(col) = column_by_name(&batches[0], primary) {
                let (features, skipped) = extract(&batches, &[col], |batch, row| {
                    wkb_at(batch, col, row)
                });
                if !features.is_empty() {
                    return Ok(FeatureSet {
                        features,
                        crs: crs_from_geo_metadata(meta, primary),
                        skipped,
                    });
                }
            }
        }
        debug!("'geo' metadata present but unusable, trying recovery heuristics");
    }

    // (a) Any WKT-named text column.
    if let Some(col) = find_wkt_column(&batches[0]) {
        let (features, skipped) = extract(&batches, &[col], |batch, row| {
            str_at(batch, col, row)
                .and_then(|s| Geometry::<f64>::try_from_wkt_str(s).ok())
        });
        if !features.is_empty() {
            return Ok(FeatureSet {
                features,
                crs: CrsDef::wgs84(),
                skipped,
            });
        }
    }

    // (b) A WKB `geometry` column.
    if let Some(col) = find_named_column(&batches[0], "geometry", is_binary) {
        let (features, skipped) =
            extract(&batches, &[col], |batch, row| wkb_at(batch, col, row));
        if !features.is_empty() {
            return Ok(FeatureSet {
                features,
                crs: CrsDef::wgs84(),
                skipped,
            });
        }
    }

    // (c) Paired longitude/latitude columns.
    if let Some((lon_col, lat_col)) = find_lonlat_columns(&batches[0]) {
        let (features, skipped) = extract(&batches, &[lon_col, lat_col], |batch, row| {
            let lon = f64_at(batch, lon_col, row)?;
            let lat = f64_at(batch, lat_col, row)?;
            if lon.is_finite() && lat.is_finite() {
                Some(Geometry::Point(Point::new(lon, lat)))
            } else {
                None
            }
        });
        if !features.is_empty() {
            return Ok(FeatureSet {
                features,
                crs: CrsDef::wgs84(),
                skipped,
            });
        }
    }

    Err(MspError::vector_read(format!(
        "{}: no geometry column detected (tried GeoParquet metadata, WKT, WKB and lon/lat heuristics)",
        path.display()
    )))
}

/// EPSG id from GeoParquet column metadata when the PROJJSON carries
/// one; the layers this app serves are stored in EPSG:4326 otherwise.
fn crs_from_geo_metadata(meta: &Value, primary: &str) -> CrsDef {
    meta.get("columns")
        .and_then(|c| c.get(primary))
        .and_then(|c| c.pointer("/crs/id/code"))
        .and_then(Value::as_u64)
        .and_then(|code| CrsDef::from_epsg(code as u32).ok())
        .unwrap_or_else(CrsDef::wgs84)
}

/// Run a geometry extractor over every row of every batch, keeping the
/// remaining columns as properties.
fn extract<F>(
    batches: &[RecordBatch],
    geometry_cols: &[usize],
    geometry_at: F,
) -> (Vec<FeatureRecord>, usize)
where
    F: Fn(&RecordBatch, usize) -> Option<Geometry<f64>>,
{
    let mut features = Vec::new();
    let mut skipped = 0usize;

    for batch in batches {
        let schema = batch.schema();
        for row in 0..batch.num_rows() {
            let Some(geometry) = geometry_at(batch, row) else {
                skipped += 1;
                continue;
            };
            let mut record = FeatureRecord::new(geometry);
            for (idx, field) in schema.fields().iter().enumerate() {
                if geometry_cols.contains(&idx) {
                    continue;
                }
                record
                    .properties
                    .insert(field.name().clone(), cell_to_json(batch, idx, row));
            }
            features.push(record);
        }
    }

    if skipped > 0 {
        debug!(skipped, kept = features.len(), "parquet ingestion dropped rows");
    }
    (features, skipped)
}

fn column_by_name(batch: &RecordBatch, name: &str) -> Option<usize> {
    let wanted = name.to_ascii_lowercase();
    batch
        .schema()
        .fields()
        .iter()
        .position(|f| f.name().to_ascii_lowercase() == wanted)
}

fn find_named_column(
    batch: &RecordBatch,
    name: &str,
    type_ok: fn(&DataType) -> bool,
) -> Option<usize> {
    column_by_name(batch, name)
        .filter(|&idx| type_ok(batch.schema().field(idx).data_type()))
}

fn find_wkt_column(batch: &RecordBatch) -> Option<usize> {
    batch.schema().fields().iter().position(|f| {
        f.name().to_ascii_lowercase().contains("wkt") && is_text(f.data_type())
    })
}

fn find_lonlat_columns(batch: &RecordBatch) -> Option<(usize, usize)> {
    let by_name = |names: &[&str]| {
        batch.schema().fields().iter().position(|f| {
            let lower = f.name().to_ascii_lowercase();
            names.contains(&lower.as_str()) && is_numeric(f.data_type())
        })
    };
    Some((by_name(&LON_NAMES)?, by_name(&LAT_NAMES)?))
}

fn is_text(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::LargeUtf8)
}

fn is_binary(dt: &DataType) -> bool {
    matches!(dt, DataType::Binary | DataType::LargeBinary)
}

fn is_numeric(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Float32 | DataType::Float64 | DataType::Int32 | DataType::Int64
    )
}

fn str_at<'a>(batch: &'a RecordBatch, col: usize, row: usize) -> Option<&'a str> {
    let array = batch.column(col);
    if array.is_null(row) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        return Some(a.value(row));
    }
    if let Some(a) = array.as_any().downcast_ref::<LargeStringArray>() {
        return Some(a.value(row));
    }
    None
}

fn wkb_at(batch: &RecordBatch, col: usize, row: usize) -> Option<Geometry<f64>> {
    let array = batch.column(col);
    if array.is_null(row) {
        return None;
    }
    let bytes: &[u8] = if let Some(a) = array.as_any().downcast_ref::<BinaryArray>() {
        a.value(row)
    } else if let Some(a) = array.as_any().downcast_ref::<LargeBinaryArray>() {
        a.value(row)
    } else {
        return None;
    };
    wkb::wkb_to_geom(&mut &bytes[..]).ok()
}

fn f64_at(batch: &RecordBatch, col: usize, row: usize) -> Option<f64> {
    let array = batch.column(col);
    if array.is_null(row) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        return Some(a.value(row));
    }
    if let Some(a) = array.as_any().downcast_ref::<Float32Array>() {
        return Some(a.value(row) as f64);
    }
    if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
        return Some(a.value(row) as f64);
    }
    if let Some(a) = array.as_any().downcast_ref::<Int32Array>() {
        return Some(a.value(row) as f64);
    }
    None
}

fn cell_to_json(batch: &RecordBatch, col: usize, row: usize) -> Value {
    let array = batch.column(col);
    if array.is_null(row) {
        return Value::Null;
    }
    match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => str_at(batch, col, row)
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
        DataType::Boolean => array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| Value::Bool(a.value(row)))
            .unwrap_or(Value::Null),
        DataType::Float32 | DataType::Float64 | DataType::Int32 | DataType::Int64 => {
            f64_at(batch, col, row)
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}
