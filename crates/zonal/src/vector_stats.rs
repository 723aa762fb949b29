//! Vector zonal aggregation against the EUNIS reference layer.
//!
//! Intersects the query geometry with every reference polygon and
//! reports per-habitat-category area in km² plus the area-weighted
//! condition score. Fragment areas are measured in the European
//! equal-area system so large high-latitude polygons are not inflated.

use std::collections::BTreeMap;

use geo::{Area, BooleanOps};
use tracing::{debug, info};

use format_bridge::read_vector_file;
use geometry::{
    ensure_geographic, polygonal_members, renode, transform_multi_polygon, AoiGeometry,
};
use msp_common::table::round_to;
use msp_common::{
    CrsDef, LayerRegistry, Metric, MspError, MspResult, VectorZonalRow, VectorZonalTable,
};

/// Attribute carrying the 0–5 condition score, when the layer has one.
const CONDITION_COLUMN: &str = "condition";

#[derive(Default)]
struct Group {
    area_m2: f64,
    /// Σ(condition × area) over fragments that carry a score.
    weighted_condition: f64,
    /// Σ(area) over fragments that carry a score.
    scored_area_m2: f64,
}

/// Area-weighted per-category statistics of the query geometry against
/// a study area's EUNIS layer.
///
/// `label_column` is resolved case-insensitively against the layer
/// schema; a miss is a schema error naming the available columns. An
/// empty query geometry or an empty intersection both yield the empty
/// table with its canonical headers.
pub fn table(
    registry: &LayerRegistry,
    area: &str,
    aoi: &AoiGeometry,
    label_column: &str,
) -> MspResult<VectorZonalTable> {
    let path = registry.eunis_path(area)?;
    let set = read_vector_file(path)?;
    let set = ensure_geographic(set)?;
    debug!(
        area,
        layer = %path.display(),
        features = set.len(),
        skipped = set.skipped,
        "loaded EUNIS reference layer"
    );

    let label_key = set.resolve_column(label_column).ok_or_else(|| {
        MspError::ColumnNotFound {
            column: label_column.to_string(),
            available: set.attribute_columns(),
        }
    })?;
    let condition_key = set.resolve_column(CONDITION_COLUMN);

    let Some(union) = aoi.as_multi_polygon() else {
        return Ok(VectorZonalTable::empty());
    };
    let union = renode(union);

    let wgs84 = CrsDef::wgs84();
    let laea = CrsDef::laea_europe();
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    for feature in &set.features {
        let polygons = renode(&polygonal_members(&feature.geometry));
        if polygons.0.is_empty() {
            continue;
        }
        let fragment = union.intersection(&polygons);
        if fragment.0.is_empty() {
            continue;
        }

        let projected = transform_multi_polygon(&fragment, &wgs84, &laea)?;
        let area_m2 = projected.unsigned_area();
        if area_m2 <= 0.0 {
            continue;
        }

        let label = feature
            .property_string(&label_key)
            .unwrap_or_else(|| "Unclassified".to_string());
        let group = groups.entry(label).or_default();
        group.area_m2 += area_m2;
        if let Some(score) = condition_key
            .as_deref()
            .and_then(|key| feature.numeric_property(key))
        {
            group.weighted_condition += score * area_m2;
            group.scored_area_m2 += area_m2;
        }
    }

    let rows: Vec<VectorZonalRow> = groups
        .into_iter()
        .map(|(category, group)| VectorZonalRow {
            category,
            extent_km2: round_to(group.area_m2 / 1e6, 3),
            condition: if group.scored_area_m2 > 0.0 {
                Metric::rounded(group.weighted_condition / group.scored_area_m2, 2)
            } else {
                Metric::NA
            },
        })
        .collect();

    info!(area, rows = rows.len(), "vector zonal aggregation complete");
    Ok(VectorZonalTable::with_rows(rows))
}
