//! Raster zonal aggregation.
//!
//! Masks the classified habitat raster by the query geometry and
//! reports, for the fixed 4-class enumeration, per-class extent in
//! hectares and accretion volume in m³/yr. The identical algorithm
//! serves the current-condition raster pair and every scenario-cube
//! entry; only the supplied path pair differs.
//!
//! The accretion raster is consumed through the habitat mask's pixel
//! membership in both alignment cases: a pixel-identical grid is read
//! directly (no resampling error where none is needed), anything else
//! is resampled bilinearly onto the habitat grid. When the two
//! rasters' nodata regions disagree, the habitat mask stays
//! authoritative and missing accretion samples contribute zero.

use std::path::Path;

use geo::{BoundingRect, Intersects};
use geo_types::{MultiPolygon, Point};
use tracing::{debug, info};

use geometry::{ensure_projected_for_raster, AoiGeometry, PointTransformer};
use msp_common::table::round_to;
use msp_common::{
    EcosystemClass, LayerRegistry, Metric, MspError, MspResult, RasterZonalRow,
    RasterZonalTable, Scenario,
};

use crate::raster::RasterGrid;
use crate::resample;

/// Square meters per hectare.
const M2_PER_HA: f64 = 10_000.0;

/// Zonal statistics of the query geometry over a habitat/accretion
/// raster pair. Always returns exactly 4 rows in class order; classes
/// absent from the geometry report zero extent.
pub fn table(
    habitat_path: &Path,
    accretion_path: &Path,
    aoi: &AoiGeometry,
) -> MspResult<RasterZonalTable> {
    // "Nothing drawn yet" is a normal state, not a failure.
    let Some(union) = aoi.as_multi_polygon() else {
        return Ok(RasterZonalTable::zeroed());
    };

    let habitat = RasterGrid::open(habitat_path)?;
    let projected = ensure_projected_for_raster(union, &habitat.crs)?;

    let mask = mask_pixels(&habitat, &projected);
    debug!(
        pixels = mask.len(),
        raster = %habitat_path.display(),
        "masked habitat raster"
    );

    let accretion = RasterGrid::open(accretion_path)?;
    let aligned = accretion.same_grid_as(&habitat);
    let transformer = if aligned {
        None
    } else {
        debug!(
            habitat_crs = %habitat.crs,
            accretion_crs = %accretion.crs,
            "accretion grid differs, resampling onto the habitat grid"
        );
        Some(PointTransformer::new(&habitat.crs, &accretion.crs)?)
    };

    let pixel_area = habitat.pixel_area();
    let mut counts = [0u64; 4];
    let mut sums = [0f64; 4];

    for &(col, row) in &mask {
        let Some(code) = habitat.value(col, row) else {
            continue;
        };
        let Some(class) = EcosystemClass::from_code(code.round() as i64) else {
            continue;
        };
        let idx = class.code() as usize;
        counts[idx] += 1;

        if !class.supports_accretion() {
            continue;
        }
        let sample = match &transformer {
            None => accretion.value(col, row),
            Some(transformer) => {
                let (cx, cy) = habitat
                    .transform
                    .pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
                let (ax, ay) = transformer.apply(cx, cy)?;
                accretion
                    .transform
                    .geo_to_pixel(ax, ay)
                    .and_then(|(pc, pr)| resample::bilinear(&accretion, pc - 0.5, pr - 0.5))
            }
        };
        sums[idx] += sample.unwrap_or(0.0);
    }

    let table = build_table(&counts, &sums, pixel_area);
    info!(
        raster = %habitat_path.display(),
        masked = mask.len(),
        "raster zonal aggregation complete"
    );
    Ok(table)
}

/// Per-class summary of a whole raster pair, no query geometry: the
/// habitat-distribution view shown before anything is drawn. The two
/// grids must be pixel-aligned.
pub fn full_raster_table(habitat_path: &Path, accretion_path: &Path) -> MspResult<RasterZonalTable> {
    let habitat = RasterGrid::open(habitat_path)?;
    if habitat.crs.is_geographic() {
        return Err(MspError::GeographicRasterCrs(habitat.crs.to_string()));
    }
    let accretion = RasterGrid::open(accretion_path)?;
    if !accretion.same_grid_as(&habitat) {
        return Err(MspError::GridMismatch(format!(
            "{} vs {}",
            habitat_path.display(),
            accretion_path.display()
        )));
    }

    let mut counts = [0u64; 4];
    let mut sums = [0f64; 4];
    for row in 0..habitat.height {
        for col in 0..habitat.width {
            let Some(code) = habitat.value(col, row) else {
                continue;
            };
            let Some(class) = EcosystemClass::from_code(code.round() as i64) else {
                continue;
            };
            let idx = class.code() as usize;
            counts[idx] += 1;
            if class.supports_accretion() {
                sums[idx] += accretion.value(col, row).unwrap_or(0.0);
            }
        }
    }

    Ok(build_table(&counts, &sums, habitat.pixel_area()))
}

/// Current-condition aggregation for a registered study area.
pub fn current_condition_table(
    registry: &LayerRegistry,
    area: &str,
    aoi: &AoiGeometry,
) -> MspResult<RasterZonalTable> {
    let pair = registry.saltmarsh_pair(area)?;
    table(&pair.habitat, &pair.accretion, aoi)
}

/// Aggregation for one scenario-cube entry. An unconfigured
/// (area, scenario, year) combination is unavailable, not an error.
pub fn scenario_table(
    registry: &LayerRegistry,
    area: &str,
    scenario: Scenario,
    year: &str,
    aoi: &AoiGeometry,
) -> MspResult<Option<RasterZonalTable>> {
    match registry.scenarios().paths_for(area, scenario, year) {
        Some(pair) => table(&pair.habitat, &pair.accretion, aoi).map(Some),
        None => Ok(None),
    }
}

/// Pixel membership of the geometry over the raster grid, in the
/// grid's own (uncropped) indexing. The geometry's bounding rectangle
/// only prunes iteration; recorded indices stay global so a
/// co-registered raster can be read at the same positions.
fn mask_pixels(raster: &RasterGrid, geometry: &MultiPolygon<f64>) -> Vec<(usize, usize)> {
    let Some(rect) = geometry.bounding_rect() else {
        return Vec::new();
    };

    let corners = [
        (rect.min().x, rect.min().y),
        (rect.min().x, rect.max().y),
        (rect.max().x, rect.min().y),
        (rect.max().x, rect.max().y),
    ];
    let mut col_lo = 0f64;
    let mut col_hi = raster.width as f64;
    let mut row_lo = 0f64;
    let mut row_hi = raster.height as f64;
    let pixel_corners: Option<Vec<(f64, f64)>> = corners
        .iter()
        .map(|&(x, y)| raster.transform.geo_to_pixel(x, y))
        .collect();
    if let Some(pixel_corners) = pixel_corners {
        let (mut cmin, mut cmax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut rmin, mut rmax) = (f64::INFINITY, f64::NEG_INFINITY);
        for (c, r) in pixel_corners {
            cmin = cmin.min(c);
            cmax = cmax.max(c);
            rmin = rmin.min(r);
            rmax = rmax.max(r);
        }
        col_lo = cmin.floor().max(0.0);
        col_hi = cmax.ceil().min(raster.width as f64);
        row_lo = rmin.floor().max(0.0);
        row_hi = rmax.ceil().min(raster.height as f64);
    }
    if col_lo >= col_hi || row_lo >= row_hi {
        return Vec::new();
    }

    let mut mask = Vec::new();
    for row in row_lo as usize..row_hi as usize {
        for col in col_lo as usize..col_hi as usize {
            let (x, y) = raster
                .transform
                .pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
            if geometry.intersects(&Point::new(x, y)) {
                mask.push((col, row));
            }
        }
    }
    mask
}

fn build_table(counts: &[u64; 4], sums: &[f64; 4], pixel_area: f64) -> RasterZonalTable {
    let rows = EcosystemClass::ALL
        .iter()
        .map(|&class| {
            let idx = class.code() as usize;
            RasterZonalRow {
                ecosystem_class: class,
                extent_ha: round_to(counts[idx] as f64 * pixel_area / M2_PER_HA, 2),
                accretion_m3_per_yr: if class.supports_accretion() {
                    Metric::rounded(sums[idx] * pixel_area, 2)
                } else {
                    Metric::NA
                },
            }
        })
        .collect();
    RasterZonalTable::with_rows(rows)
}
