//! End-to-end raster zonal aggregation against synthetic GeoTIFF pairs.

use std::path::{Path, PathBuf};

use geometry::{AoiGeometry, DrawnRing};
use msp_common::{
    CrsDef, EcosystemClass, LayerRegistry, Metric, MspError, RasterPair, Scenario,
};
use zonal::{
    current_condition_table, full_raster_table, raster_table, scenario_table, testdata,
    GeoTransform,
};

const EPSG_UTM30N: u32 = 32630;
const ORIGIN_X: f64 = 430_000.0;
const ORIGIN_Y: f64 = 4_815_000.0;

/// A drawn ring ([lat, lon] vertices) tracing a rectangle given in UTM
/// meters, the way a user outlines a raster block on the map.
fn utm_rect_ring(x0: f64, y0: f64, x1: f64, y1: f64) -> DrawnRing {
    let utm = CrsDef::utm(30, true);
    let wgs84 = CrsDef::wgs84();
    [(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]
        .iter()
        .map(|&(x, y)| {
            let (lon, lat) = geometry::transform_point(&utm, &wgs84, x, y).unwrap();
            [lat, lon]
        })
        .collect()
}

/// AOI generously covering the whole 10x10, 10 m-pixel test raster.
fn covering_aoi() -> AoiGeometry {
    let ring = utm_rect_ring(
        ORIGIN_X - 5.0,
        ORIGIN_Y - 105.0,
        ORIGIN_X + 105.0,
        ORIGIN_Y + 5.0,
    );
    AoiGeometry::build(&[ring], &[])
}

fn write_pair(
    dir: &Path,
    codes: &[u8],
    accretion: &[f32],
    nodata: Option<f64>,
) -> (PathBuf, PathBuf) {
    let _ = tracing_subscriber::fmt::try_init();
    let transform = GeoTransform::north_up(ORIGIN_X, ORIGIN_Y, 10.0, 10.0);
    let habitat_path = dir.join("habitat.tif");
    let accretion_path = dir.join("habitat_accretion.tif");
    testdata::write_class_raster(&habitat_path, 10, 10, &transform, EPSG_UTM30N, false, codes)
        .unwrap();
    testdata::write_accretion_raster(
        &accretion_path,
        10,
        10,
        &transform,
        EPSG_UTM30N,
        accretion,
        nodata,
    )
    .unwrap();
    (habitat_path, accretion_path)
}

#[test]
fn test_uniform_mudflat_block_matches_hand_computation() {
    let dir = tempfile::tempdir().unwrap();
    let (habitat, accretion) = write_pair(
        dir.path(),
        &testdata::uniform_codes(10, 10, 0),
        &[0.01; 100],
        None,
    );

    let table = raster_table(&habitat, &accretion, &covering_aoi()).unwrap();
    assert_eq!(table.rows.len(), 4);

    // 100 pixels x 100 m² / 10000 = 1.00 ha; 100 x 0.01 x 100 m² = 100 m³/yr.
    let mudflat = &table.rows[0];
    assert_eq!(mudflat.ecosystem_class, EcosystemClass::Mudflat);
    assert_eq!(mudflat.extent_ha, 1.00);
    assert_eq!(mudflat.accretion_m3_per_yr, Metric::Value(100.00));

    let saltmarsh = &table.rows[1];
    assert_eq!(saltmarsh.extent_ha, 0.00);
    assert_eq!(saltmarsh.accretion_m3_per_yr, Metric::Value(0.00));

    assert_eq!(table.rows[2].accretion_m3_per_yr, Metric::NA);
    assert_eq!(table.rows[3].accretion_m3_per_yr, Metric::NA);
}

#[test]
fn test_partial_cover_counts_only_masked_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let (habitat, accretion) = write_pair(
        dir.path(),
        &testdata::uniform_codes(10, 10, 0),
        &[0.01; 100],
        None,
    );

    // Left half: columns 0..5.
    let ring = utm_rect_ring(
        ORIGIN_X - 5.0,
        ORIGIN_Y - 105.0,
        ORIGIN_X + 50.0,
        ORIGIN_Y + 5.0,
    );
    let aoi = AoiGeometry::build(&[ring], &[]);
    let table = raster_table(&habitat, &accretion, &aoi).unwrap();

    assert_eq!(table.rows[0].extent_ha, 0.50);
    assert_eq!(table.rows[0].accretion_m3_per_yr, Metric::Value(50.00));
}

#[test]
fn test_extent_sum_bounded_by_aoi_area() {
    let dir = tempfile::tempdir().unwrap();
    let (habitat, accretion) = write_pair(
        dir.path(),
        &testdata::banded_codes(10, 10, &[0, 1, 2, 3]),
        &[0.02; 100],
        None,
    );

    let aoi = covering_aoi();
    let table = raster_table(&habitat, &accretion, &aoi).unwrap();

    let total_ha: f64 = table.rows.iter().map(|r| r.extent_ha).sum();
    let projected = geometry::ensure_projected_for_raster(
        aoi.as_multi_polygon().unwrap(),
        &CrsDef::utm(30, true),
    )
    .unwrap();
    let aoi_ha = geo::Area::unsigned_area(&projected) / 10_000.0;
    // One pixel of rounding slack.
    assert!(total_ha <= aoi_ha + 0.01);
    assert!(total_ha > 0.0);
}

#[test]
fn test_banded_classes_bucket_independently() {
    let dir = tempfile::tempdir().unwrap();
    // 10 columns over 4 bands: widths 3, 2, 3, 2 (integer band split).
    let codes = testdata::banded_codes(10, 10, &[0, 1, 2, 3]);
    let counts: [usize; 4] = {
        let mut acc = [0usize; 4];
        for &c in &codes {
            acc[c as usize] += 1;
        }
        acc
    };
    let (habitat, accretion) = write_pair(dir.path(), &codes, &[0.02; 100], None);

    let table = raster_table(&habitat, &accretion, &covering_aoi()).unwrap();
    for (row, &count) in table.rows.iter().zip(counts.iter()) {
        assert_eq!(row.extent_ha, count as f64 * 100.0 / 10_000.0);
    }
    // Accretion only on the wetland classes.
    assert_eq!(
        table.rows[0].accretion_m3_per_yr,
        Metric::Value(counts[0] as f64 * 0.02 * 100.0)
    );
    assert_eq!(table.rows[2].accretion_m3_per_yr, Metric::NA);
}

#[test]
fn test_misaligned_accretion_is_resampled_onto_habitat_grid() {
    let dir = tempfile::tempdir().unwrap();
    let transform = GeoTransform::north_up(ORIGIN_X, ORIGIN_Y, 10.0, 10.0);
    let habitat_path = dir.path().join("habitat.tif");
    testdata::write_class_raster(
        &habitat_path,
        10,
        10,
        &transform,
        EPSG_UTM30N,
        false,
        &testdata::uniform_codes(10, 10, 0),
    )
    .unwrap();

    // Same CRS and extent, twice the resolution: not grid-aligned.
    let fine = GeoTransform::north_up(ORIGIN_X, ORIGIN_Y, 5.0, 5.0);
    let accretion_path = dir.path().join("habitat_fine_accretion.tif");
    testdata::write_accretion_raster(
        &accretion_path,
        20,
        20,
        &fine,
        EPSG_UTM30N,
        &[0.01; 400],
        None,
    )
    .unwrap();

    let table = raster_table(&habitat_path, &accretion_path, &covering_aoi()).unwrap();
    // A constant field resamples to the same constant: result matches
    // the aligned case.
    assert_eq!(table.rows[0].extent_ha, 1.00);
    assert_eq!(table.rows[0].accretion_m3_per_yr, Metric::Value(100.00));
}

#[test]
fn test_accretion_nodata_contributes_zero_not_poison() {
    let dir = tempfile::tempdir().unwrap();
    // Left half nodata: 50 valid pixels at 0.01.
    let mut values = [0.01f32; 100];
    for row in 0..10 {
        for col in 0..5 {
            values[row * 10 + col] = -9999.0;
        }
    }
    let (habitat, accretion) = write_pair(
        dir.path(),
        &testdata::uniform_codes(10, 10, 0),
        &values,
        Some(-9999.0),
    );

    let table = raster_table(&habitat, &accretion, &covering_aoi()).unwrap();
    // Habitat mask membership is authoritative: extent keeps all 100
    // pixels, accretion sums only the valid half.
    assert_eq!(table.rows[0].extent_ha, 1.00);
    assert_eq!(table.rows[0].accretion_m3_per_yr, Metric::Value(50.00));
}

#[test]
fn test_geographic_habitat_raster_is_a_crs_error() {
    let dir = tempfile::tempdir().unwrap();
    let habitat_path = dir.path().join("geographic.tif");
    let transform = GeoTransform::north_up(-3.8, 43.5, 0.0001, 0.0001);
    testdata::write_class_raster(
        &habitat_path,
        10,
        10,
        &transform,
        4326,
        true,
        &testdata::uniform_codes(10, 10, 0),
    )
    .unwrap();
    let accretion_path = dir.path().join("geographic_accretion.tif");
    testdata::write_accretion_raster(
        &accretion_path,
        10,
        10,
        &transform,
        EPSG_UTM30N,
        &[0.01; 100],
        None,
    )
    .unwrap();

    let result = raster_table(&habitat_path, &accretion_path, &covering_aoi());
    assert!(matches!(result, Err(MspError::GeographicRasterCrs(_))));
}

#[test]
fn test_full_raster_summary_and_grid_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (habitat, accretion) = write_pair(
        dir.path(),
        &testdata::banded_codes(10, 10, &[0, 1]),
        &[0.01; 100],
        None,
    );

    let table = full_raster_table(&habitat, &accretion).unwrap();
    assert_eq!(table.rows[0].extent_ha, 0.50);
    assert_eq!(table.rows[1].extent_ha, 0.50);
    assert_eq!(table.rows[2].extent_ha, 0.00);

    // A differently-sized accretion raster cannot be summarized
    // pixel-for-pixel.
    let fine = GeoTransform::north_up(ORIGIN_X, ORIGIN_Y, 5.0, 5.0);
    let misaligned = dir.path().join("misaligned_accretion.tif");
    testdata::write_accretion_raster(&misaligned, 20, 20, &fine, EPSG_UTM30N, &[0.01; 400], None)
        .unwrap();
    assert!(matches!(
        full_raster_table(&habitat, &misaligned),
        Err(MspError::GridMismatch(_))
    ));
}

#[test]
fn test_registry_wrappers_and_scenario_cube() {
    let dir = tempfile::tempdir().unwrap();
    let (habitat, accretion) = write_pair(
        dir.path(),
        &testdata::uniform_codes(10, 10, 1),
        &[0.01; 100],
        None,
    );

    let mut registry = LayerRegistry::new().with_saltmarsh_pair(
        "Bay_of_Santander",
        RasterPair {
            habitat: habitat.clone(),
            accretion: accretion.clone(),
        },
    );
    registry.scenarios_mut().insert(
        "Bay_of_Santander",
        Scenario::RegionalModerate,
        "2062",
        RasterPair {
            habitat,
            accretion,
        },
    );

    let aoi = covering_aoi();

    let current = current_condition_table(&registry, "Bay_of_Santander", &aoi).unwrap();
    assert_eq!(current.rows[1].extent_ha, 1.00);

    let hit = scenario_table(
        &registry,
        "Bay_of_Santander",
        Scenario::RegionalModerate,
        "2062",
        &aoi,
    )
    .unwrap();
    assert!(hit.is_some());

    // Unconfigured combinations are unavailable, never an error.
    let miss = scenario_table(
        &registry,
        "Bay_of_Santander",
        Scenario::GlobalModerate,
        "2062",
        &aoi,
    )
    .unwrap();
    assert!(miss.is_none());

    assert!(matches!(
        current_condition_table(&registry, "Atlantis", &aoi),
        Err(MspError::UnknownStudyArea(_))
    ));
}

#[test]
fn test_empty_aoi_returns_zeroed_table_without_touching_files() {
    let table = raster_table(
        Path::new("does_not_exist.tif"),
        Path::new("does_not_exist_accretion.tif"),
        &AoiGeometry::Empty,
    )
    .unwrap();
    assert_eq!(table.rows.len(), 4);
    assert!(table.rows.iter().all(|r| r.extent_ha == 0.0));
    assert_eq!(table.rows[0].accretion_m3_per_yr, Metric::Value(0.0));
    assert_eq!(table.rows[3].accretion_m3_per_yr, Metric::NA);
}
