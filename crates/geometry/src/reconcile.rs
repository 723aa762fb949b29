//! Coordinate-system reconciliation.
//!
//! Inputs arrive in the canonical geographic CRS; every area
//! computation needs linear units. This module picks the right
//! projected system when none is given (UTM from the centroid) and
//! moves geometries between systems through proj4 transforms, with
//! the degree/radian conversion handled at the boundary.

use geo::{Centroid, MapCoords};
use geo_types::{Coord, MultiPolygon};
use proj4rs::Proj;
use tracing::debug;

use format_bridge::FeatureSet;
use msp_common::{CrsDef, MspError, MspResult};

/// Pick the UTM system covering a geometry given in geographic
/// coordinates: zone from the centroid longitude, hemisphere from the
/// centroid latitude sign.
pub fn best_projected_crs(geometry: &MultiPolygon<f64>) -> MspResult<CrsDef> {
    let centroid = geometry.centroid().ok_or_else(|| {
        MspError::DegenerateGeometry("cannot derive a UTM zone for an empty geometry".into())
    })?;
    let zone = (((centroid.x() + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
    Ok(CrsDef::utm(zone, centroid.y() >= 0.0))
}

/// A reusable coordinate transformer between two systems.
///
/// Builds the projection pipeline once; per-point transforms then run
/// without re-parsing proj4 strings, which matters when every raster
/// pixel center goes through it.
pub struct PointTransformer {
    source: Proj,
    target: Proj,
    from_angular: bool,
    to_angular: bool,
    identity: bool,
    label: String,
}

impl PointTransformer {
    pub fn new(from: &CrsDef, to: &CrsDef) -> MspResult<Self> {
        Ok(Self {
            source: proj_of(from)?,
            target: proj_of(to)?,
            from_angular: from.is_geographic(),
            to_angular: to.is_geographic(),
            identity: from.same_as(to),
            label: format!("{from} -> {to}"),
        })
    }

    /// Transform one coordinate.
    pub fn apply(&self, x: f64, y: f64) -> MspResult<(f64, f64)> {
        if self.identity {
            return Ok((x, y));
        }
        let mut point = (x, y, 0.0);
        if self.from_angular {
            point.0 = point.0.to_radians();
            point.1 = point.1.to_radians();
        }
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| MspError::transform(format!("{}: {e}", self.label)))?;
        if self.to_angular {
            point.0 = point.0.to_degrees();
            point.1 = point.1.to_degrees();
        }
        Ok((point.0, point.1))
    }
}

/// Transform a single coordinate between two systems.
pub fn transform_point(from: &CrsDef, to: &CrsDef, x: f64, y: f64) -> MspResult<(f64, f64)> {
    PointTransformer::new(from, to)?.apply(x, y)
}

/// Transform a multi-polygon between two systems. Already-conformant
/// input comes back untouched (no redundant reprojection).
pub fn transform_multi_polygon(
    geometry: &MultiPolygon<f64>,
    from: &CrsDef,
    to: &CrsDef,
) -> MspResult<MultiPolygon<f64>> {
    if from.same_as(to) {
        return Ok(geometry.clone());
    }
    let source = proj_of(from)?;
    let target = proj_of(to)?;
    let from_angular = from.is_geographic();
    let to_angular = to.is_geographic();

    debug!(%from, %to, "reprojecting geometry");
    geometry.try_map_coords(|coord| {
        let mut point = (coord.x, coord.y, 0.0);
        if from_angular {
            point.0 = point.0.to_radians();
            point.1 = point.1.to_radians();
        }
        proj4rs::transform::transform(&source, &target, &mut point)
            .map_err(|e| MspError::transform(format!("{from} -> {to}: {e}")))?;
        if to_angular {
            point.0 = point.0.to_degrees();
            point.1 = point.1.to_degrees();
        }
        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    })
}

/// Reproject a feature collection into the canonical geographic CRS.
/// Collections already in it pass through unchanged.
pub fn ensure_geographic(set: FeatureSet) -> MspResult<FeatureSet> {
    let wgs84 = CrsDef::wgs84();
    if set.crs.same_as(&wgs84) {
        return Ok(set);
    }

    let source = proj_of(&set.crs)?;
    let target = proj_of(&wgs84)?;
    let from_angular = set.crs.is_geographic();
    let from = set.crs.clone();

    debug!(%from, features = set.len(), "normalizing feature collection to EPSG:4326");
    let mut features = Vec::with_capacity(set.features.len());
    for mut feature in set.features {
        feature.geometry = feature.geometry.try_map_coords(|coord| {
            let mut point = (coord.x, coord.y, 0.0);
            if from_angular {
                point.0 = point.0.to_radians();
                point.1 = point.1.to_radians();
            }
            proj4rs::transform::transform(&source, &target, &mut point)
                .map_err(|e| MspError::transform(format!("{from} -> EPSG:4326: {e}")))?;
            Ok::<_, MspError>(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        })?;
        features.push(feature);
    }

    Ok(FeatureSet {
        features,
        crs: wgs84,
        skipped: set.skipped,
    })
}

/// Transform the query geometry into the exact CRS of a target raster.
///
/// Fails when the raster's CRS is geographic: pixel-area computation
/// requires linear pixel dimensions.
pub fn ensure_projected_for_raster(
    geometry: &MultiPolygon<f64>,
    raster_crs: &CrsDef,
) -> MspResult<MultiPolygon<f64>> {
    if raster_crs.is_geographic() {
        return Err(MspError::GeographicRasterCrs(raster_crs.to_string()));
    }
    transform_multi_polygon(geometry, &CrsDef::wgs84(), raster_crs)
}

fn proj_of(crs: &CrsDef) -> MspResult<Proj> {
    Proj::from_proj_string(&crs.proj4)
        .map_err(|e| MspError::transform(format!("cannot build {crs}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo_types::polygon;

    fn santander_square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: -3.80, y: 43.40),
            (x: -3.70, y: 43.40),
            (x: -3.70, y: 43.48),
            (x: -3.80, y: 43.48),
            (x: -3.80, y: 43.40),
        ]])
    }

    #[test]
    fn test_best_projected_crs_picks_utm_30n() {
        let crs = best_projected_crs(&santander_square()).unwrap();
        assert_eq!(crs.epsg, Some(32630));
    }

    #[test]
    fn test_best_projected_crs_southern_hemisphere() {
        let southern = MultiPolygon::new(vec![polygon![
            (x: -70.0, y: -33.0),
            (x: -69.0, y: -33.0),
            (x: -69.0, y: -32.0),
            (x: -70.0, y: -33.0),
        ]]);
        let crs = best_projected_crs(&southern).unwrap();
        assert_eq!(crs.epsg, Some(32719));
        assert!(crs.proj4.contains("+south"));
    }

    #[test]
    fn test_utm_round_trip_stays_under_microdegree() {
        let square = santander_square();
        let utm = best_projected_crs(&square).unwrap();
        let wgs84 = CrsDef::wgs84();
        let projected = transform_multi_polygon(&square, &wgs84, &utm).unwrap();
        let back = transform_multi_polygon(&projected, &utm, &wgs84).unwrap();

        let before = square.centroid().unwrap();
        let after = back.centroid().unwrap();
        assert_abs_diff_eq!(before.x(), after.x(), epsilon = 1e-6);
        assert_abs_diff_eq!(before.y(), after.y(), epsilon = 1e-6);
    }

    #[test]
    fn test_same_crs_passthrough() {
        let square = santander_square();
        let wgs84 = CrsDef::wgs84();
        let out = transform_multi_polygon(&square, &wgs84, &wgs84).unwrap();
        assert_eq!(out, square);
    }

    #[test]
    fn test_geographic_raster_crs_rejected() {
        let err = ensure_projected_for_raster(&santander_square(), &CrsDef::wgs84());
        assert!(matches!(err, Err(MspError::GeographicRasterCrs(_))));
    }

    #[test]
    fn test_projected_meters_look_like_meters() {
        let square = santander_square();
        let utm = CrsDef::utm(30, true);
        let projected =
            transform_multi_polygon(&square, &CrsDef::wgs84(), &utm).unwrap();
        // A tenth of a degree of longitude at 43°N is tens of km.
        let rect = geo::BoundingRect::bounding_rect(&projected).unwrap();
        assert!(rect.width() > 5_000.0);
        assert!(rect.width() < 20_000.0);
    }
}
