//! Building one clean multi-polygon from heterogeneous inputs.
//!
//! User geometry arrives from two origins: rings drawn on the map
//! (lists of [lat, lon] vertices) and features parsed from uploaded
//! vector files. Both are normalized, dissolved into a single union
//! and repaired before any aggregation sees them.

use geo::BooleanOps;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use tracing::debug;

use format_bridge::FeatureRecord;

/// One ring drawn on the interactive map: [latitude, longitude]
/// vertex pairs, in draw order, possibly unclosed.
pub type DrawnRing = Vec<[f64; 2]>;

/// The adapter boundary between the UI layer and the aggregation core.
/// The core never inspects UI-specific structures; the hosting
/// application populates this union instead.
#[derive(Debug, Clone)]
pub enum GeometrySource {
    /// Rings from the interactive draw tool.
    Drawn(Vec<DrawnRing>),
    /// Features from a parsed upload.
    Uploaded(Vec<FeatureRecord>),
}

/// The query geometry every aggregation runs against: either
/// explicitly empty ("nothing drawn yet", a normal state) or a valid
/// multi-polygon in the canonical geographic CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum AoiGeometry {
    Empty,
    Polygonal(MultiPolygon<f64>),
}

impl AoiGeometry {
    /// Build the dissolved union of all drawn rings and uploaded
    /// features. Degenerate inputs are dropped silently; an all-empty
    /// input yields [`AoiGeometry::Empty`], never an error.
    pub fn build(drawn: &[DrawnRing], uploaded: &[FeatureRecord]) -> AoiGeometry {
        let mut parts: Vec<MultiPolygon<f64>> = Vec::new();

        for ring in drawn {
            if let Some(poly) = ring_to_polygon(ring) {
                parts.push(poly);
            }
        }
        for feature in uploaded {
            let members = polygonal_members(&feature.geometry);
            if !members.0.is_empty() {
                parts.push(renode(&members));
            }
        }

        if parts.is_empty() {
            return AoiGeometry::Empty;
        }

        debug!(parts = parts.len(), "dissolving query geometry");
        let union = parts
            .into_iter()
            .reduce(|acc, next| acc.union(&next))
            .unwrap_or_else(|| MultiPolygon::new(Vec::new()));

        if union.0.is_empty() {
            AoiGeometry::Empty
        } else {
            AoiGeometry::Polygonal(union)
        }
    }

    /// Flatten a list of tagged sources and build the union.
    pub fn from_sources(sources: &[GeometrySource]) -> AoiGeometry {
        let mut drawn: Vec<DrawnRing> = Vec::new();
        let mut uploaded: Vec<FeatureRecord> = Vec::new();
        for source in sources {
            match source {
                GeometrySource::Drawn(rings) => drawn.extend(rings.iter().cloned()),
                GeometrySource::Uploaded(features) => uploaded.extend(features.iter().cloned()),
            }
        }
        Self::build(&drawn, &uploaded)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AoiGeometry::Empty)
    }

    pub fn as_multi_polygon(&self) -> Option<&MultiPolygon<f64>> {
        match self {
            AoiGeometry::Empty => None,
            AoiGeometry::Polygonal(mp) => Some(mp),
        }
    }
}

/// Normalize a drawn ring into a repaired polygon.
///
/// The map delivers [lat, lon]; the geometry stack wants (x=lon,
/// y=lat), so every vertex is axis-swapped. Rings with fewer than 3
/// distinct finite vertices are dropped; an unclosed ring is closed.
fn ring_to_polygon(ring: &DrawnRing) -> Option<MultiPolygon<f64>> {
    let mut coords: Vec<Coord<f64>> = ring
        .iter()
        .filter(|pair| pair[0].is_finite() && pair[1].is_finite())
        .map(|pair| Coord {
            x: pair[1],
            y: pair[0],
        })
        .collect();

    let mut distinct = coords.clone();
    distinct.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    distinct.dedup();
    if distinct.len() < 3 {
        return None;
    }

    if coords.first() != coords.last() {
        let first = coords[0];
        coords.push(first);
    }

    let polygon = Polygon::new(LineString::from(coords), Vec::new());
    let repaired = renode(&MultiPolygon::new(vec![polygon]));
    if repaired.0.is_empty() {
        None
    } else {
        Some(repaired)
    }
}

/// Extract the polygonal members of an arbitrary geometry, recursing
/// through collections. Points and lines contribute nothing to an
/// area-based union.
pub fn polygonal_members(geometry: &Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::GeometryCollection(gc) => {
            let polygons: Vec<Polygon<f64>> = gc
                .iter()
                .flat_map(|member| polygonal_members(member).0)
                .collect();
            MultiPolygon::new(polygons)
        }
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        _ => MultiPolygon::new(Vec::new()),
    }
}

/// Self-intersection repair: push the polygons through the boolean-ops
/// noding pipeline (union with the empty set), the equivalent of a
/// zero-distance buffer. Invalid rings come back re-noded or empty.
pub fn renode(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    mp.union(&MultiPolygon::new(Vec::new()))
}
