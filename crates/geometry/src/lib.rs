//! Geometry normalization and coordinate-system reconciliation.
//!
//! Builds one clean multi-polygon from heterogeneous user inputs
//! (interactively drawn rings, uploaded vector features) and moves it
//! between the canonical geographic CRS and the projected systems the
//! aggregators need for area math.

pub mod reconcile;
pub mod union;

pub use reconcile::{
    best_projected_crs, ensure_geographic, ensure_projected_for_raster, transform_multi_polygon,
    transform_point, PointTransformer,
};
pub use union::{polygonal_members, renode, AoiGeometry, DrawnRing, GeometrySource};
