//! Common types shared across the marine-spatial-planning analysis crates.

pub mod class;
pub mod crs;
pub mod error;
pub mod registry;
pub mod scenario;
pub mod table;

pub use class::EcosystemClass;
pub use crs::{CrsDef, CrsUnit};
pub use error::{MspError, MspResult};
pub use registry::{LayerRegistry, RasterPair};
pub use scenario::{Scenario, ScenarioCube};
pub use table::{Metric, RasterZonalRow, RasterZonalTable, VectorZonalRow, VectorZonalTable};
