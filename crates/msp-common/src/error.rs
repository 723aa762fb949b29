//! Error types for the zonal-statistics engine.

use thiserror::Error;

/// Result type alias using MspError.
pub type MspResult<T> = Result<T, MspError>;

/// Primary error type for aggregation operations.
#[derive(Debug, Error)]
pub enum MspError {
    // === Geometry Errors ===
    #[error("Degenerate input geometry: {0}")]
    DegenerateGeometry(String),

    // === Schema Errors ===
    #[error("Column '{column}' not found in reference layer; available columns: {available:?}")]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("Study area not registered: {0}")]
    UnknownStudyArea(String),

    // === CRS Errors ===
    #[error("Raster CRS must be projected (linear units), got: {0}")]
    GeographicRasterCrs(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Coordinate transformation failed: {0}")]
    TransformFailed(String),

    // === Data Errors ===
    #[error("Failed to read raster: {0}")]
    RasterReadError(String),

    #[error("Failed to read vector file: {0}")]
    VectorReadError(String),

    #[error("Rasters are not grid-aligned: {0}")]
    GridMismatch(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid registry configuration: {0}")]
    ConfigError(String),
}

impl MspError {
    /// Create a TransformFailed error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }

    /// Create a RasterReadError.
    pub fn raster_read(msg: impl Into<String>) -> Self {
        Self::RasterReadError(msg.into())
    }

    /// Create a VectorReadError.
    pub fn vector_read(msg: impl Into<String>) -> Self {
        Self::VectorReadError(msg.into())
    }

    /// True when the error is recoverable by returning an empty result
    /// table ("user hasn't drawn anything yet" is a normal state).
    pub fn is_empty_input(&self) -> bool {
        matches!(self, MspError::DegenerateGeometry(_))
    }
}

impl From<std::io::Error> for MspError {
    fn from(err: std::io::Error) -> Self {
        MspError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MspError {
    fn from(err: serde_json::Error) -> Self {
        MspError::ConfigError(format!("JSON error: {}", err))
    }
}
