//! Grid resampling for the accretion fallback path.
//!
//! When the accretion raster does not share the habitat raster's grid
//! it is sampled bilinearly at the habitat pixel centers. Nodata at
//! any of the four surrounding cells poisons the sample, so masked
//! regions never bleed averaged values into the result.

use crate::raster::RasterGrid;

/// Bilinear sample at a fractional pixel position.
///
/// Returns `None` outside the grid or when any contributing cell is
/// nodata.
pub fn bilinear(grid: &RasterGrid, col: f64, row: f64) -> Option<f64> {
    if col < 0.0 || row < 0.0 {
        return None;
    }
    let col0 = col.floor() as usize;
    let row0 = row.floor() as usize;
    if col0 >= grid.width || row0 >= grid.height {
        return None;
    }
    let col1 = (col0 + 1).min(grid.width - 1);
    let row1 = (row0 + 1).min(grid.height - 1);

    let v00 = grid.value(col0, row0)?;
    let v10 = grid.value(col1, row0)?;
    let v01 = grid.value(col0, row1)?;
    let v11 = grid.value(col1, row1)?;

    let cf = col - col0 as f64;
    let rf = row - row0 as f64;

    let top = v00 * (1.0 - cf) + v10 * cf;
    let bottom = v01 * (1.0 - cf) + v11 * cf;
    Some(top * (1.0 - rf) + bottom * rf)
}

/// Nearest-neighbor sample, used where interpolation would invent
/// class codes.
pub fn nearest(grid: &RasterGrid, col: f64, row: f64) -> Option<f64> {
    if col < -0.5 || row < -0.5 {
        return None;
    }
    let col = col.round();
    let row = row.round();
    if col < 0.0 || row < 0.0 {
        return None;
    }
    grid.value(col as usize, row as usize)
}
