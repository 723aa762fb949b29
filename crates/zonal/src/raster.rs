//! Single-band GeoTIFF reading.
//!
//! The reference rasters are plain single-band GeoTIFFs with an affine
//! transform and (for anything feeding area math) a linear-unit CRS.
//! The reader pulls the whole band into memory as f64 (study-area
//! rasters are small) and closes the file handle before returning, so
//! concurrent sessions never hold locks across user think-time.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

use msp_common::{CrsDef, MspError, MspResult};

// GeoTIFF private tags.
pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey ids.
pub(crate) const KEY_MODEL_TYPE: u64 = 1024;
pub(crate) const KEY_GEOGRAPHIC_TYPE: u64 = 2048;
pub(crate) const KEY_PROJECTED_CS_TYPE: u64 = 3072;

/// Affine pixel↔world transform, rasterio parameter naming:
/// `x = a·col + b·row + c`, `y = d·col + e·row + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// North-up transform from an origin (upper-left corner) and pixel
    /// sizes, the common scale+tiepoint GeoTIFF encoding.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_x: f64, pixel_y: f64) -> Self {
        Self {
            a: pixel_x,
            b: 0.0,
            c: origin_x,
            d: 0.0,
            e: -pixel_y,
            f: origin_y,
        }
    }

    /// World coordinates of a (fractional) pixel position.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Inverse transform; `None` for a singular (degenerate) affine.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < 1e-12 {
            return None;
        }
        let dx = x - self.c;
        let dy = y - self.f;
        let col = (self.e * dx - self.b * dy) / det;
        let row = (self.a * dy - self.d * dx) / det;
        Some((col, row))
    }

    /// Area of one pixel in squared CRS units. `|a·e − b·d|`
    /// generalizes to non-axis-aligned, non-square pixels.
    pub fn pixel_area(&self) -> f64 {
        (self.a * self.e - self.b * self.d).abs()
    }
}

/// An in-memory single-band raster with its georeferencing.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: CrsDef,
    pub nodata: Option<f64>,
    data: Vec<f64>,
}

impl RasterGrid {
    /// Open a GeoTIFF, read band 1 and the georeferencing tags, and
    /// release the file handle.
    pub fn open(path: &Path) -> MspResult<Self> {
        let file = File::open(path)
            .map_err(|e| MspError::raster_read(format!("{}: {e}", path.display())))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| MspError::raster_read(format!("{}: {e}", path.display())))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| MspError::raster_read(format!("{}: {e}", path.display())))?;
        let image = decoder
            .read_image()
            .map_err(|e| MspError::raster_read(format!("{}: {e}", path.display())))?;
        let data = samples_to_f64(image);
        if data.len() != width as usize * height as usize {
            return Err(MspError::raster_read(format!(
                "{}: expected {} samples, got {} (multi-band rasters are not supported)",
                path.display(),
                width as usize * height as usize,
                data.len()
            )));
        }

        let transform = read_transform(&mut decoder, path)?;
        let crs = read_crs(&mut decoder, path)?;
        let nodata = read_nodata(&mut decoder);

        debug!(
            path = %path.display(),
            width,
            height,
            %crs,
            nodata,
            "opened raster"
        );

        Ok(Self {
            width: width as usize,
            height: height as usize,
            transform,
            crs,
            nodata,
            data,
        })
    }

    /// Raw sample at (col, row); `None` out of bounds or on nodata.
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        if v.is_nan() {
            return None;
        }
        if let Some(nodata) = self.nodata {
            if v == nodata {
                return None;
            }
        }
        Some(v)
    }

    /// Pixel area in squared CRS units (m² for a projected CRS).
    pub fn pixel_area(&self) -> f64 {
        self.transform.pixel_area()
    }

    /// Grid alignment check: identical CRS, affine transform and
    /// dimensions allow pixel-for-pixel comparison without resampling.
    pub fn same_grid_as(&self, other: &RasterGrid) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.crs.same_as(&other.crs)
            && self.transform == other.transform
    }
}

fn samples_to_f64(image: DecodingResult) -> Vec<f64> {
    fn cast<T: ToPrimitive>(values: Vec<T>) -> Vec<f64> {
        values
            .into_iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
    match image {
        DecodingResult::U8(v) => cast(v),
        DecodingResult::U16(v) => cast(v),
        DecodingResult::U32(v) => cast(v),
        DecodingResult::U64(v) => cast(v),
        DecodingResult::I8(v) => cast(v),
        DecodingResult::I16(v) => cast(v),
        DecodingResult::I32(v) => cast(v),
        DecodingResult::I64(v) => cast(v),
        DecodingResult::F32(v) => cast(v),
        DecodingResult::F64(v) => v,
    }
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> MspResult<GeoTransform> {
    // Scale + tiepoint is the common encoding.
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();
    if let (Some(scale), Some(tie)) = (&scale, &tiepoint) {
        if scale.len() >= 2 && tie.len() >= 6 {
            // Tiepoint maps raster (i, j) to world (x, y); anchor the
            // affine at pixel (0, 0).
            let origin_x = tie[3] - tie[0] * scale[0];
            let origin_y = tie[4] + tie[1] * scale[1];
            return Ok(GeoTransform::north_up(origin_x, origin_y, scale[0], scale[1]));
        }
    }

    // Full 4x4 model transformation as the fallback encoding.
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 16 {
            return Ok(GeoTransform {
                a: m[0],
                b: m[1],
                c: m[3],
                d: m[4],
                e: m[5],
                f: m[7],
            });
        }
    }

    Err(MspError::raster_read(format!(
        "{}: no GeoTIFF transform (ModelPixelScale/ModelTiepoint or ModelTransformation)",
        path.display()
    )))
}

fn read_crs<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> MspResult<CrsDef> {
    let keys = decoder
        .get_tag_u64_vec(Tag::GeoKeyDirectoryTag)
        .map_err(|_| {
            MspError::UnsupportedCrs(format!("{}: no GeoKeyDirectory tag", path.display()))
        })?;
    if keys.len() < 4 {
        return Err(MspError::UnsupportedCrs(format!(
            "{}: malformed GeoKeyDirectory",
            path.display()
        )));
    }

    let mut model_type = None;
    let mut geographic = None;
    let mut projected = None;
    for entry in keys[4..].chunks_exact(4) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key_id {
            KEY_MODEL_TYPE => model_type = Some(value),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            KEY_PROJECTED_CS_TYPE => projected = Some(value),
            _ => {}
        }
    }

    if let Some(code) = projected {
        return CrsDef::from_epsg(code as u32);
    }
    if let Some(code) = geographic {
        // Geographic rasters load fine; area math rejects them later.
        if model_type == Some(1) {
            return Err(MspError::UnsupportedCrs(format!(
                "{}: projected model type without a projected CS key",
                path.display()
            )));
        }
        return CrsDef::from_epsg(code as u32);
    }
    Err(MspError::UnsupportedCrs(format!(
        "{}: GeoKeyDirectory carries no CRS code",
        path.display()
    )))
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_matches('\0').trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_up_transform() {
        let t = GeoTransform::north_up(430000.0, 4815000.0, 10.0, 10.0);
        assert_eq!(t.pixel_to_geo(0.0, 0.0), (430000.0, 4815000.0));
        // Row 1 moves south.
        assert_eq!(t.pixel_to_geo(2.0, 1.0), (430020.0, 4814990.0));
        assert_eq!(t.pixel_area(), 100.0);
    }

    #[test]
    fn test_geo_to_pixel_inverts_pixel_to_geo() {
        let t = GeoTransform::north_up(1000.0, 2000.0, 5.0, 5.0);
        let (x, y) = t.pixel_to_geo(3.5, 7.5);
        let (col, row) = t.geo_to_pixel(x, y).unwrap();
        assert!((col - 3.5).abs() < 1e-9);
        assert!((row - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_area_with_rotation_terms() {
        let t = GeoTransform {
            a: 10.0,
            b: 1.0,
            c: 0.0,
            d: 2.0,
            e: -10.0,
            f: 0.0,
        };
        assert_eq!(t.pixel_area(), 102.0);
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        let t = GeoTransform {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        };
        assert!(t.geo_to_pixel(1.0, 1.0).is_none());
    }
}
