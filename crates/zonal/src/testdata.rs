//! Synthetic raster generation for tests.
//!
//! Writes small single-band GeoTIFFs carrying the same tags the
//! reader parses (ModelPixelScale, ModelTiepoint, GeoKeyDirectory,
//! GDAL nodata), so aggregator tests run against files with known
//! values instead of committed fixtures.

use std::fs::File;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use msp_common::{MspError, MspResult};

use crate::raster::{
    GeoTransform, KEY_GEOGRAPHIC_TYPE, KEY_MODEL_TYPE, KEY_PROJECTED_CS_TYPE,
    TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT,
};

/// GeoKeyDirectory for a projected EPSG code.
fn projected_geokeys(epsg: u32) -> Vec<u16> {
    vec![
        1, 1, 0, 2, // directory header
        KEY_MODEL_TYPE as u16, 0, 1, 1, // ModelTypeProjected
        KEY_PROJECTED_CS_TYPE as u16, 0, 1, epsg as u16,
    ]
}

/// GeoKeyDirectory for a geographic EPSG code.
fn geographic_geokeys(epsg: u32) -> Vec<u16> {
    vec![
        1, 1, 0, 2,
        KEY_MODEL_TYPE as u16, 0, 1, 2, // ModelTypeGeographic
        KEY_GEOGRAPHIC_TYPE as u16, 0, 1, epsg as u16,
    ]
}

fn geotiff_tags(transform: &GeoTransform) -> (Vec<f64>, Vec<f64>) {
    let scale = vec![transform.a, -transform.e, 0.0];
    let tiepoint = vec![0.0, 0.0, 0.0, transform.c, transform.f, 0.0];
    (scale, tiepoint)
}

/// Write a classified habitat raster (u8 class codes, north-up
/// transform, projected or geographic EPSG).
pub fn write_class_raster(
    path: &Path,
    width: usize,
    height: usize,
    transform: &GeoTransform,
    epsg: u32,
    geographic: bool,
    codes: &[u8],
) -> MspResult<()> {
    assert_eq!(codes.len(), width * height, "sample count mismatch");
    let (scale, tiepoint) = geotiff_tags(transform);
    let keys = if geographic {
        geographic_geokeys(epsg)
    } else {
        projected_geokeys(epsg)
    };

    let file = File::create(path)?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| MspError::Io(format!("tiff encoder: {e}")))?;
    let mut image = encoder
        .new_image::<colortype::Gray8>(width as u32, height as u32)
        .map_err(|e| MspError::Io(format!("tiff image: {e}")))?;
    write_geo_tags(image.encoder(), &scale, &tiepoint, &keys)?;
    image
        .write_data(codes)
        .map_err(|e| MspError::Io(format!("tiff data: {e}")))?;
    Ok(())
}

fn write_geo_tags<W: std::io::Write + std::io::Seek, K: tiff::encoder::TiffKind>(
    encoder: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    scale: &[f64],
    tiepoint: &[f64],
    keys: &[u16],
) -> MspResult<()> {
    encoder
        .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), scale)
        .map_err(|e| MspError::Io(format!("tiff tags: {e}")))?;
    encoder
        .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint)
        .map_err(|e| MspError::Io(format!("tiff tags: {e}")))?;
    encoder
        .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), keys)
        .map_err(|e| MspError::Io(format!("tiff tags: {e}")))?;
    Ok(())
}

/// Write a continuous accretion raster (f32 values, optional nodata).
pub fn write_accretion_raster(
    path: &Path,
    width: usize,
    height: usize,
    transform: &GeoTransform,
    epsg: u32,
    values: &[f32],
    nodata: Option<f64>,
) -> MspResult<()> {
    assert_eq!(values.len(), width * height, "sample count mismatch");
    let (scale, tiepoint) = geotiff_tags(transform);
    let keys = projected_geokeys(epsg);

    let file = File::create(path)?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| MspError::Io(format!("tiff encoder: {e}")))?;
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(width as u32, height as u32)
        .map_err(|e| MspError::Io(format!("tiff image: {e}")))?;
    write_geo_tags(image.encoder(), &scale, &tiepoint, &keys)?;
    if let Some(nodata) = nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GDAL_NODATA), format!("{nodata}").as_str())
            .map_err(|e| MspError::Io(format!("tiff nodata tag: {e}")))?;
    }
    image
        .write_data(values)
        .map_err(|e| MspError::Io(format!("tiff data: {e}")))?;
    Ok(())
}

/// A uniform class grid.
pub fn uniform_codes(width: usize, height: usize, code: u8) -> Vec<u8> {
    vec![code; width * height]
}

/// A grid split into vertical bands, one class per band, left to
/// right. Handy for per-class counting tests.
pub fn banded_codes(width: usize, height: usize, bands: &[u8]) -> Vec<u8> {
    let mut codes = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let band = col * bands.len() / width;
            codes.push(bands[band]);
        }
    }
    codes
}
