//! 8-bit grayscale PNG export of masks and frequency surfaces.

use crate::core::{FrequencySurface, Mask};
use ::image::GrayImage;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("raster {width}x{height} does not fit an image buffer")]
    Dimensions { width: usize, height: usize },
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

fn gray(width: usize, height: usize, data: Vec<u8>) -> Result<GrayImage, ExportError> {
    let dims = ExportError::Dimensions { width, height };
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(dims);
    };
    GrayImage::from_raw(w, h, data).ok_or(dims)
}

/// Water as 255, everything else as 0.
pub fn mask_to_gray(mask: &Mask) -> Result<GrayImage, ExportError> {
    gray(
        mask.width,
        mask.height,
        mask.data.iter().map(|&v| if v != 0 { 255 } else { 0 }).collect(),
    )
}

/// Frequency scaled linearly from `[0, 1]` to `0..=255`.
pub fn frequency_to_gray(frequency: &FrequencySurface) -> Result<GrayImage, ExportError> {
    gray(
        frequency.width,
        frequency.height,
        frequency
            .data
            .iter()
            .map(|&f| (f.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
    )
}

pub fn write_mask_png(mask: &Mask, path: impl AsRef<Path>) -> Result<(), ExportError> {
    mask_to_gray(mask)?.save(path)?;
    Ok(())
}

pub fn write_frequency_png(
    frequency: &FrequencySurface,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    frequency_to_gray(frequency)?.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_scales_to_full_range() {
        let f = FrequencySurface::new(3, 1, vec![0.0, 0.5, 1.0]).expect("3x1");
        let img = frequency_to_gray(&f).expect("gray");
        assert_eq!(img.as_raw(), &vec![0u8, 128, 255]);
    }

    #[test]
    fn mask_png_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask.png");
        let mask = Mask::new(2, 2, vec![1, 0, 0, 1]).expect("2x2");
        write_mask_png(&mask, &path).expect("write");

        let back = ::image::open(&path).expect("open").to_luma8();
        assert_eq!(back.dimensions(), (2, 2));
        assert_eq!(back.as_raw(), &vec![255u8, 0, 0, 255]);
    }
}
