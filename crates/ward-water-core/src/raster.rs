//! Single-band rasters: intensity images, binary masks and frequency surfaces.
//!
//! All rasters are row-major with `len = width * height`. `NaN` marks
//! no-data in intensity images.

use serde::{Deserialize, Serialize};

/// Errors raised by raster construction and per-pixel reductions.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("empty input sequence")]
    EmptySequence,
    #[error("raster size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    #[error("invalid raster buffer: {width}x{height} needs {expected} values, got {got}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },
    #[error("frequency cutoff {cutoff} outside [0, 1]")]
    InvalidCutoff { cutoff: f32 },
}

fn check_len(width: usize, height: usize, got: usize) -> Result<(), RasterError> {
    let expected = width * height;
    if expected != got {
        return Err(RasterError::InvalidDimensions {
            width,
            height,
            expected,
            got,
        });
    }
    Ok(())
}

/// Fail unless `(width, height)` equals the expected extent.
pub fn ensure_same_extent(
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), RasterError> {
    if expected != actual {
        return Err(RasterError::SizeMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: actual.0,
            height: actual.1,
        });
    }
    Ok(())
}

/// Borrowed single-band intensity raster.
#[derive(Clone, Copy, Debug)]
pub struct IntensityView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [f32], // row-major, len = w*h
}

impl IntensityView<'_> {
    /// Value at `(x, y)`, `None` outside the raster or on no-data.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let v = self.data[y * self.width + x];
        (!v.is_nan()).then_some(v)
    }

    #[inline]
    pub fn extent(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Owned single-band intensity raster, e.g. backscatter in dB.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntensityImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl IntensityImage {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, RasterError> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build from a per-pixel function of `(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn view(&self) -> IntensityView<'_> {
        IntensityView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn extent(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of pixels carrying a value.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Per-pixel mean of same-extent images, ignoring no-data.
///
/// A pixel without any valid sample stays no-data. Used to build the
/// dry-season composite that per-region histograms are taken from.
pub fn mean_composite(images: &[IntensityImage]) -> Result<IntensityImage, RasterError> {
    let first = images.first().ok_or(RasterError::EmptySequence)?;
    for img in &images[1..] {
        ensure_same_extent(first.extent(), img.extent())?;
    }

    let n = first.data.len();
    let mut sum = vec![0f64; n];
    let mut count = vec![0u32; n];
    for img in images {
        for (i, &v) in img.data.iter().enumerate() {
            if !v.is_nan() {
                sum[i] += v as f64;
                count[i] += 1;
            }
        }
    }

    let data = sum
        .iter()
        .zip(&count)
        .map(|(&s, &c)| if c == 0 { f32::NAN } else { (s / c as f64) as f32 })
        .collect();

    Ok(IntensityImage {
        width: first.width,
        height: first.height,
        data,
    })
}

/// One acquisition: an intensity image and its timestamp (ms since epoch).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub acquired_ms: Option<i64>,
    pub image: IntensityImage,
}

impl Scene {
    pub fn new(acquired_ms: Option<i64>, image: IntensityImage) -> Self {
        Self { acquired_ms, image }
    }
}

/// Binary raster, 1 = positive class (water), 0 otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Mask {
    /// All-zero mask.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Build from raw values; anything non-zero is stored as 1.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RasterError> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data: data.into_iter().map(|v| u8::from(v != 0)).collect(),
        })
    }

    #[inline]
    pub fn extent(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Pixel-wise logical OR.
    pub fn union(self, other: &Mask) -> Result<Mask, RasterError> {
        ensure_same_extent(self.extent(), other.extent())?;
        let Mask {
            width,
            height,
            mut data,
        } = self;
        for (a, &b) in data.iter_mut().zip(&other.data) {
            *a |= b;
        }
        Ok(Mask {
            width,
            height,
            data,
        })
    }

    pub fn water_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Share of pixels set to 1; 0 for an empty raster.
    pub fn water_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.water_count() as f64 / self.data.len() as f64
    }
}

/// Per-pixel occurrence frequency in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencySurface {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl FrequencySurface {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, RasterError> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn extent(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }
}
