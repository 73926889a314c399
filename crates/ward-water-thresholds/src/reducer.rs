//! Histogram reducers: turn the pixels of one footprint into a histogram.
//!
//! [`HistogramReducer`] is the seam to whatever computes histograms (a remote
//! image service, a tile server, ...). [`PixelHistogramReducer`] is the
//! in-process implementation over an [`IntensityView`].

use log::debug;
use serde::{Deserialize, Serialize};
use ward_water_core::{Footprint, IntensityView, RawHistogram};

/// Errors a reducer can report for one region.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    #[error("footprint has no valid pixels")]
    NoValidPixels,
    #[error("footprint samples {count} pixels, budget is {max_pixels}")]
    TooManyPixels { count: usize, max_pixels: usize },
    #[error("invalid histogram parameters: {0}")]
    InvalidParams(String),
    #[error("reducer backend failed: {0}")]
    Backend(String),
}

impl ReduceError {
    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoValidPixels => "no_valid_pixels",
            Self::TooManyPixels { .. } => "too_many_pixels",
            Self::InvalidParams(_) => "invalid_params",
            Self::Backend(_) => "backend",
        }
    }
}

/// Largest bucket count a request may ask for.
pub const MAX_BUCKETS_LIMIT: usize = 65_536;

fn default_max_buckets() -> usize {
    255
}

fn default_scale() -> usize {
    1
}

fn default_max_pixels() -> usize {
    1_000_000_000
}

fn default_best_effort() -> bool {
    true
}

/// Histogram request parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramParams {
    /// Upper bound on the number of buckets.
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,
    /// Lower bound on the bucket width, in intensity units.
    #[serde(default)]
    pub min_bucket_width: Option<f64>,
    /// Sampling stride in pixels (1 = every pixel).
    #[serde(default = "default_scale")]
    pub scale: usize,
    /// Pixel budget per footprint.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: usize,
    /// Coarsen the stride instead of failing when over budget.
    #[serde(default = "default_best_effort")]
    pub best_effort: bool,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            max_buckets: default_max_buckets(),
            min_bucket_width: None,
            scale: default_scale(),
            max_pixels: default_max_pixels(),
            best_effort: default_best_effort(),
        }
    }
}

impl HistogramParams {
    pub fn validate(&self) -> Result<(), ReduceError> {
        if self.max_buckets == 0 || self.max_buckets > MAX_BUCKETS_LIMIT {
            return Err(ReduceError::InvalidParams(format!(
                "max_buckets must be in 1..={MAX_BUCKETS_LIMIT}, got {}",
                self.max_buckets
            )));
        }
        if self.scale == 0 {
            return Err(ReduceError::InvalidParams("scale must be >= 1".into()));
        }
        if self.max_pixels == 0 {
            return Err(ReduceError::InvalidParams("max_pixels must be >= 1".into()));
        }
        if let Some(w) = self.min_bucket_width {
            if !w.is_finite() || w < 0.0 {
                return Err(ReduceError::InvalidParams(format!(
                    "min_bucket_width must be finite and >= 0, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Computes the histogram of `image` restricted to `footprint`.
///
/// Implementations may sample or approximate; the threshold calculator only
/// needs ascending bucket means with non-negative counts. Calls may block for
/// a long time and may run concurrently for different footprints.
pub trait HistogramReducer: Sync {
    fn reduce(
        &self,
        image: &IntensityView<'_>,
        footprint: &Footprint,
        params: &HistogramParams,
    ) -> Result<RawHistogram, ReduceError>;
}

/// Equal-width histogram over the sampled pixels of a footprint.
///
/// Bucket means are bucket centres. No-data pixels are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelHistogramReducer;

impl PixelHistogramReducer {
    fn sample(
        image: &IntensityView<'_>,
        footprint: &Footprint,
        params: &HistogramParams,
    ) -> Result<Vec<f64>, ReduceError> {
        let (w, h) = image.extent();
        let mut stride = params.scale;
        loop {
            let count = footprint
                .pixels(w, h, stride)
                .filter(|&(x, y)| image.get(x, y).is_some())
                .count();
            if count <= params.max_pixels {
                break;
            }
            if !params.best_effort {
                return Err(ReduceError::TooManyPixels {
                    count,
                    max_pixels: params.max_pixels,
                });
            }
            let factor = (count as f64 / params.max_pixels as f64).sqrt().ceil() as usize;
            stride *= factor.max(2);
            debug!("best effort: over budget ({count} px), stride -> {stride}");
        }

        Ok(footprint
            .pixels(w, h, stride)
            .filter_map(|(x, y)| image.get(x, y))
            .map(f64::from)
            .collect())
    }
}

impl HistogramReducer for PixelHistogramReducer {
    fn reduce(
        &self,
        image: &IntensityView<'_>,
        footprint: &Footprint,
        params: &HistogramParams,
    ) -> Result<RawHistogram, ReduceError> {
        params.validate()?;
        let values = Self::sample(image, footprint, params)?;
        if values.is_empty() {
            return Err(ReduceError::NoValidPixels);
        }
        Ok(bucketize(&values, params))
    }
}

/// Bucket `values` (non-empty, finite) into equal-width buckets.
fn bucketize(values: &[f64], params: &HistogramParams) -> RawHistogram {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if range <= 0.0 {
        return RawHistogram::new(vec![values.len() as f64], vec![lo]);
    }

    let width = (range / params.max_buckets as f64).max(params.min_bucket_width.unwrap_or(0.0));
    let n = ((range / width).ceil() as usize).clamp(1, params.max_buckets);

    let mut counts = vec![0f64; n];
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(n - 1);
        counts[idx] += 1.0;
    }
    let means = (0..n).map(|i| lo + (i as f64 + 0.5) * width).collect();

    RawHistogram::new(counts, means)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ward_water_core::IntensityImage;

    fn two_level_image() -> IntensityImage {
        // left half -20 dB, right half -10 dB
        IntensityImage::from_fn(8, 4, |x, _| if x < 4 { -20.0 } else { -10.0 })
    }

    #[test]
    fn counts_every_pixel_in_footprint() {
        let img = two_level_image();
        let raw = PixelHistogramReducer
            .reduce(
                &img.view(),
                &Footprint::rect(0, 0, 8, 4),
                &HistogramParams {
                    max_buckets: 4,
                    ..Default::default()
                },
            )
            .expect("histogram");
        assert_eq!(raw.histogram, vec![16.0, 0.0, 0.0, 16.0]);
        assert_relative_eq!(raw.bucket_means[0], -18.75);
        assert_relative_eq!(raw.bucket_means[3], -11.25);
    }

    #[test]
    fn constant_footprint_gives_single_bucket() {
        let img = two_level_image();
        let raw = PixelHistogramReducer
            .reduce(
                &img.view(),
                &Footprint::rect(0, 0, 4, 4),
                &HistogramParams::default(),
            )
            .expect("histogram");
        assert_eq!(raw.histogram, vec![16.0]);
        assert_eq!(raw.bucket_means, vec![-20.0]);
    }

    #[test]
    fn min_bucket_width_limits_bucket_count() {
        let img = IntensityImage::from_fn(10, 1, |x, _| -20.0 + x as f32);
        let raw = PixelHistogramReducer
            .reduce(
                &img.view(),
                &Footprint::rect(0, 0, 10, 1),
                &HistogramParams {
                    min_bucket_width: Some(3.0),
                    ..Default::default()
                },
            )
            .expect("histogram");
        assert_eq!(raw.histogram.len(), 3);
        assert_eq!(raw.histogram.iter().sum::<f64>(), 10.0);
    }

    #[test]
    fn nodata_only_footprint_has_no_valid_pixels() {
        let img = IntensityImage::filled(4, 4, f32::NAN);
        let err = PixelHistogramReducer
            .reduce(
                &img.view(),
                &Footprint::rect(0, 0, 4, 4),
                &HistogramParams::default(),
            )
            .unwrap_err();
        assert_eq!(err, ReduceError::NoValidPixels);

        let outside = PixelHistogramReducer.reduce(
            &two_level_image().view(),
            &Footprint::rect(20, 20, 30, 30),
            &HistogramParams::default(),
        );
        assert_eq!(outside, Err(ReduceError::NoValidPixels));
    }

    #[test]
    fn pixel_budget_is_enforced_or_coarsened() {
        let img = two_level_image();
        let strict = HistogramParams {
            max_pixels: 10,
            best_effort: false,
            ..Default::default()
        };
        assert_eq!(
            PixelHistogramReducer.reduce(&img.view(), &Footprint::rect(0, 0, 8, 4), &strict),
            Err(ReduceError::TooManyPixels {
                count: 32,
                max_pixels: 10
            })
        );

        let lenient = HistogramParams {
            best_effort: true,
            ..strict
        };
        let raw = PixelHistogramReducer
            .reduce(&img.view(), &Footprint::rect(0, 0, 8, 4), &lenient)
            .expect("coarsened histogram");
        let total: f64 = raw.histogram.iter().sum();
        assert!(total <= 10.0 && total > 0.0);
    }

    #[test]
    fn oversized_bucket_request_is_rejected_before_reducing() {
        let params = HistogramParams {
            max_buckets: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(ReduceError::InvalidParams(_))));
        let res = PixelHistogramReducer.reduce(
            &two_level_image().view(),
            &Footprint::rect(0, 0, 8, 4),
            &params,
        );
        assert!(matches!(res, Err(ReduceError::InvalidParams(_))));

        let at_limit = HistogramParams {
            max_buckets: MAX_BUCKETS_LIMIT,
            ..Default::default()
        };
        assert_eq!(at_limit.validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_scale() {
        let params = HistogramParams {
            scale: 0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(ReduceError::InvalidParams(_))));
    }
}
