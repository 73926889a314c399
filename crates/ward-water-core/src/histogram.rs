//! Bucketed intensity histograms.
//!
//! A reducer hands back two parallel arrays (bucket counts and bucket means).
//! [`Histogram::from_raw`] checks them and zips them into ordered buckets that
//! the solver can consume without further validation.

use serde::{Deserialize, Serialize};

/// Errors raised while building or solving a histogram.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HistogramError {
    #[error("malformed histogram: {reason}")]
    MalformedHistogram { reason: String },
    #[error("histogram has zero total count")]
    EmptyHistogram,
    #[error("no split of {buckets} bucket(s) yields two non-empty classes")]
    DegenerateClass { buckets: usize },
}

impl HistogramError {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedHistogram {
            reason: reason.into(),
        }
    }

    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedHistogram { .. } => "malformed_histogram",
            Self::EmptyHistogram => "empty_histogram",
            Self::DegenerateClass { .. } => "degenerate_class",
        }
    }
}

/// Histogram as returned by a reducer: counts and means as separate sequences.
///
/// Field names follow the reducer output (`histogram`, `bucketMeans`) so a
/// JSON dump of a remote result deserializes directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHistogram {
    /// Per-bucket counts, possibly fractional for weighted reducers.
    pub histogram: Vec<f64>,
    /// Per-bucket mean intensity.
    #[serde(rename = "bucketMeans")]
    pub bucket_means: Vec<f64>,
}

impl RawHistogram {
    pub fn new(histogram: Vec<f64>, bucket_means: Vec<f64>) -> Self {
        Self {
            histogram,
            bucket_means,
        }
    }
}

/// One histogram bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub mean: f64,
    pub count: f64,
}

/// Validated histogram: non-empty, buckets in ascending mean order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHistogram", into = "RawHistogram")]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
}

impl Histogram {
    /// Normalize a raw reducer result into aligned buckets.
    ///
    /// Fails with [`HistogramError::MalformedHistogram`] when either sequence
    /// is empty, the lengths differ, a count is negative or not finite, a mean
    /// is not finite, or the means are not strictly ascending.
    pub fn from_raw(raw: &RawHistogram) -> Result<Self, HistogramError> {
        Self::from_parts(&raw.histogram, &raw.bucket_means)
    }

    /// Same as [`Histogram::from_raw`] for borrowed slices.
    pub fn from_parts(counts: &[f64], means: &[f64]) -> Result<Self, HistogramError> {
        if counts.is_empty() || means.is_empty() {
            return Err(HistogramError::malformed("no buckets"));
        }
        if counts.len() != means.len() {
            return Err(HistogramError::malformed(format!(
                "{} counts vs {} bucket means",
                counts.len(),
                means.len()
            )));
        }

        let mut buckets = Vec::with_capacity(counts.len());
        for (idx, (&count, &mean)) in counts.iter().zip(means).enumerate() {
            if !count.is_finite() || count < 0.0 {
                return Err(HistogramError::malformed(format!(
                    "bucket {idx} has invalid count {count}"
                )));
            }
            if !mean.is_finite() {
                return Err(HistogramError::malformed(format!(
                    "bucket {idx} has invalid mean {mean}"
                )));
            }
            if let Some(prev) = buckets.last().map(|b: &HistogramBucket| b.mean) {
                if mean <= prev {
                    return Err(HistogramError::malformed(format!(
                        "bucket means not ascending at {idx} ({prev} then {mean})"
                    )));
                }
            }
            buckets.push(HistogramBucket { mean, count });
        }

        Ok(Self { buckets })
    }

    /// Build from `(mean, count)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, HistogramError> {
        let (means, counts): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
        Self::from_parts(&counts, &means)
    }

    #[inline]
    pub fn buckets(&self) -> &[HistogramBucket] {
        &self.buckets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Never true for a validated histogram.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn means(&self) -> impl Iterator<Item = f64> + '_ {
        self.buckets.iter().map(|b| b.mean)
    }

    pub fn counts(&self) -> impl Iterator<Item = f64> + '_ {
        self.buckets.iter().map(|b| b.count)
    }

    pub fn total_count(&self) -> f64 {
        self.counts().sum()
    }

    /// Split back into the reducer's two-array layout.
    pub fn to_raw(&self) -> RawHistogram {
        RawHistogram {
            histogram: self.counts().collect(),
            bucket_means: self.means().collect(),
        }
    }
}

impl TryFrom<RawHistogram> for Histogram {
    type Error = HistogramError;

    fn try_from(raw: RawHistogram) -> Result<Self, Self::Error> {
        Histogram::from_raw(&raw)
    }
}

impl From<Histogram> for RawHistogram {
    fn from(h: Histogram) -> Self {
        h.to_raw()
    }
}
