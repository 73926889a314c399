//! Otsu threshold selection over a bucketed histogram.
//!
//! Candidate split `i` puts buckets `[0, i)` into class A and `[i, N)` into
//! class B. The split with the largest between-class variance
//!
//! ```text
//! BCV(i) = countA * (meanA - mean)^2 + countB * (meanB - mean)^2
//! ```
//!
//! wins, and the returned threshold is the lowest bucket mean of class B, so
//! `value < threshold` selects exactly class A.

use crate::histogram::{Histogram, HistogramError};
use serde::{Deserialize, Serialize};

/// Relative tolerance under which two variances count as tied.
const TIE_REL_EPS: f64 = 1e-9;

/// Which split to keep when several reach the maximal between-class variance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the lowest threshold among tied splits.
    Lowest,
    /// Keep the highest threshold among tied splits.
    #[default]
    Highest,
}

/// Mass and count-weighted mean of one side of a split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub count: f64,
    pub mean: f64,
}

/// Winning split of [`otsu_threshold`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OtsuSolution {
    /// Lowest bucket mean of class B.
    pub threshold: f64,
    /// Number of buckets in class A.
    pub split_index: usize,
    pub between_class_variance: f64,
    /// Buckets below the threshold.
    pub class_a: ClassStats,
    /// Buckets at or above the threshold.
    pub class_b: ClassStats,
}

/// Otsu solver parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtsuParams {
    pub tie_break: TieBreak,
}

/// Between-class variance of every candidate split `1..N`.
///
/// `None` marks a split with an empty class. Fails with
/// [`HistogramError::EmptyHistogram`] when the total count is zero.
pub fn between_class_variances(hist: &Histogram) -> Result<Vec<Option<f64>>, HistogramError> {
    Ok(scan_splits(hist)?
        .into_iter()
        .map(|s| s.map(|s| s.between_class_variance))
        .collect())
}

/// Compute the Otsu threshold of `hist`.
///
/// Errors:
/// - [`HistogramError::EmptyHistogram`] if all counts are zero,
/// - [`HistogramError::DegenerateClass`] if no split leaves both classes
///   non-empty (for example all mass in one bucket).
pub fn otsu_threshold(hist: &Histogram, params: &OtsuParams) -> Result<OtsuSolution, HistogramError> {
    let mut best: Option<OtsuSolution> = None;

    for cand in scan_splits(hist)?.into_iter().flatten() {
        best = match best {
            None => Some(cand),
            Some(cur) => {
                let a = cand.between_class_variance;
                let b = cur.between_class_variance;
                if is_tie(a, b) {
                    // Splits are visited in ascending threshold order.
                    match params.tie_break {
                        TieBreak::Lowest => Some(cur),
                        TieBreak::Highest => Some(cand),
                    }
                } else if a > b {
                    Some(cand)
                } else {
                    Some(cur)
                }
            }
        };
    }

    best.ok_or(HistogramError::DegenerateClass {
        buckets: hist.len(),
    })
}

fn is_tie(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIE_REL_EPS * a.abs().max(b.abs()).max(1.0)
}

fn scan_splits(hist: &Histogram) -> Result<Vec<Option<OtsuSolution>>, HistogramError> {
    let buckets = hist.buckets();
    let total = hist.total_count();
    if total <= 0.0 {
        return Err(HistogramError::EmptyHistogram);
    }
    let sum_total: f64 = buckets.iter().map(|b| b.count * b.mean).sum();
    let mean_global = sum_total / total;

    // Absorbs rounding when summing fractional counts.
    let empty_eps = total * 1e-12;

    let mut splits = Vec::with_capacity(buckets.len());
    let mut count_a = 0f64;
    let mut sum_a = 0f64;

    for i in 1..=buckets.len() {
        let b = buckets[i - 1];
        count_a += b.count;
        sum_a += b.count * b.mean;

        let count_b = total - count_a;
        if count_a <= empty_eps || count_b <= empty_eps || i == buckets.len() {
            splits.push(None);
            continue;
        }

        let mean_a = sum_a / count_a;
        let mean_b = (sum_total - count_a * mean_a) / count_b;
        let bcv = count_a * (mean_a - mean_global).powi(2)
            + count_b * (mean_b - mean_global).powi(2);

        splits.push(Some(OtsuSolution {
            threshold: buckets[i].mean,
            split_index: i,
            between_class_variance: bcv,
            class_a: ClassStats {
                count: count_a,
                mean: mean_a,
            },
            class_b: ClassStats {
                count: count_b,
                mean: mean_b,
            },
        }));
    }

    Ok(splits)
}
