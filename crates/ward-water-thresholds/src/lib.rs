//! Per-region (per-ward) Otsu thresholds.
//!
//! One histogram is requested per region from a [`HistogramReducer`] over a
//! time-aggregated composite, and each is solved independently. A region that
//! cannot be solved receives a caller-chosen fallback threshold and is
//! flagged, so one bad ward never aborts the whole calculation.
//!
//! With the `rayon` feature the per-region requests run in parallel; results
//! are keyed by region id either way.

mod calculator;
mod catalog;
mod reducer;
mod summary;

pub use calculator::{
    solve_raw_histogram, RegionFailure, RegionThresholds, ThresholdError, ThresholdMap,
    ThresholdOutcome, WardThresholdCalculator, WardThresholdParams,
};
pub use catalog::{CatalogError, RegionCatalog};
pub use reducer::{
    HistogramParams, HistogramReducer, PixelHistogramReducer, ReduceError, MAX_BUCKETS_LIMIT,
};
pub use summary::ThresholdSummary;
