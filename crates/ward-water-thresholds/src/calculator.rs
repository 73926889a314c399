//! Per-region threshold calculation with fail-soft fallbacks.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use ward_water_core::{
    otsu_threshold, Histogram, HistogramError, IntensityView, OtsuParams, OtsuSolution, Region,
    RegionId,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::catalog::RegionCatalog;
use crate::reducer::{HistogramParams, HistogramReducer, ReduceError};
use crate::summary::ThresholdSummary;

/// Fatal errors of a threshold calculation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("no regions to threshold")]
    NoRegions,
}

/// Why one region could not be solved.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegionFailure {
    #[error(transparent)]
    Reduce(#[from] ReduceError),
    #[error(transparent)]
    Histogram(#[from] HistogramError),
}

impl RegionFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reduce(e) => e.kind(),
            Self::Histogram(e) => e.kind(),
        }
    }
}

/// Threshold per region. Built once by the calculator, read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThresholdMap {
    inner: BTreeMap<RegionId, f64>,
}

impl ThresholdMap {
    pub fn get(&self, id: &RegionId) -> Option<f64> {
        self.inner.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, f64)> {
        self.inner.iter().map(|(k, &v)| (k, v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.inner.values().copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(RegionId, f64)> for ThresholdMap {
    fn from_iter<I: IntoIterator<Item = (RegionId, f64)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

/// How a region's threshold was obtained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThresholdOutcome {
    Solved { solution: OtsuSolution },
    Fallback { kind: String, message: String },
}

impl ThresholdOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ThresholdOutcome::Fallback { .. })
    }
}

impl From<&RegionFailure> for ThresholdOutcome {
    fn from(err: &RegionFailure) -> Self {
        ThresholdOutcome::Fallback {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

fn default_fallback_threshold() -> f64 {
    -15.0
}

/// Parameters of a per-region threshold calculation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WardThresholdParams {
    /// Threshold assigned to a region whose histogram could not be solved.
    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: f64,
    #[serde(default)]
    pub histogram: HistogramParams,
    #[serde(default)]
    pub otsu: OtsuParams,
}

impl Default for WardThresholdParams {
    fn default() -> Self {
        Self {
            fallback_threshold: default_fallback_threshold(),
            histogram: HistogramParams::default(),
            otsu: OtsuParams::default(),
        }
    }
}

/// Result of a per-region calculation: thresholds plus how each was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionThresholds {
    pub thresholds: ThresholdMap,
    pub outcomes: BTreeMap<RegionId, ThresholdOutcome>,
}

impl RegionThresholds {
    pub fn is_fallback(&self, id: &RegionId) -> bool {
        self.outcomes.get(id).is_some_and(ThresholdOutcome::is_fallback)
    }

    /// Regions that received the fallback threshold.
    pub fn fallback_regions(&self) -> impl Iterator<Item = &RegionId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_fallback())
            .map(|(id, _)| id)
    }

    pub fn summary(&self) -> Option<ThresholdSummary> {
        ThresholdSummary::from_thresholds(self)
    }
}

/// Solve one histogram end to end: accessor then solver.
pub fn solve_raw_histogram(
    raw: &ward_water_core::RawHistogram,
    params: &OtsuParams,
) -> Result<OtsuSolution, HistogramError> {
    let hist = Histogram::from_raw(raw)?;
    otsu_threshold(&hist, params)
}

/// Otsu thresholds for every region of a catalog.
pub struct WardThresholdCalculator<R> {
    reducer: R,
    params: WardThresholdParams,
}

impl<R: HistogramReducer> WardThresholdCalculator<R> {
    pub fn new(reducer: R, params: WardThresholdParams) -> Self {
        Self { reducer, params }
    }

    #[inline]
    pub fn params(&self) -> &WardThresholdParams {
        &self.params
    }

    #[inline]
    pub fn reducer(&self) -> &R {
        &self.reducer
    }

    /// Threshold one region, without fallback.
    pub fn solve_region(
        &self,
        composite: &IntensityView<'_>,
        region: &Region,
    ) -> Result<OtsuSolution, RegionFailure> {
        let raw = self
            .reducer
            .reduce(composite, &region.footprint, &self.params.histogram)?;
        Ok(solve_raw_histogram(&raw, &self.params.otsu)?)
    }

    /// Threshold every region of `catalog` over the `composite` surface.
    ///
    /// A region that fails (no valid pixels, empty or degenerate histogram,
    /// reducer error) gets `fallback_threshold` and a `Fallback` outcome
    /// carrying the failure kind. Only an empty catalog is fatal.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            level = "info",
            skip(self, composite, catalog),
            fields(regions = catalog.len(), width = composite.width, height = composite.height)
        )
    )]
    pub fn compute(
        &self,
        composite: &IntensityView<'_>,
        catalog: &RegionCatalog,
    ) -> Result<RegionThresholds, ThresholdError> {
        if catalog.is_empty() {
            return Err(ThresholdError::NoRegions);
        }
        info!("thresholding {} region(s)", catalog.len());

        #[cfg(feature = "rayon")]
        let solved: Vec<(RegionId, Result<OtsuSolution, RegionFailure>)> = catalog
            .regions()
            .par_iter()
            .map(|r| (r.id.clone(), self.solve_region(composite, r)))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let solved: Vec<(RegionId, Result<OtsuSolution, RegionFailure>)> = catalog
            .iter()
            .map(|r| (r.id.clone(), self.solve_region(composite, r)))
            .collect();

        let mut thresholds = BTreeMap::new();
        let mut outcomes = BTreeMap::new();
        for (id, res) in solved {
            match res {
                Ok(solution) => {
                    debug!("region {id}: threshold {:.3}", solution.threshold);
                    thresholds.insert(id.clone(), solution.threshold);
                    outcomes.insert(id, ThresholdOutcome::Solved { solution });
                }
                Err(err) => {
                    warn!(
                        "region {id}: {err} ({}), using fallback {}",
                        err.kind(),
                        self.params.fallback_threshold
                    );
                    thresholds.insert(id.clone(), self.params.fallback_threshold);
                    outcomes.insert(id, ThresholdOutcome::from(&err));
                }
            }
        }

        let result = RegionThresholds {
            thresholds: ThresholdMap { inner: thresholds },
            outcomes,
        };
        if let Some(s) = result.summary() {
            info!(
                "thresholds for {} region(s), {} fallback: range {:.1} to {:.1}, mean {:.1}, std {:.1}",
                s.regions, s.fallback, s.min, s.max, s.mean, s.std_dev
            );
        }
        Ok(result)
    }
}
