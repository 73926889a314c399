use serde::{Deserialize, Serialize};

use crate::calculator::RegionThresholds;

/// Distribution of the thresholds of one calculation.
///
/// Statistics cover every region, fallbacks included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSummary {
    pub regions: usize,
    pub solved: usize,
    pub fallback: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl ThresholdSummary {
    /// `None` when there are no thresholds.
    pub fn from_thresholds(res: &RegionThresholds) -> Option<Self> {
        let values: Vec<f64> = res.thresholds.values().collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let fallback = res.fallback_regions().count();

        Some(Self {
            regions: values.len(),
            solved: values.len() - fallback,
            fallback,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean,
            std_dev: var.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{ThresholdMap, ThresholdOutcome};
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;
    use ward_water_core::RegionId;

    #[test]
    fn summarizes_all_thresholds() {
        let thresholds: ThresholdMap = [
            (RegionId::from(1), -17.0),
            (RegionId::from(2), -13.0),
            (RegionId::from(3), -15.0),
        ]
        .into_iter()
        .collect();
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            RegionId::from(3),
            ThresholdOutcome::Fallback {
                kind: "empty_histogram".into(),
                message: "histogram has zero total count".into(),
            },
        );
        let res = RegionThresholds {
            thresholds,
            outcomes,
        };

        let s = res.summary().expect("three thresholds");
        assert_eq!((s.regions, s.solved, s.fallback), (3, 2, 1));
        assert_eq!((s.min, s.max), (-17.0, -13.0));
        assert_relative_eq!(s.mean, -15.0);
        assert_relative_eq!(s.std_dev, (8.0f64 / 3.0).sqrt());
    }

    #[test]
    fn no_thresholds_no_summary() {
        let res = RegionThresholds {
            thresholds: ThresholdMap::default(),
            outcomes: BTreeMap::new(),
        };
        assert!(ThresholdSummary::from_thresholds(&res).is_none());
    }
}
