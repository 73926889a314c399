//! End-to-end permanent-water run: scenes in, frequency surface out.

use log::info;
use serde::{Deserialize, Serialize};

use crate::core::{
    mean_composite, Footprint, FrequencySurface, IntensityImage, IntensityView, Mask, RasterError,
    Region, RegionId, Scene,
};
use crate::mask::{
    occurrence_frequency, permanent_water_mask, regional_mask, synthesize_scene_masks, MaskError,
    SceneMask,
};
use crate::thresholds::{
    HistogramReducer, PixelHistogramReducer, RegionCatalog, RegionFailure, RegionThresholds,
    ThresholdError, WardThresholdCalculator, WardThresholdParams,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors that abort a pipeline run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("no scenes to process")]
    NoScenes,
    #[error("no scene falls inside the composite window")]
    EmptyCompositeWindow,
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// Acquisition-time window selecting the scenes averaged into the composite.
///
/// Bounds are milliseconds since epoch, `start_ms` inclusive and `end_ms`
/// exclusive. Scenes without a timestamp never match a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeWindow {
    #[serde(default)]
    pub start_ms: Option<i64>,
    #[serde(default)]
    pub end_ms: Option<i64>,
}

impl CompositeWindow {
    pub fn contains(&self, acquired_ms: Option<i64>) -> bool {
        let Some(t) = acquired_ms else {
            return false;
        };
        self.start_ms.is_none_or(|s| t >= s) && self.end_ms.is_none_or(|e| t < e)
    }
}

/// Parameters of a [`PermanentWaterPipeline`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    #[serde(default)]
    pub thresholds: WardThresholdParams,
    /// Scenes averaged into the composite; all scenes when unset.
    #[serde(default)]
    pub composite: Option<CompositeWindow>,
    /// Frequency cutoff for the permanent-water mask; no mask when unset.
    #[serde(default)]
    pub cutoff: Option<f32>,
}

/// Everything a pipeline run produces.
#[derive(Clone, Debug)]
pub struct PermanentWaterResult {
    pub composite: IntensityImage,
    pub thresholds: RegionThresholds,
    pub scene_masks: Vec<SceneMask>,
    pub frequency: FrequencySurface,
    pub permanent: Option<Mask>,
}

/// Composite, per-region thresholds, per-scene masks and their frequency.
pub struct PermanentWaterPipeline<R> {
    calculator: WardThresholdCalculator<R>,
    composite: Option<CompositeWindow>,
    cutoff: Option<f32>,
}

impl PermanentWaterPipeline<PixelHistogramReducer> {
    /// Pipeline reducing histograms in process from the composite pixels.
    pub fn with_pixel_reducer(params: PipelineParams) -> Self {
        Self::new(PixelHistogramReducer, params)
    }
}

impl<R: HistogramReducer> PermanentWaterPipeline<R> {
    pub fn new(reducer: R, params: PipelineParams) -> Self {
        Self {
            calculator: WardThresholdCalculator::new(reducer, params.thresholds),
            composite: params.composite,
            cutoff: params.cutoff,
        }
    }

    #[inline]
    pub fn calculator(&self) -> &WardThresholdCalculator<R> {
        &self.calculator
    }

    /// Mean of the scenes selected by the composite window.
    pub fn composite(&self, scenes: &[Scene]) -> Result<IntensityImage, PipelineError> {
        if scenes.is_empty() {
            return Err(PipelineError::NoScenes);
        }
        let images: Vec<IntensityImage> = match self.composite {
            Some(window) => scenes
                .iter()
                .filter(|s| window.contains(s.acquired_ms))
                .map(|s| s.image.clone())
                .collect(),
            None => scenes.iter().map(|s| s.image.clone()).collect(),
        };
        if images.is_empty() {
            return Err(PipelineError::EmptyCompositeWindow);
        }
        info!(
            "composite from {} of {} scene(s)",
            images.len(),
            scenes.len()
        );
        Ok(mean_composite(&images)?)
    }

    /// Run every stage over `scenes` and `catalog`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(scenes = scenes.len(), regions = catalog.len()))
    )]
    pub fn run(
        &self,
        scenes: &[Scene],
        catalog: &RegionCatalog,
    ) -> Result<PermanentWaterResult, PipelineError> {
        let composite = self.composite(scenes)?;
        let thresholds = self.calculator.compute(&composite.view(), catalog)?;
        let scene_masks = synthesize_scene_masks(scenes, &thresholds.thresholds, catalog)?;
        let frequency = occurrence_frequency(scene_masks.iter().map(|s| &s.mask))?;
        let permanent = self
            .cutoff
            .map(|c| permanent_water_mask(&frequency, c))
            .transpose()?;
        if let Some(p) = &permanent {
            info!(
                "permanent water: {:.2}% of pixels",
                100.0 * p.water_fraction()
            );
        }

        Ok(PermanentWaterResult {
            composite,
            thresholds,
            scene_masks,
            frequency,
            permanent,
        })
    }
}

/// Threshold `image` over one `footprint` and mask it, without fallback.
///
/// Returns the mask over the full image extent together with the threshold.
pub fn detect_water_single<R: HistogramReducer>(
    image: &IntensityView<'_>,
    footprint: &Footprint,
    reducer: &R,
    params: &WardThresholdParams,
) -> Result<(Mask, f64), RegionFailure> {
    let raw = reducer.reduce(image, footprint, &params.histogram)?;
    let solution = crate::thresholds::solve_raw_histogram(&raw, &params.otsu)?;
    let region = Region::new(RegionId::Num(0), footprint.clone());
    Ok((
        regional_mask(image, &region, solution.threshold),
        solution.threshold,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_wards() -> RegionCatalog {
        RegionCatalog::new(vec![
            Region::new(1, Footprint::rect(0, 0, 4, 4)),
            Region::new(2, Footprint::rect(4, 0, 8, 4)),
        ])
        .expect("catalog")
    }

    fn scene(t: i64, water_cols: usize) -> Scene {
        let img = IntensityImage::from_fn(8, 4, |x, _| if x < water_cols { -22.0 } else { -8.0 });
        Scene::new(Some(t), img)
    }

    #[test]
    fn window_bounds_are_half_open() {
        let w = CompositeWindow {
            start_ms: Some(10),
            end_ms: Some(20),
        };
        assert!(w.contains(Some(10)));
        assert!(!w.contains(Some(20)));
        assert!(!w.contains(None));
        assert!(CompositeWindow::default().contains(Some(i64::MIN)));
    }

    #[test]
    fn empty_inputs_are_fatal() {
        let pipeline = PermanentWaterPipeline::with_pixel_reducer(PipelineParams::default());
        assert!(matches!(
            pipeline.run(&[], &two_wards()),
            Err(PipelineError::NoScenes)
        ));
        let empty = RegionCatalog::new(Vec::new()).expect("empty catalog");
        assert!(matches!(
            pipeline.run(&[scene(0, 2)], &empty),
            Err(PipelineError::Threshold(ThresholdError::NoRegions))
        ));
    }

    #[test]
    fn window_without_scenes_is_fatal() {
        let params = PipelineParams {
            composite: Some(CompositeWindow {
                start_ms: Some(100),
                end_ms: None,
            }),
            ..PipelineParams::default()
        };
        let pipeline = PermanentWaterPipeline::with_pixel_reducer(params);
        assert!(matches!(
            pipeline.composite(&[scene(0, 2)]),
            Err(PipelineError::EmptyCompositeWindow)
        ));
    }

    #[test]
    fn single_detection_masks_dark_pixels() {
        let img = IntensityImage::from_fn(6, 2, |x, _| if x < 3 { -20.0 } else { -10.0 });
        let (mask, threshold) = detect_water_single(
            &img.view(),
            &Footprint::rect(0, 0, 6, 2),
            &PixelHistogramReducer,
            &WardThresholdParams::default(),
        )
        .expect("bimodal footprint");
        assert!(threshold > -20.0 && threshold <= -10.0);
        assert_eq!(mask.data, vec![1, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn single_detection_reports_failure() {
        let img = IntensityImage::filled(4, 4, f32::NAN);
        let err = detect_water_single(
            &img.view(),
            &Footprint::rect(0, 0, 4, 4),
            &PixelHistogramReducer,
            &WardThresholdParams::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "no_valid_pixels");
    }
}
