//! Apply per-region thresholds to an intensity image.
//!
//! Each region yields a full-extent mask of `value < threshold` restricted to
//! its footprint; the regional masks are folded together with logical OR, so
//! where footprints overlap, water wins. Pixels outside every footprint and
//! no-data pixels stay 0.

use log::debug;
use serde::{Deserialize, Serialize};
use ward_water_core::{IntensityView, Mask, RasterError, Region, RegionId, Scene};
use ward_water_thresholds::{RegionCatalog, ThresholdMap};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MaskError {
    #[error("no threshold for region {0}")]
    MissingThreshold(RegionId),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Mask of one scene, tagged with the scene's acquisition time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMask {
    pub acquired_ms: Option<i64>,
    pub mask: Mask,
}

/// Set `mask` to 1 where `value < threshold` inside `region`; other pixels
/// keep their value.
fn mark_water(mask: &mut Mask, image: &IntensityView<'_>, region: &Region, threshold: f64) {
    for (x, y) in region.footprint.pixels(image.width, image.height, 1) {
        if image.get(x, y).is_some_and(|v| f64::from(v) < threshold) {
            mask.data[y * image.width + x] = 1;
        }
    }
}

/// Full-extent mask of `value < threshold` inside `region` only.
pub fn regional_mask(image: &IntensityView<'_>, region: &Region, threshold: f64) -> Mask {
    let mut mask = Mask::empty(image.width, image.height);
    mark_water(&mut mask, image, region, threshold);
    mask
}

/// Union of the regional masks of every region in `catalog`.
///
/// Regions are OR-ed straight into one accumulator. Fails with
/// [`MaskError::MissingThreshold`] if a catalog region has no entry in
/// `thresholds`. Extra entries in `thresholds` are ignored.
pub fn synthesize_mask(
    image: &IntensityView<'_>,
    thresholds: &ThresholdMap,
    catalog: &RegionCatalog,
) -> Result<Mask, MaskError> {
    catalog
        .iter()
        .try_fold(Mask::empty(image.width, image.height), |mut acc, region| {
            let threshold = thresholds
                .get(&region.id)
                .ok_or_else(|| MaskError::MissingThreshold(region.id.clone()))?;
            mark_water(&mut acc, image, region, threshold);
            Ok(acc)
        })
}

/// Mask every scene with the same thresholds.
///
/// All scenes must share the extent of the first one.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip_all, fields(scenes = scenes.len()))
)]
pub fn synthesize_scene_masks(
    scenes: &[Scene],
    thresholds: &ThresholdMap,
    catalog: &RegionCatalog,
) -> Result<Vec<SceneMask>, MaskError> {
    let Some(first) = scenes.first() else {
        return Ok(Vec::new());
    };
    let extent = first.image.extent();

    scenes
        .iter()
        .map(|scene| -> Result<SceneMask, MaskError> {
            ward_water_core::ensure_same_extent(extent, scene.image.extent())?;
            let mask = synthesize_mask(&scene.image.view(), thresholds, catalog)?;
            debug!(
                "scene {:?}: {:.2}% water",
                scene.acquired_ms,
                100.0 * mask.water_fraction()
            );
            Ok(SceneMask {
                acquired_ms: scene.acquired_ms,
                mask,
            })
        })
        .collect()
}
