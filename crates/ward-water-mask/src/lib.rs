//! Water masks and occurrence frequency.
//!
//! [`synthesize_mask`] turns one intensity image plus per-region thresholds
//! into a binary water mask; [`occurrence_frequency`] averages a time series
//! of such masks into a frequency surface, the basis of a permanent-water
//! layer.

mod frequency;
mod synthesize;

pub use frequency::{occurrence_frequency, permanent_water_mask};
pub use synthesize::{
    regional_mask, synthesize_mask, synthesize_scene_masks, MaskError, SceneMask,
};
