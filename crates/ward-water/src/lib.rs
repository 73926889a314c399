//! High-level facade crate for the `ward-water-*` workspace.
//!
//! Finds surface water in SAR backscatter with one Otsu threshold per ward
//! (administrative region), then turns a time series of water masks into a
//! water-occurrence frequency surface.
//!
//! This crate provides:
//! - re-exports of the underlying crates,
//! - [`PermanentWaterPipeline`]: composite, per-ward thresholds, per-scene
//!   masks and frequency in one call,
//! - JSON configs, rasters and reports ([`io`]),
//! - (feature `image`) PNG export of masks and frequency surfaces.
//!
//! ## Quickstart
//!
//! ```no_run
//! use ward_water::core::{Footprint, IntensityImage, Region, Scene};
//! use ward_water::thresholds::RegionCatalog;
//! use ward_water::{PermanentWaterPipeline, PipelineParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scenes = vec![Scene::new(None, IntensityImage::filled(64, 64, -12.0))];
//! let wards = RegionCatalog::new(vec![
//!     Region::new(1, Footprint::rect(0, 0, 32, 64)),
//!     Region::new(2, Footprint::rect(32, 0, 64, 64)),
//! ])?;
//!
//! let pipeline = PermanentWaterPipeline::with_pixel_reducer(PipelineParams::default());
//! let result = pipeline.run(&scenes, &wards)?;
//! println!("fallback wards: {}", result.thresholds.fallback_regions().count());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ward_water::core`: rasters, histograms, regions and the Otsu solver.
//! - `ward_water::thresholds`: histogram reducers and per-region thresholds.
//! - `ward_water::mask`: mask synthesis and occurrence frequency.
//! - `ward_water::export` (feature `image`): grayscale PNG writers.

pub use ward_water_core as core;
pub use ward_water_mask as mask;
pub use ward_water_thresholds as thresholds;

pub use ward_water_core::{otsu_threshold, Histogram, OtsuParams, RegionId, TieBreak};
pub use ward_water_thresholds::{ThresholdMap, WardThresholdParams};

pub mod io;
mod pipeline;

pub use pipeline::{
    detect_water_single, CompositeWindow, PermanentWaterPipeline, PermanentWaterResult,
    PipelineError, PipelineParams,
};

#[cfg(feature = "image")]
pub mod export;
