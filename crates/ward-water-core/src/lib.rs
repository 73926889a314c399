//! Core types for per-ward SAR water detection.
//!
//! This crate holds the value types shared by the rest of the workspace and
//! the one piece of real numerics: Otsu threshold selection over a bucketed
//! histogram. It knows nothing about where images or histograms come from.
//!
//! - [`Histogram`]: validated `(mean, count)` buckets built from a reducer's
//!   [`RawHistogram`],
//! - [`otsu_threshold`]: the between-class-variance solver,
//! - [`IntensityImage`], [`Mask`], [`FrequencySurface`]: row-major rasters,
//! - [`Region`], [`RegionId`], [`Footprint`]: what a ward is to the core.

mod histogram;
mod otsu;
mod raster;
mod region;

pub use histogram::{Histogram, HistogramBucket, HistogramError, RawHistogram};
pub use otsu::{
    between_class_variances, otsu_threshold, ClassStats, OtsuParams, OtsuSolution, TieBreak,
};
pub use raster::{
    ensure_same_extent, mean_composite, FrequencySurface, IntensityImage, IntensityView, Mask,
    RasterError, Scene,
};
pub use region::{Footprint, PixelWindow, Region, RegionId};
