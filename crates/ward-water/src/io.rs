//! JSON configuration, rasters and reports for permanent-water runs.
//!
//! Intensity rasters on disk are `{ "width", "height", "data" }` objects with
//! row-major values; `null` marks no-data. Relative paths in a config resolve
//! against the config file's directory.

use crate::core::{FrequencySurface, IntensityImage, Region, RegionId, Scene};
use crate::pipeline::{CompositeWindow, PermanentWaterResult, PipelineParams};
use crate::thresholds::{
    CatalogError, RegionCatalog, ThresholdOutcome, ThresholdSummary, WardThresholdParams,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum WaterIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Raster {
        path: String,
        source: crate::core::RasterError,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Serialize, Deserialize)]
struct IntensityFile {
    width: usize,
    height: usize,
    data: Vec<Option<f32>>,
}

/// Read an intensity raster; `null` values become no-data.
pub fn load_intensity_json(path: impl AsRef<Path>) -> Result<IntensityImage, WaterIoError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let file: IntensityFile = serde_json::from_str(&raw)?;
    let data = file
        .data
        .into_iter()
        .map(|v| v.unwrap_or(f32::NAN))
        .collect();
    IntensityImage::new(file.width, file.height, data).map_err(|source| WaterIoError::Raster {
        path: path.display().to_string(),
        source,
    })
}

/// Write an intensity raster; no-data is written as `null`.
pub fn write_intensity_json(
    image: &IntensityImage,
    path: impl AsRef<Path>,
) -> Result<(), WaterIoError> {
    let file = IntensityFile {
        width: image.width,
        height: image.height,
        data: image
            .data
            .iter()
            .map(|&v| (!v.is_nan()).then_some(v))
            .collect(),
    };
    fs::write(path, serde_json::to_string(&file)?)?;
    Ok(())
}

/// Write a frequency surface as JSON.
pub fn write_frequency_json(
    frequency: &FrequencySurface,
    path: impl AsRef<Path>,
) -> Result<(), WaterIoError> {
    fs::write(path, serde_json::to_string(frequency)?)?;
    Ok(())
}

/// One input acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSource {
    pub path: String,
    #[serde(default)]
    pub acquired_ms: Option<i64>,
}

/// Configuration of a `ward-water run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterRunConfig {
    pub scenes: Vec<SceneSource>,
    pub regions: Vec<Region>,
    #[serde(default)]
    pub thresholds: WardThresholdParams,
    #[serde(default)]
    pub composite: Option<CompositeWindow>,
    #[serde(default)]
    pub cutoff: Option<f32>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub frequency_path: Option<String>,
    #[serde(default)]
    pub frequency_png_path: Option<String>,
    #[serde(default)]
    pub permanent_png_path: Option<String>,
}

impl WaterRunConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, WaterIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), WaterIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the report path.
    pub fn output_path(&self, base: &Path) -> PathBuf {
        resolve(
            base,
            self.output_path.as_deref().unwrap_or("water_run_report.json"),
        )
    }

    /// Resolve the frequency surface path.
    pub fn frequency_path(&self, base: &Path) -> PathBuf {
        resolve(
            base,
            self.frequency_path.as_deref().unwrap_or("water_frequency.json"),
        )
    }

    pub fn build_catalog(&self) -> Result<RegionCatalog, WaterIoError> {
        Ok(RegionCatalog::new(self.regions.clone())?)
    }

    pub fn build_params(&self) -> PipelineParams {
        PipelineParams {
            thresholds: self.thresholds.clone(),
            composite: self.composite,
            cutoff: self.cutoff,
        }
    }

    /// Read every scene raster, in config order.
    pub fn load_scenes(&self, base: &Path) -> Result<Vec<Scene>, WaterIoError> {
        self.scenes
            .iter()
            .map(|s| {
                let image = load_intensity_json(resolve(base, &s.path))?;
                Ok(Scene::new(s.acquired_ms, image))
            })
            .collect()
    }
}

/// `path` as given if absolute, else relative to `base`.
pub fn resolve(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionReport {
    pub id: RegionId,
    pub threshold: f64,
    pub outcome: ThresholdOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneReport {
    pub path: String,
    #[serde(default)]
    pub acquired_ms: Option<i64>,
    pub water_pixels: usize,
    pub water_fraction: f64,
}

/// Report of one run, written next to the frequency surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterRunReport {
    pub config_path: String,
    #[serde(default)]
    pub regions: Vec<RegionReport>,
    #[serde(default)]
    pub summary: Option<ThresholdSummary>,
    #[serde(default)]
    pub scenes: Vec<SceneReport>,
    #[serde(default)]
    pub frequency_path: Option<String>,
    #[serde(default)]
    pub permanent_water_fraction: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WaterRunReport {
    pub fn new(config_path: &Path) -> Self {
        Self {
            config_path: config_path.to_string_lossy().into_owned(),
            regions: Vec::new(),
            summary: None,
            scenes: Vec::new(),
            frequency_path: None,
            permanent_water_fraction: None,
            error: None,
        }
    }

    /// Populate report fields from a finished run.
    pub fn set_result(&mut self, cfg: &WaterRunConfig, res: &PermanentWaterResult) {
        self.regions = res
            .thresholds
            .outcomes
            .iter()
            .filter_map(|(id, outcome)| {
                let threshold = res.thresholds.thresholds.get(id)?;
                Some(RegionReport {
                    id: id.clone(),
                    threshold,
                    outcome: outcome.clone(),
                })
            })
            .collect();
        self.summary = res.thresholds.summary();
        self.scenes = cfg
            .scenes
            .iter()
            .zip(&res.scene_masks)
            .map(|(src, sm)| SceneReport {
                path: src.path.clone(),
                acquired_ms: sm.acquired_ms,
                water_pixels: sm.mask.water_count(),
                water_fraction: sm.mask.water_fraction(),
            })
            .collect();
        self.permanent_water_fraction = res.permanent.as_ref().map(|m| m.water_fraction());
        self.error = None;
    }

    /// Record a fatal error.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, WaterIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), WaterIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
