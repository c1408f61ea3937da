//! Pipeline configuration
//!
//! Every tunable of a run lives here: compositing limits, the baseline
//! lookback, the loss-mask thresholds, area coarsening, render sizing and
//! the decision policy. Sections default individually; the policy does not
//! and must be named by the config file or a command-line override.

use std::path::Path;

use serde::{Deserialize, Serialize};
use verdant_algorithms::decision::{DecisionPolicy, PolicyKind};
use verdant_algorithms::imagery::{CompositeParams, LossMaskParams, SpectralIndex};
use verdant_algorithms::statistics::{AreaParams, BaselineParams};
use verdant_colormap::{ColorScheme, ColormapParams, RgbStretch};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Months either side of the requested date
    pub offset_months: u32,
    /// Scenes at or above this cloud percentage are not composited
    pub max_cloud_cover: f64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        let params = CompositeParams::default();
        Self {
            offset_months: params.offset_months,
            max_cloud_cover: params.max_cloud_cover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub lookback_years: u32,
    pub index: SpectralIndex,
    pub min_samples: usize,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        let params = BaselineParams::default();
        Self {
            lookback_years: params.lookback_years,
            index: params.index,
            min_samples: params.min_samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeConfig {
    /// Index drop below which a pixel is a loss candidate
    pub loss_threshold: f64,
    /// Z-score below which a pixel is anomalous
    pub z_score_threshold: f64,
    /// Index whose difference drives the loss mask
    pub index: SpectralIndex,
}

impl Default for ChangeConfig {
    fn default() -> Self {
        let params = LossMaskParams::default();
        Self {
            loss_threshold: params.drop_threshold,
            z_score_threshold: params.z_threshold,
            index: params.index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub coarsening: usize,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            coarsening: AreaParams::default().coarsening,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Renders are resized so their longest side is this many pixels
    pub longest_side: usize,
    pub rgb_min: f64,
    pub rgb_max: f64,
    pub gamma: f64,
    /// Symmetric range of the index-change ramp
    pub delta_range: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let stretch = RgbStretch::default();
        Self {
            longest_side: 512,
            rgb_min: stretch.min,
            rgb_max: stretch.max,
            gamma: stretch.gamma,
            delta_range: 0.5,
        }
    }
}

impl RenderConfig {
    pub fn stretch(&self) -> RgbStretch {
        RgbStretch {
            min: self.rgb_min,
            max: self.rgb_max,
            gamma: self.gamma,
        }
    }

    pub fn delta_colormap(&self) -> ColormapParams {
        ColormapParams::with_range(ColorScheme::RedWhiteGreen, -self.delta_range, self.delta_range)
    }
}

/// Complete configuration of an [`AnalysisPipeline`](crate::AnalysisPipeline).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub composite: CompositeConfig,
    pub baseline: BaselineConfig,
    pub change: ChangeConfig,
    pub area: AreaConfig,
    pub render: RenderConfig,
    /// No default: which decision policy is in force is a deployment choice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<DecisionPolicy>,
}

/// Command-line overrides, applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub policy: Option<PolicyKind>,
    pub offset_months: Option<u32>,
    pub max_cloud_cover: Option<f64>,
    pub lookback_years: Option<u32>,
    pub loss_threshold: Option<f64>,
    pub z_score_threshold: Option<f64>,
    pub coarsening: Option<usize>,
}

impl PipelineConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides. Naming the policy already configured keeps its
    /// tuned parameters; naming another one starts from that policy's defaults.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(kind) = overrides.policy {
            if self.policy.map(|p| p.kind()) != Some(kind) {
                self.policy = Some(DecisionPolicy::with_defaults(kind));
            }
        }
        if let Some(v) = overrides.offset_months {
            self.composite.offset_months = v;
        }
        if let Some(v) = overrides.max_cloud_cover {
            self.composite.max_cloud_cover = v;
        }
        if let Some(v) = overrides.lookback_years {
            self.baseline.lookback_years = v;
        }
        if let Some(v) = overrides.loss_threshold {
            self.change.loss_threshold = v;
        }
        if let Some(v) = overrides.z_score_threshold {
            self.change.z_score_threshold = v;
        }
        if let Some(v) = overrides.coarsening {
            self.area.coarsening = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.is_none() {
            return Err(ConfigError::Invalid {
                field: "policy",
                message: "no decision policy configured; choose 'weighted' or 'hard_rule'".into(),
            });
        }
        if self.composite.offset_months == 0 {
            return Err(ConfigError::Invalid {
                field: "composite.offset_months",
                message: "must be at least 1".into(),
            });
        }
        if !(self.composite.max_cloud_cover > 0.0 && self.composite.max_cloud_cover <= 100.0) {
            return Err(ConfigError::Invalid {
                field: "composite.max_cloud_cover",
                message: "must be in (0, 100]".into(),
            });
        }
        if self.baseline.lookback_years == 0 {
            return Err(ConfigError::Invalid {
                field: "baseline.lookback_years",
                message: "must be at least 1".into(),
            });
        }
        if self.baseline.min_samples < 2 {
            return Err(ConfigError::Invalid {
                field: "baseline.min_samples",
                message: "must be at least 2".into(),
            });
        }
        if !self.change.loss_threshold.is_finite() || !self.change.z_score_threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "change",
                message: "thresholds must be finite".into(),
            });
        }
        if self.area.coarsening == 0 {
            return Err(ConfigError::Invalid {
                field: "area.coarsening",
                message: "must be at least 1".into(),
            });
        }
        if self.render.longest_side == 0 {
            return Err(ConfigError::Invalid {
                field: "render.longest_side",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn composite_params(&self) -> CompositeParams {
        CompositeParams {
            offset_months: self.composite.offset_months,
            max_cloud_cover: self.composite.max_cloud_cover,
            ..CompositeParams::default()
        }
    }

    pub fn baseline_params(&self) -> BaselineParams {
        BaselineParams {
            lookback_years: self.baseline.lookback_years,
            index: self.baseline.index,
            min_samples: self.baseline.min_samples,
        }
    }

    pub fn loss_mask_params(&self) -> LossMaskParams {
        LossMaskParams {
            drop_threshold: self.change.loss_threshold,
            z_threshold: self.change.z_score_threshold,
            index: self.change.index,
        }
    }

    pub fn area_params(&self) -> AreaParams {
        AreaParams {
            coarsening: self.area.coarsening,
        }
    }
}
