//! # Verdant Pipeline
//!
//! Orchestrates one vegetation-loss analysis from request to decision.
//!
//! A run validates the [`AnalysisRequest`], fetches the before, after and
//! historical composites concurrently from a shared
//! [`RasterSource`](verdant_core::RasterSource), computes the five spectral
//! indices and their differences, estimates the historical baseline, scores
//! the anomaly and loss area, builds the [`MetricsRecord`](verdant_core::MetricsRecord)
//! and hands it to the configured decision policy. The three presentation
//! renders are requested last.
//!
//! Every run walks the [`RunState`] machine and returns its [`RunTrace`]
//! whether it completes or fails.
//!
//! ```ignore
//! let source = Arc::new(InMemoryRasterSource::from_archive(&archive)?);
//! let pipeline = AnalysisPipeline::new(source, PipelineConfig::load(path)?)?;
//! let outcome = pipeline.run(&request).await?;
//! println!("{}", outcome.decision.loss_detected);
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod state;

pub use config::{
    AreaConfig, BaselineConfig, ChangeConfig, CompositeConfig, ConfigOverrides, PipelineConfig,
    RenderConfig,
};
pub use error::{ConfigError, PipelineError};
pub use memory::{ArchivedGranule, InMemoryRasterSource, RecordedRender, SceneArchive};
pub use pipeline::{AnalysisOutcome, AnalysisPipeline};
pub use render::RenderSet;
pub use request::AnalysisRequest;
pub use state::{RunState, RunTrace, Transition};
