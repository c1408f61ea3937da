//! Pipeline and configuration errors.

use thiserror::Error;
use verdant_core::Error;

use crate::state::{RunState, RunTrace};

/// A run that ended in [`RunState::Failed`].
///
/// `state` is where the run was when it failed; `trace` holds every
/// transition up to and including `Failed`.
#[derive(Error, Debug)]
#[error("analysis failed while {state}: {source}")]
pub struct PipelineError {
    pub state: RunState,
    pub source: Error,
    pub trace: RunTrace,
}

impl PipelineError {
    /// No admissible imagery for the requested dates. Callers answer with a
    /// not-found class response; everything else is a client or server error.
    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }

    /// The request itself was rejected: bad dates, label or region.
    pub fn is_input_error(&self) -> bool {
        self.source.is_input_error()
    }

    pub fn is_server_error(&self) -> bool {
        !self.is_not_found() && !self.is_input_error()
    }
}

/// Errors loading or validating a [`PipelineConfig`](crate::PipelineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("config field {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::InputValidation(err.to_string())
    }
}
