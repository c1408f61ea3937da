//! Error types for Verdant

use thiserror::Error;

use crate::geometry::{BoundingBox, DateWindow};

/// Main error type for Verdant operations.
///
/// Per-pixel undefined arithmetic is never an error: it is carried as
/// [`Sample::NoData`](crate::Sample::NoData) and skipped by region reductions.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed geometry or dates, rejected before any provider call
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Zero admissible granules (or only fully masked ones) for a window
    #[error("no admissible imagery for window {window} over {geometry}")]
    NoDataAvailable {
        window: DateWindow,
        geometry: BoundingBox,
    },

    #[error("granule '{granule}' has no quality band")]
    MissingQualityBand { granule: String },

    #[error("malformed granule '{granule}': {reason}")]
    MalformedGranule { granule: String, reason: String },

    /// Infrastructural provider failure (auth, quota, transport)
    #[error("compute backend error: {0}")]
    ComputeBackend(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller should answer with a not-found class response.
    ///
    /// Only [`Error::NoDataAvailable`] qualifies; everything else is either a
    /// client error caught before any work started or a server-side failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoDataAvailable { .. })
    }

    /// Whether this is a rejected request rather than a processing failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InputValidation(_) | Error::InvalidParameter { .. }
        )
    }

    /// Data-quality failures coming from the granules themselves.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            Error::MissingQualityBand { .. } | Error::MalformedGranule { .. }
        )
    }
}

/// Result type alias for Verdant operations
pub type Result<T> = std::result::Result<T, Error>;
