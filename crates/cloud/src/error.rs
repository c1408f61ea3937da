//! Error types for catalog search and render hosting.

use thiserror::Error;

/// Errors produced while talking to a STAC catalog or hosting renders.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid STAC response: {0}")]
    Parse(String),

    #[error("render host error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] verdant_core::Error),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;

impl From<CloudError> for verdant_core::Error {
    /// Core errors keep their tag; everything the catalog or transport
    /// produced is a backend failure.
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Core(inner) => inner,
            other => verdant_core::Error::ComputeBackend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_become_backend_errors() {
        let err: verdant_core::Error = CloudError::Network("connection reset".into()).into();
        assert!(matches!(err, verdant_core::Error::ComputeBackend(ref m) if m.contains("connection reset")));
    }

    #[test]
    fn core_errors_pass_through() {
        let err: verdant_core::Error = CloudError::Core(verdant_core::Error::MissingQualityBand {
            granule: "g".into(),
        })
        .into();
        assert!(matches!(err, verdant_core::Error::MissingQualityBand { .. }));
    }
}
