//! Error types of the library

use thiserror::Error;

/// Result type alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by loading, configuration and camera setup.
///
/// Per-sample numeric cases (zero gradient, ray missing the volume) are never
/// errors, they have defined fallback values.
#[derive(Debug, Error)]
pub enum Error {
    /// Volume data is malformed or truncated
    #[error("malformed volume data: {0}")]
    DataFormat(String),

    /// Invalid transfer function, settings or preset
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Degenerate geometry, such as a zero extent bounding box
    #[error("degenerate geometry: {0}")]
    Geometry(String),

    /// Volume could not be fetched, partial data is discarded
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Operation not allowed in the current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub(crate) fn data_format(msg: impl Into<String>) -> Error {
        Error::DataFormat(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Error {
        Error::Configuration(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}
