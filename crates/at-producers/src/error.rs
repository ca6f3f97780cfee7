//! Producer errors.

use at_root::RootError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring or running producers.
#[derive(Error, Debug)]
pub enum ProducerError {
    /// A weight file could not be opened.
    #[error("could not open weight file '{}': {source}", path.display())]
    MissingWeightFile {
        /// Configured path.
        path: PathBuf,
        /// Underlying reader error.
        #[source]
        source: RootError,
    },

    /// A histogram is absent from an opened weight file.
    #[error("could not find histogram '{name}' in '{}': {source}", path.display())]
    MissingHistogram {
        /// Weight file.
        path: PathBuf,
        /// Histogram path inside the file.
        name: String,
        /// Underlying reader error.
        #[source]
        source: RootError,
    },

    /// Histograms that must be combined have incompatible contents.
    #[error("incompatible histograms: {0}")]
    IncompatibleHistograms(String),

    /// Configuration file is unreadable or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Per-event error from the core crate.
    #[error(transparent)]
    Core(#[from] at_core::Error),
}

impl ProducerError {
    /// Configuration errors abort the run; per-event errors skip one producer
    /// for one event.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Core(_))
    }
}

/// Result alias for producer operations.
pub type Result<T> = std::result::Result<T, ProducerError>;
