//! Error types for ROOT file access.

use thiserror::Error;

/// Errors raised while reading ROOT files or combining histograms.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error while opening or mapping the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `root` magic or is too short.
    #[error("not a ROOT file (bad magic or truncated header)")]
    BadMagic,

    /// A read ran past the end of the buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Offset of the failed read.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes available.
        have: usize,
    },

    /// A compressed block could not be inflated.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Streamed object bytes did not match the expected layout.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// No key with that name exists in the directory.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key exists but holds a class this reader does not decode.
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),

    /// An object path is empty or collides with an existing entry.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// Two histograms with incompatible binning were combined.
    #[error("histogram mismatch: {0}")]
    HistogramMismatch(String),
}

/// Result alias for ROOT operations.
pub type Result<T> = std::result::Result<T, RootError>;
