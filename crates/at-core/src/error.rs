//! Error types for AnaTools core

use thiserror::Error;

/// AnaTools core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Neither a data member nor an accessor of that name exists on the type
    /// or any of its bases.
    #[error("no member '{member}' on '{type_name}' or its bases")]
    UnresolvedMember {
        /// Type the lookup started from.
        type_name: String,
        /// Requested member.
        member: String,
    },

    /// The object handed to the accessor is not an instance of the named type.
    #[error("object is not a '{type_name}'")]
    ObjectTypeMismatch {
        /// Type the caller claimed.
        type_name: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
