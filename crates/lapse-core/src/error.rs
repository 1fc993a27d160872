//! Error types for core image operations.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in buffer and metadata operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `reshape` was called on a buffer that already holds pixel data.
    #[error("reshape on non-empty buffer ({width}x{height})")]
    NotEmpty {
        /// Current buffer width.
        width: usize,
        /// Current buffer height.
        height: usize,
    },

    /// `append` was given a metadatum whose id string differs from the one
    /// already stored under the same tag.
    #[error("metadata id mismatch for tag '{tag}': have '{existing}', got '{incoming}'")]
    MetadataIdMismatch {
        /// Metadata tag being appended to.
        tag: String,
        /// Id string already stored.
        existing: String,
        /// Id string of the incoming datum.
        incoming: String,
    },

    /// A metadata tag was requested but is not present.
    #[error("metadata tag '{0}' not found")]
    MetadataNotFound(String),
}
