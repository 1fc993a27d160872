//! Error types for color management.

use lapse_core::Element;
use thiserror::Error;

/// Result type alias using [`IccError`].
pub type IccResult<T> = std::result::Result<T, IccError>;

/// Errors from profile handling and transform construction.
#[derive(Debug, Error)]
pub enum IccError {
    /// A profile could not be loaded from a file.
    #[error("failed to load profile: {0}")]
    LoadFailed(String),

    /// Raw bytes did not contain a valid ICC profile.
    #[error("invalid ICC profile: {0}")]
    InvalidProfile(String),

    /// A profile could not be created or serialized.
    #[error("failed to create profile: {0}")]
    CreateFailed(String),

    /// A transform could not be constructed for the given profiles/formats.
    #[error("failed to create transform: {0}")]
    TransformFailed(String),

    /// The (element type, channel types) pair has no engine wire format.
    #[error("unsupported color format: {channels:?} with {element:?} elements")]
    UnsupportedColorFormat {
        /// Numeric element kind.
        element: Element,
        /// Channel-type string.
        channels: String,
    },
}
