//! Error types for resampling.

use thiserror::Error;

/// Result type alias using [`ResampleError`].
pub type ResampleResult<T> = std::result::Result<T, ResampleError>;

/// Errors from the resizer.
#[derive(Debug, Error)]
pub enum ResampleError {
    /// `resize` was called before a sampler was installed.
    #[error("resize without a sampler set")]
    SamplerNotSet,

    /// The requested output size has a zero dimension.
    #[error("invalid target size {width}x{height}")]
    InvalidTarget {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
}
