//! Error types for effects.

use thiserror::Error;

/// Result type alias using [`EffectError`].
pub type EffectResult<T> = std::result::Result<T, EffectError>;

/// Errors raised while applying effects.
#[derive(Debug, Error)]
pub enum EffectError {
    /// An effect name has no entry in the registry.
    #[error("effect '{0}' not found")]
    UnknownEffect(String),

    /// A required property is absent from the property map.
    #[error("effect property '{0}' missing")]
    MissingProperty(&'static str),

    /// The image does not have the channel layout the effect requires.
    #[error("effect requires {expected} channels, image has {got}")]
    ChannelMismatch {
        /// Channels the effect needs.
        expected: usize,
        /// Channels the image has.
        got: usize,
    },

    /// Color-engine failure (profile or transform).
    #[error(transparent)]
    Icc(#[from] lapse_icc::IccError),

    /// Resampling failure.
    #[error(transparent)]
    Resample(#[from] lapse_resample::ResampleError),

    /// EXIF lookup failure (for example a missing exposure field).
    #[error(transparent)]
    Io(#[from] lapse_io::IoError),

    /// Core image failure.
    #[error(transparent)]
    Core(#[from] lapse_core::CoreError),
}
