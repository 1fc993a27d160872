//! Error types for I/O operations.

use lapse_core::CoreError;
use thiserror::Error;

/// Result type alias using [`IoError`].
pub type IoResult<T> = std::result::Result<T, IoError>;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JPEG decoding failure, bubbled up from the codec.
    #[error("decode error: {0}")]
    Decode(String),

    /// JPEG encoding failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed file structure (bad segment, bad EXIF/ICC layout).
    #[error("format error: {0}")]
    Format(String),

    /// Metadata errors, notably append with mismatched id strings.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An EXIF field needed for exposure math is absent.
    #[error("missing EXIF field: {0}")]
    MissingExifField(&'static str),

    /// A first/last file pair does not describe one sequence.
    #[error("non-matching pair of file names ({first}, {last})")]
    SequenceMismatch {
        /// First name of the pair.
        first: String,
        /// Last name of the pair.
        last: String,
    },

    /// The numeric range of a pair runs backwards.
    #[error("file numbers need to be increasing ({first}, {last})")]
    DecreasingRange {
        /// First name of the pair.
        first: String,
        /// Last name of the pair.
        last: String,
    },

    /// The output template's stem has no trailing run of `X` characters.
    #[error("output file name specification invalid: {0}")]
    InvalidOutputTemplate(String),

    /// An empty file name was supplied.
    #[error("empty file name")]
    EmptyFileName,
}
