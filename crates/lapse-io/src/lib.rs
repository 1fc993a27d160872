//! # lapse-io
//!
//! JPEG input/output and frame-sequence handling for the lapse pipeline.
//!
//! # Overview
//!
//! - [`JpegIo`] - load/write/inspect JPEG files with full metadata
//!   round-trip (comment, chunked ICC profile, IPTC, EXIF, XMP, raw APPn)
//!   and EXIF-driven orientation normalization
//! - [`markers`] - byte-level JPEG segment scanning and splicing
//! - [`exif`] - the small slice of EXIF this pipeline needs: byte order,
//!   the orientation tag, and the exposure fields behind EV100
//! - [`sequence`] - numbered frame ranges and output-name templates
//!
//! # Example
//!
//! ```rust,no_run
//! use lapse_io::JpegIo;
//!
//! let io = JpegIo::new();
//! let image = io.load("frame0001.jpg").unwrap();
//! io.write("out0001.jpg", &image).unwrap();
//! ```

#![warn(missing_docs)]

mod error;
pub mod exif;
mod jpeg;
pub mod markers;
pub mod sequence;

pub use error::{IoError, IoResult};
pub use jpeg::{Header, JpegIo, Progress};
pub use sequence::{expand_pair, split_name, OutputTemplate, SequenceName};
