//! # lapse-resample
//!
//! Image resampling for the lapse pipeline.
//!
//! Provides a family of separable convolution samplers driven by precomputed
//! look-up tables, and a resizer that applies them in one or two passes with
//! the work split across threads.
//!
//! # Samplers
//!
//! - [`ConvSampler::boxcar`] - box filter (nearest-pixel averaging)
//! - [`ConvSampler::linear`] - triangle filter
//! - [`ConvSampler::cubic`] - Mitchell-Netravali bicubic (default B = C = 1/3)
//! - [`ConvSampler::lanczos`] - windowed-sinc Lanczos-k (default k = 3)
//!
//! # Example
//!
//! ```rust
//! use lapse_core::Image;
//! use lapse_resample::{ConvSampler, Resizer};
//!
//! let mut img: Image<u8> = Image::new();
//! img.reshape(64, 64).unwrap();
//! img.set_channel_types("rgb");
//! img.allocate();
//!
//! let mut resizer = Resizer::new();
//! resizer.set_sampler(ConvSampler::lanczos(3.0, ConvSampler::DEFAULT_RESOLUTION));
//! let half = resizer.resize(&img, 32, 32, None).unwrap();
//! assert_eq!((half.width(), half.height()), (32, 32));
//! ```

#![warn(missing_docs)]

mod error;
mod lut;
mod resizer;
mod sampler;

pub use error::{ResampleError, ResampleResult};
pub use resizer::{Progress, Resizer};
pub use sampler::{ConvSampler, Direction};
