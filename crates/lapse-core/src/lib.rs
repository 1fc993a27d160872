//! # lapse-core
//!
//! Core image containers for the lapse time-lapse pipeline.
//!
//! This crate provides the foundational types shared by every other crate in
//! the workspace:
//!
//! - [`PixelBuffer`] - Reference-counted pixel storage with stride-based views
//! - [`Image`] - A pixel buffer paired with metadata and channel-type tags
//! - [`MetadataMap`] - Copy-on-write map of named metadata blobs
//! - [`Channel`] - Trait for pixel element types (u8, u16, i16, f32, f64)
//!
//! # Design Philosophy
//!
//! Images behave like cheap references: copying is always shallow and shares
//! the backing pixel allocation. Geometric operations (crop, rotate, flip,
//! channel select) are O(1) stride manipulations that never touch pixel data.
//! Mutation goes through copy-on-write: writing to a shared image first clones
//! the pixels into a private, row-major buffer.
//!
//! # Memory Layout
//!
//! A buffer addresses element `(x, y, comp)` at
//! `base + x * stride_x + y * stride_y + comp`. Strides may be negative
//! (flipped), swapped (transposed), or wider than a row (cropped). A buffer is
//! *flat* when `stride_x == channels` and `stride_y == channels * width`.
//!
//! # Usage
//!
//! ```rust
//! use lapse_core::Image;
//!
//! let mut img: Image<u8> = Image::new();
//! img.reshape(640, 480).unwrap();
//! img.set_channel_types("rgb");
//! img.allocate();
//!
//! // O(1) geometric view changes
//! img.crop(10, 10, 100, 100);
//! img.coarse_rotate(1);
//! assert_eq!((img.width(), img.height()), (100, 100));
//! ```

#![warn(missing_docs)]

mod buffer;
mod channel;
mod error;
mod image;
mod metadata;

pub use buffer::{Axis, PixelBuffer};
pub use channel::{Channel, Element};
pub use error::{CoreError, CoreResult};
pub use image::{Image, Image8, Image32, Select};
pub use metadata::{MetadataMap, Metadatum};
