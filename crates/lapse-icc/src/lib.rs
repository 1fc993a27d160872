//! # lapse-icc
//!
//! ICC color management for the lapse pipeline, built on Little CMS 2.
//!
//! This crate wraps the parts of lcms2 the pipeline needs:
//!
//! - [`Profile`] - profiles from files, memory, built-ins, or device links
//! - [`Transform`] - typed pixel transforms between two (profile, layout)
//!   pairs, plus device-link and soft-proofing variants
//! - [`PixelLayout`] - the (element type, channel-type string) pair that
//!   selects the engine's wire format
//!
//! # Example
//!
//! ```rust
//! use lapse_icc::{Intent, PixelLayout, Profile, Transform};
//! use lapse_core::Element;
//!
//! let srgb = Profile::srgb();
//! let xyz = Profile::xyz();
//!
//! let to_xyz: Transform<[u8; 3], [f32; 3]> = Transform::new(
//!     &srgb,
//!     PixelLayout::new(Element::U8, "rgb").unwrap(),
//!     &xyz,
//!     PixelLayout::new(Element::F32, "XYZ").unwrap(),
//!     Intent::Perceptual,
//! )
//! .unwrap();
//!
//! let src = [[128u8, 128, 128]];
//! let mut dst = [[0f32; 3]];
//! to_xyz.apply(&src, &mut dst);
//! ```
//!
//! Transforms are pure: applying one never mutates profile state. Profiles
//! and transforms release their engine handles when dropped.

#![warn(missing_docs)]

mod error;
mod format;
mod profile;
mod transform;

pub use error::{IccError, IccResult};
pub use format::PixelLayout;
pub use profile::Profile;
pub use transform::Transform;

/// Reinterprets a flat channel buffer as `N`-channel pixel groups.
///
/// # Panics
///
/// Panics when the buffer length is not a multiple of `N`.
pub fn as_pixels<T, const N: usize>(flat: &[T]) -> &[[T; N]] {
    assert!(flat.len() % N == 0, "buffer length must be divisible by {N}");
    // [T; N] has the same layout as N contiguous Ts
    unsafe { std::slice::from_raw_parts(flat.as_ptr() as *const [T; N], flat.len() / N) }
}

/// Reinterprets a flat mutable channel buffer as `N`-channel pixel groups.
///
/// # Panics
///
/// Panics when the buffer length is not a multiple of `N`.
pub fn as_pixels_mut<T, const N: usize>(flat: &mut [T]) -> &mut [[T; N]] {
    assert!(flat.len() % N == 0, "buffer length must be divisible by {N}");
    unsafe { std::slice::from_raw_parts_mut(flat.as_mut_ptr() as *mut [T; N], flat.len() / N) }
}

/// Rendering intent for color transformations.
///
/// Determines how out-of-gamut colors are handled during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    /// Compresses the source gamut to fit the destination; best for
    /// photographic content.
    #[default]
    Perceptual,
    /// Preserves in-gamut colors exactly, clipping the rest.
    RelativeColorimetric,
    /// Maintains saturation at the expense of accuracy.
    Saturation,
    /// Relative colorimetric without white-point adaptation.
    AbsoluteColorimetric,
}

impl From<Intent> for lcms2::Intent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Perceptual => lcms2::Intent::Perceptual,
            Intent::RelativeColorimetric => lcms2::Intent::RelativeColorimetric,
            Intent::Saturation => lcms2::Intent::Saturation,
            Intent::AbsoluteColorimetric => lcms2::Intent::AbsoluteColorimetric,
        }
    }
}
