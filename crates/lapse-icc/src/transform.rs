//! Color transforms between ICC profiles.

use lcms2::Transform as LcmsTransform;

use crate::{IccError, IccResult, Intent, PixelLayout, Profile};

/// A color transform between two (profile, layout) pairs.
///
/// The type parameters `I` and `O` are the per-pixel element groups the
/// transform reads and writes, for example `[u8; 3]` for 8-bit RGB or
/// `[f32; 3]` for float XYZ. They must match the byte width of the layouts
/// given at construction; the engine verifies this.
///
/// Transforms are pure: applying one never mutates profile state, and the
/// same transform may be applied to any number of buffers.
///
/// # Example
///
/// ```rust
/// use lapse_core::Element;
/// use lapse_icc::{Intent, PixelLayout, Profile, Transform};
///
/// let srgb = Profile::srgb();
/// let rgb8 = PixelLayout::new(Element::U8, "rgb").unwrap();
/// let t: Transform<[u8; 3], [u8; 3]> =
///     Transform::new(&srgb, rgb8, &srgb, rgb8, Intent::Perceptual).unwrap();
///
/// let mut px = [[10u8, 20, 30]];
/// t.apply_in_place(&mut px);
/// ```
pub struct Transform<I: Copy + Clone + lcms2::Pod, O: Copy + Clone + lcms2::Pod> {
    pub(crate) inner: LcmsTransform<I, O>,
}

impl<I: Copy + Clone + lcms2::Pod, O: Copy + Clone + lcms2::Pod> Transform<I, O> {
    /// Creates a transform between two profiles with the given layouts.
    ///
    /// `optimize` trades construction time for per-pixel speed; disable it
    /// when only a handful of pixels will be transformed.
    ///
    /// # Errors
    ///
    /// Returns [`IccError::TransformFailed`] when the engine rejects the
    /// combination (mismatched layout widths, incompatible profiles).
    pub fn with_flags(
        src_profile: &Profile,
        src_layout: PixelLayout,
        dst_profile: &Profile,
        dst_layout: PixelLayout,
        intent: Intent,
        optimize: bool,
    ) -> IccResult<Self> {
        let inner = if optimize {
            LcmsTransform::new(
                &src_profile.inner,
                src_layout.format(),
                &dst_profile.inner,
                dst_layout.format(),
                intent.into(),
            )
        } else {
            LcmsTransform::new_flags(
                &src_profile.inner,
                src_layout.format(),
                &dst_profile.inner,
                dst_layout.format(),
                intent.into(),
                lcms2::Flags::NO_OPTIMIZE,
            )
        }
        .map_err(|e| IccError::TransformFailed(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Creates an optimized transform. See [`Transform::with_flags`].
    pub fn new(
        src_profile: &Profile,
        src_layout: PixelLayout,
        dst_profile: &Profile,
        dst_layout: PixelLayout,
        intent: Intent,
    ) -> IccResult<Self> {
        Self::with_flags(src_profile, src_layout, dst_profile, dst_layout, intent, true)
    }

    /// Creates a transform from a device-link profile.
    ///
    /// A device link is a single profile encapsulating a composed multi-stage
    /// transform; it needs no separate destination profile.
    pub fn from_device_link(
        profile: &Profile,
        src_layout: PixelLayout,
        dst_layout: PixelLayout,
        intent: Intent,
        optimize: bool,
    ) -> IccResult<Self> {
        let flags = if optimize {
            lcms2::Flags::default()
        } else {
            lcms2::Flags::NO_OPTIMIZE
        };
        let inner = LcmsTransform::new_multiprofile(
            &[&profile.inner],
            src_layout.format(),
            dst_layout.format(),
            intent.into(),
            flags,
        )
        .map_err(|e| IccError::TransformFailed(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Creates a soft-proofing transform.
    ///
    /// Maps source to destination such that the output imitates the look of
    /// the `proofing` device.
    pub fn proofing(
        src_profile: &Profile,
        src_layout: PixelLayout,
        dst_profile: &Profile,
        dst_layout: PixelLayout,
        proofing: &Profile,
        intent: Intent,
        proofing_intent: Intent,
    ) -> IccResult<Self> {
        let inner = LcmsTransform::new_proofing(
            &src_profile.inner,
            src_layout.format(),
            &dst_profile.inner,
            dst_layout.format(),
            &proofing.inner,
            intent.into(),
            proofing_intent.into(),
            lcms2::Flags::SOFT_PROOFING,
        )
        .map_err(|e| IccError::TransformFailed(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Transforms `src` into `dst`. Both slices must hold the same number of
    /// pixels, supplied as flat contiguous buffers.
    pub fn apply(&self, src: &[I], dst: &mut [O]) {
        assert_eq!(src.len(), dst.len(), "source and destination pixel counts differ");
        self.inner.transform_pixels(src, dst);
    }
}

impl<I: Copy + Clone + lcms2::Pod> Transform<I, I> {
    /// Transforms a buffer in place. Only available when the input and
    /// output element groups coincide.
    pub fn apply_in_place(&self, pixels: &mut [I]) {
        self.inner.transform_in_place(pixels);
    }
}

impl<I: Copy + Clone + lcms2::Pod, O: Copy + Clone + lcms2::Pod> std::fmt::Debug for Transform<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform").finish_non_exhaustive()
    }
}
