//! sRGB to CIE XYZ conversion helpers shared by the color effects.

use lapse_core::{Element, Image32, Image8};
use lapse_icc::{Intent, PixelLayout, Profile, Transform};

use crate::EffectResult;

/// Converts an 8-bit sRGB image into a fresh float32 XYZ image.
///
/// The source is flattened first; the transform engine works on contiguous
/// buffers.
pub(crate) fn image_to_xyz(image: &mut Image8) -> EffectResult<Image32> {
    if image.is_empty() {
        return Ok(Image32::new());
    }
    image.flatten();

    let srgb = Profile::srgb();
    let xyz_profile = Profile::xyz();

    let mut xyz = Image32::new();
    xyz.reshape(image.width(), image.height())
        .expect("fresh image is empty");
    xyz.set_channel_types("XYZ");
    xyz.allocate();

    let transform: Transform<[u8; 3], [f32; 3]> = Transform::new(
        &srgb,
        PixelLayout::of_image(image)?,
        &xyz_profile,
        PixelLayout::new(Element::F32, "XYZ")?,
        Intent::Perceptual,
    )?;

    transform.apply(
        lapse_icc::as_pixels(image.buffer().flat_data()),
        lapse_icc::as_pixels_mut(xyz.buffer_mut().flat_data_mut()),
    );
    Ok(xyz)
}

/// Converts a float32 XYZ image back into an existing 8-bit sRGB image.
pub(crate) fn xyz_to_image(xyz: &mut Image32, image: &mut Image8) -> EffectResult<()> {
    if xyz.is_empty() || image.is_empty() {
        return Ok(());
    }
    let srgb = Profile::srgb();
    let xyz_profile = Profile::xyz();

    let transform: Transform<[f32; 3], [u8; 3]> = Transform::new(
        &xyz_profile,
        PixelLayout::new(Element::F32, "XYZ")?,
        &srgb,
        PixelLayout::of_image(image)?,
        Intent::Perceptual,
    )?;

    transform.apply(
        lapse_icc::as_pixels(xyz.buffer().flat_data()),
        lapse_icc::as_pixels_mut(image.buffer_mut().flat_data_mut()),
    );
    Ok(())
}

/// Converts one sRGB triple to XYZ at double precision.
pub(crate) fn rgb8_to_xyz(rgb: [u8; 3]) -> EffectResult<[f64; 3]> {
    let srgb = Profile::srgb();
    let xyz = Profile::xyz();
    let transform: Transform<[u8; 3], [f64; 3]> = Transform::new(
        &srgb,
        PixelLayout::new(Element::U8, "rgb")?,
        &xyz,
        PixelLayout::new(Element::F64, "XYZ")?,
        Intent::Perceptual,
    )?;
    let mut out = [[0f64; 3]];
    transform.apply(&[rgb], &mut out);
    Ok(out[0])
}
