//! Padding effect.

use lapse_core::Image8;
use tracing::debug;

use crate::registry::{Effect, PropertyMap};
use crate::{EffectError, EffectResult};

/// Pads the image to a target size on a solid background.
///
/// Properties:
///
/// - `target_w`, `target_h` - output size (required)
/// - `bkg_r`, `bkg_g`, `bkg_b` - background color (default black)
///
/// The input lands centered in the output frame. When the input is larger
/// than the target in a dimension, it is cropped centrally in that
/// dimension. Only 3-channel RGB images are supported; the metadata is
/// shallow-copied onto the result.
pub struct PadEffect;

impl Effect for PadEffect {
    fn apply(&self, image: &mut Image8, props: &PropertyMap, verbosity: i32) -> EffectResult<()> {
        let target_w = *props
            .get("target_w")
            .ok_or(EffectError::MissingProperty("target_w"))? as usize;
        let target_h = *props
            .get("target_h")
            .ok_or(EffectError::MissingProperty("target_h"))? as usize;

        let bkg = [
            Image8::clamp_color(props.get("bkg_r").copied().unwrap_or(0.0)),
            Image8::clamp_color(props.get("bkg_g").copied().unwrap_or(0.0)),
            Image8::clamp_color(props.get("bkg_b").copied().unwrap_or(0.0)),
        ];

        if image.channels() != 3 {
            return Err(EffectError::ChannelMismatch {
                expected: 3,
                got: image.channels(),
            });
        }

        if verbosity >= 2 {
            debug!(target_w, target_h, ?bkg, "padding");
        }

        let mut result = Image8::new();
        result
            .reshape(target_w, target_h)
            .expect("fresh image is empty");
        result.set_channel_types(image.channel_types());
        result.allocate();
        result.copy_metadata_from(image);

        // center the input in the target frame; negative start means a
        // central crop in that dimension
        let start_x = (target_w as i64 - image.width() as i64) / 2;
        let start_y = (target_h as i64 - image.height() as i64) / 2;
        let end_x = (target_w as i64 + image.width() as i64) / 2;
        let end_y = (target_h as i64 + image.height() as i64) / 2;

        for j in 0..target_h as i64 {
            for i in 0..target_w as i64 {
                let px = result.sample_mut(i as usize, j as usize);
                if i < start_x || i >= end_x || j < start_y || j >= end_y {
                    px.copy_from_slice(&bkg);
                } else {
                    // in-range by construction of start/end
                    let src_x = (i - start_x) as usize;
                    let src_y = (j - start_y) as usize;
                    let src = image.sample(src_x, src_y);
                    px.copy_from_slice(src);
                }
            }
        }

        *image = result;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> Image8 {
        let mut img = Image8::new();
        img.reshape(width, height).unwrap();
        img.set_channel_types("rgb");
        img.allocate();
        for y in 0..height {
            for x in 0..width {
                let px = img.sample_mut(x, y);
                px[0] = (x % 256) as u8;
                px[1] = (y % 256) as u8;
                px[2] = 7;
            }
        }
        img
    }

    fn props(entries: &[(&str, f64)]) -> PropertyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_pad_smaller_input_centers() {
        let mut img = numbered(4, 4);
        let p = props(&[("target_w", 10.0), ("target_h", 8.0), ("bkg_r", 255.0)]);
        PadEffect.apply(&mut img, &p, 0).unwrap();
        assert_eq!((img.width(), img.height()), (10, 8));

        // corners are background
        assert_eq!(img.sample(0, 0), &[255, 0, 0]);
        assert_eq!(img.sample(9, 7), &[255, 0, 0]);
        // the input starts at (3, 2)
        assert_eq!(img.sample(3, 2), &[0, 0, 7]);
        assert_eq!(img.sample(6, 5), &[3, 3, 7]);
    }

    #[test]
    fn test_pad_to_wider_aspect_crops_vertically() {
        // 100x100 into 160x90: columns [30, 130) hold rows [5, 95) of the
        // input, everything else is background
        let mut img = numbered(100, 100);
        let p = props(&[("target_w", 160.0), ("target_h", 90.0), ("bkg_r", 255.0)]);
        PadEffect.apply(&mut img, &p, 0).unwrap();
        assert_eq!((img.width(), img.height()), (160, 90));

        // left of the image band: red background
        assert_eq!(img.sample(10, 45), &[255, 0, 0]);
        // inside the band: input pixel (x - 30, y + 5)
        assert_eq!(img.sample(30, 0), &[0, 5, 7]);
        assert_eq!(img.sample(129, 89), &[99, 94, 7]);
        // right of the band
        assert_eq!(img.sample(140, 45), &[255, 0, 0]);
    }

    #[test]
    fn test_pad_requires_rgb() {
        let mut img = Image8::new();
        img.reshape(4, 4).unwrap();
        img.set_channel_types("k");
        img.allocate();
        let p = props(&[("target_w", 8.0), ("target_h", 8.0)]);
        assert!(matches!(
            PadEffect.apply(&mut img, &p, 0),
            Err(EffectError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_pad_requires_target() {
        let mut img = numbered(4, 4);
        assert!(matches!(
            PadEffect.apply(&mut img, &PropertyMap::new(), 0),
            Err(EffectError::MissingProperty("target_w"))
        ));
    }

    #[test]
    fn test_metadata_carried_over() {
        use lapse_core::Metadatum;
        let mut img = numbered(4, 4);
        img.add_metadatum("comment", Metadatum::new(b"pad me".to_vec()));
        let p = props(&[("target_w", 6.0), ("target_h", 6.0)]);
        PadEffect.apply(&mut img, &p, 0).unwrap();
        assert!(img.has_metadatum("comment"));
    }
}
