//! Crop and resize effect.

use lapse_core::Image8;
use lapse_resample::{ConvSampler, Resizer};
use tracing::debug;

use crate::registry::{Effect, PropertyMap};
use crate::EffectResult;

/// Crops a region out of the image and/or resizes it.
///
/// Properties:
///
/// - `x0`, `y0` - top-left corner of the crop region (default 0, 0)
/// - `x1`, `y1` - bottom-right corner, exclusive (default image extent)
/// - `cwidth`, `cheight` - crop size, overriding `x1`/`y1`
/// - `twidth`, `theight` - target size (default: the crop extent)
///
/// The crop is a pure stride manipulation. A following resize picks
/// Lanczos when the area shrinks and the Mitchell-Netravali cubic when it
/// grows. Fractional property values round to the nearest pixel.
pub struct CropResizeEffect;

impl Effect for CropResizeEffect {
    fn apply(&self, image: &mut Image8, props: &PropertyMap, verbosity: i32) -> EffectResult<()> {
        // default crop region: the whole image
        let mut p1 = (0usize, 0usize);
        let mut p2 = (image.width(), image.height());

        // adding 0.5 rounds to the nearest integer
        if let Some(&v) = props.get("x0") {
            p1.0 = (v + 0.5) as usize;
        }
        if let Some(&v) = props.get("y0") {
            p1.1 = (v + 0.5) as usize;
        }
        if let Some(&v) = props.get("x1") {
            p2.0 = (v + 0.5) as usize;
        }
        if let Some(&v) = props.get("y1") {
            p2.1 = (v + 0.5) as usize;
        }
        // the rounding of p1 carries into p2 here, keeping the size exact
        if let Some(&v) = props.get("cwidth") {
            p2.0 = p1.0 + v as usize;
        }
        if let Some(&v) = props.get("cheight") {
            p2.1 = p1.1 + v as usize;
        }

        if p1 != (0, 0) || p2 != (image.width(), image.height()) {
            if verbosity >= 2 {
                debug!(x0 = p1.0, y0 = p1.1, x1 = p2.0, y1 = p2.1, "cropping");
            }
            image.crop(p1.0, p1.1, p2.0 - p1.0, p2.1 - p1.1);
        }

        // default target size: the crop extent
        let mut target = (p2.0 - p1.0, p2.1 - p1.1);
        if let Some(&v) = props.get("twidth") {
            target.0 = (v + 0.5) as usize;
        }
        if let Some(&v) = props.get("theight") {
            target.1 = (v + 0.5) as usize;
        }

        if target != (image.width(), image.height()) {
            if verbosity >= 2 {
                debug!(width = target.0, height = target.1, "resizing");
            }
            let factor_x = target.0 as f64 / image.width() as f64;
            let factor_y = target.1 as f64 / image.height() as f64;

            let mut resizer = Resizer::new();
            if factor_x * factor_y < 1.0 {
                resizer.set_sampler(ConvSampler::lanczos(3.0, ConvSampler::DEFAULT_RESOLUTION));
            } else {
                resizer.set_sampler(ConvSampler::cubic(
                    1.0 / 3.0,
                    1.0 / 3.0,
                    ConvSampler::DEFAULT_RESOLUTION,
                ));
            }
            *image = resizer.resize(image, target.0, target.1, None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Image8 {
        let mut img = Image8::new();
        img.reshape(width, height).unwrap();
        img.set_channel_types("rgb");
        img.allocate();
        for y in 0..height {
            for x in 0..width {
                let px = img.sample_mut(x, y);
                px[0] = (x % 256) as u8;
                px[1] = (y % 256) as u8;
                px[2] = 0;
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
    fn test_no_properties_is_identity() {
        let mut img = gradient(20, 20);
        CropResizeEffect.apply(&mut img, &PropertyMap::new(), 0).unwrap();
        assert_eq!((img.width(), img.height()), (20, 20));
        assert_eq!(img.sample(5, 7), gradient(20, 20).sample(5, 7));
    }

    #[test]
    fn test_pure_crop() {
        let mut img = gradient(20, 20);
        let p = props(&[("x0", 4.0), ("y0", 2.0), ("cwidth", 10.0), ("cheight", 12.0)]);
        CropResizeEffect.apply(&mut img, &p, 0).unwrap();
        assert_eq!((img.width(), img.height()), (10, 12));
        // pixel (0, 0) of the crop is (4, 2) of the original
        assert_eq!(img.sample(0, 0), &[4, 2, 0]);
    }

    #[test]
    fn test_crop_via_corners() {
        let mut img = gradient(20, 20);
        let p = props(&[("x0", 5.0), ("y0", 5.0), ("x1", 15.0), ("y1", 10.0)]);
        CropResizeEffect.apply(&mut img, &p, 0).unwrap();
        assert_eq!((img.width(), img.height()), (10, 5));
    }

    #[test]
    fn test_crop_then_downscale() {
        let mut img = gradient(100, 100);
        let p = props(&[
            ("x0", 10.0),
            ("y0", 10.0),
            ("cwidth", 80.0),
            ("cheight", 80.0),
            ("twidth", 40.0),
            ("theight", 40.0),
        ]);
        CropResizeEffect.apply(&mut img, &p, 0).unwrap();
        assert_eq!((img.width(), img.height()), (40, 40));
        // center of the output corresponds to the center of the crop window
        let px = img.sample(20, 20);
        assert!((px[0] as i32 - 50).abs() <= 2, "{:?}", px);
        assert!((px[1] as i32 - 50).abs() <= 2, "{:?}", px);
    }

    #[test]
    fn test_pure_resize_upscale() {
        let mut img = gradient(10, 10);
        let p = props(&[("twidth", 20.0), ("theight", 20.0)]);
        CropResizeEffect.apply(&mut img, &p, 0).unwrap();
        assert_eq!((img.width(), img.height()), (20, 20));
    }
}
