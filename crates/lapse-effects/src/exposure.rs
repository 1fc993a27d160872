//! Exposure adjustment.

use lapse_core::Image8;
use lapse_io::exif::ExifProperties;
use tracing::debug;

use crate::registry::{Effect, PropertyMap};
use crate::{xyz, EffectResult};

/// Changes the exposure of a picture.
///
/// Properties:
///
/// - `ev100` - set the exposure in absolute EV100 terms; the image's own
///   exposure value is computed from its EXIF fields and the difference is
///   applied
/// - `evrel` - shift the exposure by this many stops
/// - `use_xyz` - when >= 0.5 (the default), scale in CIE XYZ instead of
///   directly in sRGB; slower but more accurate
pub struct ExposureEffect;

impl Effect for ExposureEffect {
    fn apply(&self, image: &mut Image8, props: &PropertyMap, verbosity: i32) -> EffectResult<()> {
        let use_xyz = props.get("use_xyz").map_or(true, |&v| v >= 0.5);

        if let Some(&target) = props.get("ev100") {
            // setting the exposure in absolute units needs the exposure the
            // image was taken with
            let current = ExifProperties::from_image(image)?.ev100()?;
            if verbosity >= 2 {
                debug!(current_ev100 = current, target_ev100 = target, "exposure");
            }
            multiply_exposure(image, current - target, use_xyz)?;
        } else if let Some(&evrel) = props.get("evrel") {
            if verbosity >= 2 {
                debug!(evrel, "exposure");
            }
            multiply_exposure(image, evrel, use_xyz)?;
        }
        Ok(())
    }
}

/// Increases exposure by `ev` stops, multiplying all channels by `2^ev`.
///
/// With `use_xyz` the image goes through float32 CIE XYZ for the scaling;
/// otherwise the 8-bit values are scaled in place. Results clamp to the
/// channel range either way.
pub fn multiply_exposure(image: &mut Image8, ev: f64, use_xyz: bool) -> EffectResult<()> {
    let factor = 2f64.powf(ev);
    debug!(ev, factor, use_xyz, "multiply exposure");

    if use_xyz {
        let mut xyz = xyz::image_to_xyz(image)?;
        xyz.buffer_mut().for_each_sample_mut(|px| {
            for v in px {
                *v = (*v as f64 * factor) as f32;
            }
        });
        xyz::xyz_to_image(&mut xyz, image)?;
    } else {
        image.buffer_mut().for_each_sample_mut(|px| {
            for v in px {
                *v = Image8::clamp_color(*v as f64 * factor);
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_core::Metadatum;

    /// Little-endian EXIF blob with FNumber, ExposureTime, and ISO in the
    /// Exif sub-IFD.
    fn exif_blob(f_number: (u32, u32), exposure: (u32, u32), iso: u16) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"II");
        b.extend_from_slice(&42u16.to_le_bytes());
        b.extend_from_slice(&8u32.to_le_bytes());

        // IFD0: only the Exif sub-IFD pointer, sub-IFD at offset 26
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&0x8769u16.to_le_bytes());
        b.extend_from_slice(&4u16.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&26u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());

        // sub-IFD: FNumber (rational at 68), ExposureTime (rational at 76),
        // ISO (inline short)
        assert_eq!(b.len(), 26);
        b.extend_from_slice(&3u16.to_le_bytes());
        b.extend_from_slice(&0x829Du16.to_le_bytes());
        b.extend_from_slice(&5u16.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&68u32.to_le_bytes());
        b.extend_from_slice(&0x829Au16.to_le_bytes());
        b.extend_from_slice(&5u16.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&76u32.to_le_bytes());
        b.extend_from_slice(&0x8827u16.to_le_bytes());
        b.extend_from_slice(&3u16.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&(iso as u32).to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());

        assert_eq!(b.len(), 68);
        b.extend_from_slice(&f_number.0.to_le_bytes());
        b.extend_from_slice(&f_number.1.to_le_bytes());
        b.extend_from_slice(&exposure.0.to_le_bytes());
        b.extend_from_slice(&exposure.1.to_le_bytes());
        b
    }

    fn solid(value: u8, width: usize, height: usize) -> Image8 {
        let mut img = Image8::new();
        img.reshape(width, height).unwrap();
        img.set_channel_types("rgb");
        img.allocate();
        img.buffer_mut().for_each_sample_mut(|px| px.fill(value));
        img
    }

    #[test]
    fn test_zero_ev_is_identity() {
        let mut img = solid(128, 4, 4);
        multiply_exposure(&mut img, 0.0, false).unwrap();
        assert_eq!(img.sample(2, 2), &[128, 128, 128]);
    }

    #[test]
    fn test_one_stop_doubles_srgb() {
        let mut img = solid(60, 4, 4);
        multiply_exposure(&mut img, 1.0, false).unwrap();
        assert_eq!(img.sample(0, 0), &[120, 120, 120]);
    }

    #[test]
    fn test_clamps_at_white() {
        let mut img = solid(200, 2, 2);
        multiply_exposure(&mut img, 1.0, false).unwrap();
        assert_eq!(img.sample(0, 0), &[255, 255, 255]);
    }

    #[test]
    fn test_opposite_shifts_compose_to_identity() {
        let mut img = solid(100, 2, 2);
        multiply_exposure(&mut img, 0.5, false).unwrap();
        multiply_exposure(&mut img, -0.5, false).unwrap();
        for c in 0..3 {
            assert!((img.sample(0, 0)[c] as i32 - 100).abs() <= 1);
        }
    }

    #[test]
    fn test_xyz_path_brightens() {
        let mut img = solid(100, 2, 2);
        multiply_exposure(&mut img, 1.0, true).unwrap();
        assert!(img.sample(0, 0)[0] > 100);
    }

    #[test]
    fn test_evrel_property() {
        let mut img = solid(64, 2, 2);
        let mut props = PropertyMap::new();
        props.insert("evrel".into(), 1.0);
        props.insert("use_xyz".into(), 0.0);
        ExposureEffect.apply(&mut img, &props, 0).unwrap();
        assert_eq!(img.sample(0, 0)[0], 128);
    }

    #[test]
    fn test_ev100_uses_exif() {
        let mut img = solid(50, 2, 2);
        // f/2.8, 1/250 s, ISO 100: EV100 = log2(2.8^2) + log2(250)
        let blob = exif_blob((28, 10), (1, 250), 100);
        img.add_metadatum("exif", Metadatum::with_id(blob, "Exif\0\0"));
        let image_ev = (2.8f64 * 2.8).log2() + 250f64.log2();

        // ask for one stop below the image's own exposure value
        let mut props = PropertyMap::new();
        props.insert("ev100".into(), image_ev - 1.0);
        props.insert("use_xyz".into(), 0.0);
        ExposureEffect.apply(&mut img, &props, 0).unwrap();
        // delta = image - target = +1 stop
        assert_eq!(img.sample(0, 0)[0], 100);
    }

    #[test]
    fn test_ev100_without_exif_fails() {
        let mut img = solid(50, 2, 2);
        let mut props = PropertyMap::new();
        props.insert("ev100".into(), 10.0);
        assert!(ExposureEffect.apply(&mut img, &props, 0).is_err());
    }
}
