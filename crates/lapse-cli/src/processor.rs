//! The per-frame processing loop.

use anyhow::{Context, Result};
use lapse_core::Image8;
use lapse_effects::EffectRegistry;
use lapse_icc::{Intent, PixelLayout, Profile, Transform};
use lapse_io::{JpegIo, OutputTemplate};
use tracing::{debug, info};

use crate::program::EffectProgram;

/// Drives the whole run: load, color-manage, apply effects, write.
pub struct Processor {
    files: Vec<String>,
    program: EffectProgram,
    template: OutputTemplate,
    verbosity: i32,
}

impl Processor {
    /// Creates a processor over an expanded file list.
    pub fn new(
        files: Vec<String>,
        program: EffectProgram,
        template: OutputTemplate,
        verbosity: i32,
    ) -> Self {
        Self {
            files,
            program,
            template,
            verbosity,
        }
    }

    /// Processes every frame in order.
    ///
    /// Per frame: load the JPEG (orientation handling off, since frames are
    /// produced upright upstream), convert an embedded ICC profile to sRGB
    /// in place, apply the program's effects in declaration order with
    /// their interpolated properties, and write the frame under the
    /// expanded output name at quality 95.
    ///
    /// The first fatal error aborts the run, carrying the frame index.
    pub fn run(&self) -> Result<()> {
        let mut io = JpegIo::new();
        io.set_obey_orientation(false);
        io.set_quality(95);

        let registry = EffectRegistry::builtin();
        let srgb = Profile::srgb();

        for (frame, file) in self.files.iter().enumerate() {
            if self.verbosity > 0 {
                info!(frame, file = %file, "working on frame");
            }

            let mut image = io
                .load(file)
                .with_context(|| format!("loading frame {frame} ({file})"))?;

            convert_to_srgb(&mut image, &srgb)
                .with_context(|| format!("color-managing frame {frame} ({file})"))?;

            for effect_name in self.program.order() {
                let props = self.program.resolve(effect_name, frame as i64);
                registry
                    .get(effect_name)
                    .and_then(|effect| effect.apply(&mut image, &props, self.verbosity))
                    .with_context(|| {
                        format!("applying effect '{effect_name}' to frame {frame}")
                    })?;
            }

            let out_name = self.template.frame_path(frame);
            if self.verbosity > 0 {
                info!(frame, out = %out_name.display(), "writing");
            }
            io.write(&out_name, &image)
                .with_context(|| format!("writing frame {frame} ({})", out_name.display()))?;
        }

        Ok(())
    }
}

/// Applies an embedded ICC profile, converting the pixels to sRGB in place.
///
/// No-op for images without an `icc` metadatum. Non-RGB layouts are left
/// alone: the in-place transform needs matching source and destination
/// widths.
fn convert_to_srgb(image: &mut Image8, srgb: &Profile) -> Result<()> {
    let Some(datum) = image.metadatum("icc") else {
        return Ok(());
    };
    if image.channels() != 3 {
        debug!(
            channels = image.channels(),
            "skipping embedded profile on non-RGB image"
        );
        return Ok(());
    }

    let profile = Profile::from_memory(&datum.blob).context("embedded ICC profile")?;
    let layout = PixelLayout::of_image(image)?;
    let transform: Transform<[u8; 3], [u8; 3]> =
        Transform::new(&profile, layout, srgb, layout, Intent::Perceptual)?;

    image.flatten();
    transform.apply_in_place(lapse_icc::as_pixels_mut(image.buffer_mut().flat_data_mut()));
    Ok(())
}
