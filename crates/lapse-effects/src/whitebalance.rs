//! White balance adjustment.

use lapse_core::{Image32, Image8};
use tracing::debug;

use crate::registry::{Effect, PropertyMap};
use crate::{xyz, EffectResult};

/// Bradford cone-response matrix (XYZ to LMS).
const BRADFORD: [[f64; 3]; 3] = [
    [0.7328, 0.4296, -0.1624],
    [-0.7036, 1.6975, 0.0061],
    [0.0030, 0.0136, 0.9834],
];

/// Inverse Bradford matrix (LMS to XYZ).
const BRADFORD_INV: [[f64; 3]; 3] = [
    [1.0961, -0.2789, 0.1827],
    [0.4544, 0.4735, 0.0721],
    [-0.0096, -0.0057, 1.0153],
];

/// A CIE 1931 chromaticity.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Chromaticity {
    x: f64,
    y: f64,
}

fn dot(row: &[f64; 3], v: &[f64; 3]) -> f64 {
    row[0] * v[0] + row[1] * v[1] + row[2] * v[2]
}

fn to_lms(color: &[f64; 3]) -> [f64; 3] {
    [
        dot(&BRADFORD[0], color),
        dot(&BRADFORD[1], color),
        dot(&BRADFORD[2], color),
    ]
}

/// LMS response of a chromaticity, normalized to Y = 1.
fn lms_of_chromaticity(c: Chromaticity) -> [f64; 3] {
    to_lms(&[c.x / c.y, 1.0, (1.0 - c.x - c.y) / c.y])
}

fn lms_to_xyz(color: &[f64; 3]) -> [f64; 3] {
    [
        dot(&BRADFORD_INV[0], color),
        dot(&BRADFORD_INV[1], color),
        dot(&BRADFORD_INV[2], color),
    ]
}

/// CIE daylight chromaticity for a color temperature in Kelvin.
///
/// Piecewise cubic approximation, valid for 1667..=25000 K; `None` outside
/// that range.
fn chromaticity_from_temp(t: f64) -> Option<Chromaticity> {
    if !(1667.0..=25000.0).contains(&t) {
        return None;
    }
    let t2 = t * t;
    let t3 = t2 * t;
    let x = if t < 4000.0 {
        -0.2661239e9 / t3 - 0.2343580e6 / t2 + 0.8776956e3 / t + 0.179910
    } else {
        -3.0258469e9 / t3 + 2.1070379e6 / t2 + 0.2226347e3 / t + 0.240390
    };
    let x2 = x * x;
    let x3 = x2 * x;
    let y = if t < 2222.0 {
        -1.1063814 * x3 - 1.34811020 * x2 + 2.18555832 * x - 0.20219683
    } else if t < 4000.0 {
        -0.9549476 * x3 - 1.37418593 * x2 + 2.09137015 * x - 0.16748867
    } else {
        3.0817580 * x3 - 5.87338670 * x2 + 3.75112997 * x - 0.37001483
    };
    Some(Chromaticity { x, y })
}

/// Shifts an XYZ image from one white chromaticity to another.
fn shift_xyz(image: &mut Image32, old: Chromaticity, new: Chromaticity, lms: bool) {
    let factor_x = new.x / old.x;
    let factor_y = new.y / old.y;

    let lms_factors = if lms {
        let old3 = lms_of_chromaticity(old);
        let new3 = lms_of_chromaticity(new);
        [new3[0] / old3[0], new3[1] / old3[1], new3[2] / old3[2]]
    } else {
        [1.0; 3]
    };

    image.buffer_mut().for_each_sample_mut(|px| {
        let p0 = px[0] as f64;
        let p1 = px[1] as f64;
        let p2 = px[2] as f64;
        if !lms {
            let sum = p0 + p1 + p2;
            px[2] = ((sum - factor_x * p0 - factor_y * p1) / factor_y) as f32;
            px[0] = (p0 * factor_x / factor_y) as f32;
        } else {
            let mut cone = to_lms(&[p0, p1, p2]);
            cone[0] *= lms_factors[0];
            cone[1] *= lms_factors[1];
            cone[2] *= lms_factors[2];
            let back = lms_to_xyz(&cone);
            px[0] = back[0] as f32;
            px[1] = back[1] as f32;
            px[2] = back[2] as f32;
        }
    });
}

/// Shifts an 8-bit sRGB image through XYZ, protecting overblown channels.
fn shift_rgb(
    image: &mut Image8,
    old: Chromaticity,
    new: Chromaticity,
    protect: bool,
    lms: bool,
) -> EffectResult<()> {
    if image.is_empty() {
        return Ok(());
    }
    // record the positions pegged at the upper bound before the transform
    let mask: Option<Vec<bool>> = if protect {
        image.flatten();
        Some(
            image
                .buffer()
                .flat_data()
                .iter()
                .map(|&v| v == u8::MAX)
                .collect(),
        )
    } else {
        None
    };

    let mut as_xyz = xyz::image_to_xyz(image)?;
    shift_xyz(&mut as_xyz, old, new, lms);
    xyz::xyz_to_image(&mut as_xyz, image)?;

    if let Some(mask) = mask {
        // overblown channels stay overblown, preventing hue drift in
        // clipped highlights
        let data = image.buffer_mut().flat_data_mut();
        for (v, &was_overblown) in data.iter_mut().zip(&mask) {
            if was_overblown {
                *v = u8::MAX;
            }
        }
    }
    Ok(())
}

/// Changes the white balance of a picture.
///
/// Properties:
///
/// - `overblow_prot` - keep channels pegged at the upper bound pegged
///   (default on); clipped highlights would otherwise pick up a color cast
/// - `use_lms` - adapt in Bradford LMS cone space (default on); the plain
///   XYZ scaling induces color casts
/// - `ref_temp` - reference color temperature in Kelvin (default 5500)
///
/// Source selection: `xrel`/`yrel` scale the chromaticity directly (LMS is
/// disabled for this mode), `srcr`/`srcg`/`srcb` give the source white as
/// an sRGB triple, otherwise the reference temperature is used. Target
/// selection: `temp` (Kelvin), `x`/`y` (chromaticity), otherwise neutral
/// gray. Out-of-range temperatures make the whole pass a silent no-op.
pub struct WhiteBalanceEffect {
    default_ref_temp: f64,
}

impl WhiteBalanceEffect {
    /// Creates the effect with the 5500 K reference default.
    pub fn new() -> Self {
        Self {
            default_ref_temp: 5500.0,
        }
    }
}

impl Default for WhiteBalanceEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for WhiteBalanceEffect {
    fn apply(&self, image: &mut Image8, props: &PropertyMap, verbosity: i32) -> EffectResult<()> {
        let protect = props.get("overblow_prot").map_or(true, |&v| v >= 0.5);
        let use_lms = props.get("use_lms").map_or(true, |&v| v >= 0.5);
        let ref_temp = props
            .get("ref_temp")
            .copied()
            .unwrap_or(self.default_ref_temp);

        if let (Some(&xrel), Some(&yrel)) = (props.get("xrel"), props.get("yrel")) {
            if verbosity >= 2 {
                debug!(xrel, yrel, "whitebalance: scaling chromaticity");
            }
            // direct scaling has no meaningful LMS counterpart
            return shift_rgb(
                image,
                Chromaticity { x: 1.0, y: 1.0 },
                Chromaticity { x: xrel, y: yrel },
                protect,
                false,
            );
        }

        // decide on a source chromaticity
        let old_color = match (props.get("srcr"), props.get("srcg"), props.get("srcb")) {
            (Some(&r), Some(&g), Some(&b)) => {
                let [x, y, z] = xyz::rgb8_to_xyz([r as u8, g as u8, b as u8])?;
                let sum = x + y + z;
                Chromaticity {
                    x: x / sum,
                    y: y / sum,
                }
            }
            _ => match chromaticity_from_temp(ref_temp) {
                Some(c) => c,
                None => return Ok(()),
            },
        };

        // decide on a target chromaticity
        let new_color = if let Some(&temp) = props.get("temp") {
            match chromaticity_from_temp(temp) {
                Some(c) => c,
                None => return Ok(()),
            }
        } else if let (Some(&x), Some(&y)) = (props.get("x"), props.get("y")) {
            Chromaticity { x, y }
        } else {
            let [x, y, z] = xyz::rgb8_to_xyz([128, 128, 128])?;
            let sum = x + y + z;
            Chromaticity {
                x: x / sum,
                y: y / sum,
            }
        };

        if verbosity >= 2 {
            debug!(
                from_x = old_color.x,
                from_y = old_color.y,
                to_x = new_color.x,
                to_y = new_color.y,
                use_lms,
                "whitebalance: shifting"
            );
        }
        shift_rgb(image, old_color, new_color, protect, use_lms)
    }
}
