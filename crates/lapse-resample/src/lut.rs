//! Filter look-up table builders.
//!
//! Each sampler kernel is evaluated once into a table of `resolution` floats
//! covering the kernel's full support `[-size, +size]`; sampling then reduces
//! to an index computation and a multiply. The absolute scale of a table does
//! not matter because the sampler normalizes by the window's weight sum.

use std::f32::consts::PI;

/// Triangle filter over [-1, 1].
pub fn linear(resolution: usize) -> Vec<f32> {
    let factor = 2.0 / (resolution - 1) as f32;
    (0..resolution)
        .map(|i| 1.0 - (i as f32 * factor - 1.0).abs())
        .collect()
}

/// Mitchell-Netravali cubic over [-2, 2].
///
/// The filter is `P3 |x|^3 + P2 |x|^2 + P0` for `|x| < 1` and
/// `Q3 |x|^3 + Q2 |x|^2 + Q1 |x| + Q0` for `1 <= |x| < 2`, with the
/// coefficients of the Mitchell and Netravali paper.
pub fn cubic(b: f32, c: f32, resolution: usize) -> Vec<f32> {
    let p3 = 12.0 - 9.0 * b - 6.0 * c;
    let p2 = -18.0 + 12.0 * b + 6.0 * c;
    let p0 = 6.0 - 2.0 * b;
    let q3 = -b - 6.0 * c;
    let q2 = 6.0 * b + 30.0 * c;
    let q1 = -12.0 * b - 48.0 * c;
    let q0 = 8.0 * b + 24.0 * c;

    let factor = 4.0 / (resolution - 1) as f32;
    (0..resolution)
        .map(|i| {
            let x = (i as f32 * factor - 2.0).abs();
            let x2 = x * x;
            let x3 = x2 * x;
            if x < 1.0 {
                p3 * x3 + p2 * x2 + p0
            } else {
                q3 * x3 + q2 * x2 + q1 * x + q0
            }
        })
        .collect()
}

/// Lanczos filter of the given order over [-order, order].
///
/// Evaluated as `order * sin(x) * sin(x / order) / x^2` at
/// `x = pi * (i * 2 * order / (res - 1) - order)`, with value 1 at x = 0.
pub fn lanczos(order: f32, resolution: usize) -> Vec<f32> {
    let factor = 2.0 * order / (resolution - 1) as f32;
    (0..resolution)
        .map(|i| {
            let x = PI * (i as f32 * factor - order);
            if x == 0.0 {
                1.0
            } else {
                order * x.sin() * (x / order).sin() / (x * x)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_shape() {
        let lut = linear(101);
        assert!((lut[0] - 0.0).abs() < 1e-6);
        assert!((lut[50] - 1.0).abs() < 1e-6);
        assert!((lut[100] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_cubic_center_and_edges() {
        let b = 1.0 / 3.0;
        let c = 1.0 / 3.0;
        let lut = cubic(b, c, 4001);
        // center value is P0 = 6 - 2B
        assert!((lut[2000] - (6.0 - 2.0 * b)).abs() < 1e-3);
        // the kernel vanishes at |x| = 2
        assert!(lut[0].abs() < 1e-2);
        assert!(lut[4000].abs() < 1e-2);
    }

    #[test]
    fn test_cubic_negative_lobe() {
        let lut = cubic(1.0 / 3.0, 1.0 / 3.0, 4001);
        // Mitchell-Netravali goes negative between 1 and 2
        let x_1_5 = 3500; // x = 1.5
        assert!(lut[x_1_5] < 0.0);
    }

    #[test]
    fn test_lanczos_center_and_zeros() {
        let lut = lanczos(3.0, 6001);
        assert!((lut[3000] - 1.0).abs() < 1e-4);
        // zero crossings at integer offsets: x = 1 is index 4000 for order 3
        assert!(lut[4000].abs() < 1e-3);
        assert!(lut[0].abs() < 1e-3);
    }
}
