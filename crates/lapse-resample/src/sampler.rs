//! Separable convolution sampler.

use lapse_core::{Channel, Image};

use crate::lut;

/// Direction(s) in which a sampler applies its filter.
///
/// For the single-axis directions the other axis uses a nearest-pixel
/// approximation, which is what the resizer's separable passes rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Filter along x, nearest pixel along y.
    Horizontal,
    /// Filter along y, nearest pixel along x.
    Vertical,
    /// Filter along both axes as a separable product.
    Both,
}

/// Upper bound on channels a sampler accumulates per pixel.
const MAX_CHANNELS: usize = 8;

/// Sampler that performs 2-d or 1-d convolutions.
///
/// The convolution function is assumed separable,
/// `f(x, y) = f1(x) * f2(y)`, and each factor is read from a look-up table.
/// The constructors install the tables for the supported kernel family; the
/// default table resolution is [`ConvSampler::DEFAULT_RESOLUTION`].
///
/// The per-window weight sum is always normalized out, so a uniform image
/// samples to the same uniform value no matter how the window is truncated
/// at the image borders.
///
/// # Example
///
/// ```rust
/// use lapse_core::Image;
/// use lapse_resample::{ConvSampler, Direction};
///
/// let mut img: Image<u8> = Image::new();
/// img.reshape(8, 8).unwrap();
/// img.set_channel_types("rgb");
/// img.allocate();
///
/// let sampler = ConvSampler::cubic(1.0 / 3.0, 1.0 / 3.0, 2000);
/// let mut px = [0u8; 3];
/// sampler.sample(&img, 3.5, 3.5, &mut px, Direction::Both, 1.0, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct ConvSampler {
    lut_x: Vec<f32>,
    lut_y: Vec<f32>,
    /// Horizontal filter radius; the window spans `[x - size, x + size)`.
    size_x: f32,
    /// Vertical filter radius.
    size_y: f32,
}

impl ConvSampler {
    /// Default look-up table resolution.
    pub const DEFAULT_RESOLUTION: usize = 6000;

    /// Box filter: radius 0.5, a single unit weight.
    pub fn boxcar() -> Self {
        Self {
            lut_x: vec![1.0],
            lut_y: vec![1.0],
            size_x: 0.5,
            size_y: 0.5,
        }
    }

    /// Linear (triangle) filter: radius 1.
    pub fn linear(resolution: usize) -> Self {
        let lut = lut::linear(resolution);
        Self {
            lut_x: lut.clone(),
            lut_y: lut,
            size_x: 1.0,
            size_y: 1.0,
        }
    }

    /// Mitchell-Netravali cubic filter: radius 2.
    ///
    /// The recommended parameters from the Mitchell and Netravali paper are
    /// `b = c = 1/3`.
    pub fn cubic(b: f32, c: f32, resolution: usize) -> Self {
        let lut = lut::cubic(b, c, resolution);
        Self {
            lut_x: lut.clone(),
            lut_y: lut,
            size_x: 2.0,
            size_y: 2.0,
        }
    }

    /// Lanczos filter of the given order: radius equals the order.
    pub fn lanczos(order: f32, resolution: usize) -> Self {
        let lut = lut::lanczos(order, resolution);
        Self {
            lut_x: lut.clone(),
            lut_y: lut,
            size_x: order,
            size_y: order,
        }
    }

    /// Returns the (x, y) filter radii.
    pub fn size(&self) -> (f32, f32) {
        (self.size_x, self.size_y)
    }

    /// Samples `image` at real position `(x, y)`, writing one value per
    /// channel into `out`.
    ///
    /// `scale_x`/`scale_y` scale the filter's support; the resizer passes
    /// `max(1, input/output)` per axis so that down-sampling widens the
    /// kernel instead of skipping pixels.
    pub fn sample<T: Channel>(
        &self,
        image: &Image<T>,
        x: f32,
        y: f32,
        out: &mut [T],
        dir: Direction,
        scale_x: f32,
        scale_y: f32,
    ) {
        match dir {
            Direction::Both => self.sample_product(image, x, y, out, scale_x, scale_y),
            Direction::Horizontal => self.sample_x(image, x, y, out, scale_x),
            Direction::Vertical => self.sample_y(image, x, y, out, scale_y),
        }
    }

    /// Filter window along one axis: integer range
    /// `[floor(p - s) + 1, floor(p + s)]` clamped to `[0, dim - 1]`.
    #[inline]
    fn window(p: f32, s: f32, dim: usize) -> (usize, usize) {
        let start = ((p - s + 1.0).floor() as i64).max(0) as usize;
        let end = (((p + s).floor() as i64).min(dim as i64 - 1)).max(0) as usize;
        (start, end)
    }

    fn sample_product<T: Channel>(
        &self,
        image: &Image<T>,
        x: f32,
        y: f32,
        out: &mut [T],
        scale_x: f32,
        scale_y: f32,
    ) {
        let ncomps = image.channels();
        debug_assert!(ncomps <= MAX_CHANNELS && ncomps <= out.len());

        let size_x = (self.size_x * scale_x).max(0.5);
        let size_y = (self.size_y * scale_y).max(0.5);

        let (start_x, end_x) = Self::window(x, size_x, image.width());
        let (start_y, end_y) = Self::window(y, size_y, image.height());

        // map image-space distances to look-up table positions
        let map_x = self.lut_x.len() as f32 / (2.0 * size_x);
        let map_y = self.lut_y.len() as f32 / (2.0 * size_y);
        let shifted_x = x + size_x;
        let shifted_y = y + size_y;

        let mut sums = [0.0f32; MAX_CHANNELS];
        let mut wsum = 0.0f32;

        for j in start_y..=end_y {
            let wj = self.lut_y
                [(((shifted_y - j as f32) * map_y) as usize).min(self.lut_y.len() - 1)];
            for i in start_x..=end_x {
                let wi = self.lut_x
                    [(((shifted_x - i as f32) * map_x) as usize).min(self.lut_x.len() - 1)];
                let weight = wi * wj;
                let px = image.sample(i, j);
                for (sum, &v) in sums[..ncomps].iter_mut().zip(px) {
                    *sum += v.to_f64() as f32 * weight;
                }
                wsum += weight;
            }
        }

        for comp in 0..ncomps {
            out[comp] = T::clamp_from((sums[comp] / wsum) as f64);
        }
    }

    fn sample_x<T: Channel>(
        &self,
        image: &Image<T>,
        x: f32,
        y: f32,
        out: &mut [T],
        scale_x: f32,
    ) {
        let ncomps = image.channels();
        debug_assert!(ncomps <= MAX_CHANNELS && ncomps <= out.len());

        let size_x = (self.size_x * scale_x).max(0.5);
        let (start_x, end_x) = Self::window(x, size_x, image.width());
        let row = (y as usize).min(image.height() - 1);

        let map_x = self.lut_x.len() as f32 / (2.0 * size_x);
        let shifted_x = x + size_x;

        let mut sums = [0.0f32; MAX_CHANNELS];
        let mut wsum = 0.0f32;

        for i in start_x..=end_x {
            let weight = self.lut_x
                [(((shifted_x - i as f32) * map_x) as usize).min(self.lut_x.len() - 1)];
            let px = image.sample(i, row);
            for (sum, &v) in sums[..ncomps].iter_mut().zip(px) {
                *sum += v.to_f64() as f32 * weight;
            }
            wsum += weight;
        }

        for comp in 0..ncomps {
            out[comp] = T::clamp_from((sums[comp] / wsum) as f64);
        }
    }

    fn sample_y<T: Channel>(
        &self,
        image: &Image<T>,
        x: f32,
        y: f32,
        out: &mut [T],
        scale_y: f32,
    ) {
        let ncomps = image.channels();
        debug_assert!(ncomps <= MAX_CHANNELS && ncomps <= out.len());

        let size_y = (self.size_y * scale_y).max(0.5);
        let (start_y, end_y) = Self::window(y, size_y, image.height());
        let col = (x as usize).min(image.width() - 1);

        let map_y = self.lut_y.len() as f32 / (2.0 * size_y);
        let shifted_y = y + size_y;

        let mut sums = [0.0f32; MAX_CHANNELS];
        let mut wsum = 0.0f32;

        for j in start_y..=end_y {
            let weight = self.lut_y
                [(((shifted_y - j as f32) * map_y) as usize).min(self.lut_y.len() - 1)];
            let px = image.sample(col, j);
            for (sum, &v) in sums[..ncomps].iter_mut().zip(px) {
                *sum += v.to_f64() as f32 * weight;
            }
            wsum += weight;
        }

        for comp in 0..ncomps {
            out[comp] = T::clamp_from((sums[comp] / wsum) as f64);
        }
    }
}
