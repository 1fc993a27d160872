//! Two-pass separable image resizer with striped worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};

use lapse_core::{Channel, Image, Select};
use tracing::{debug, trace};

use crate::{ConvSampler, Direction, ResampleError, ResampleResult};

/// Progress callback: receives the completed fraction, returns `false` to
/// request early termination. Workers invoke it concurrently, so it must be
/// `Sync`; it may be called frequently and should stay fast. Observed
/// fractions are not required to be monotonic.
pub type Progress<'a> = Option<&'a (dyn Fn(f32) -> bool + Sync)>;

/// Raw output cursor handed to the stripe workers.
///
/// Workers receive disjoint stripes of a freshly allocated output buffer, so
/// concurrent writes never alias.
#[derive(Clone, Copy)]
struct StripeOut<T>(*mut T);

unsafe impl<T: Send> Send for StripeOut<T> {}
unsafe impl<T: Send> Sync for StripeOut<T> {}

/// Resizes images through a [`ConvSampler`].
///
/// The resize runs in one pass when only one dimension changes and in two
/// separable passes otherwise, scaling the more strongly reduced axis first
/// to keep the intermediate buffer small. Each pass splits the output's
/// longer dimension into contiguous stripes processed by worker threads.
///
/// The result always owns its pixel data; metadata and channel types are
/// shallow-copied from the input.
///
/// # Example
///
/// ```rust
/// use lapse_core::Image;
/// use lapse_resample::{ConvSampler, Resizer};
///
/// let mut img: Image<u8> = Image::new();
/// img.reshape(100, 60).unwrap();
/// img.set_channel_types("rgb");
/// img.allocate();
///
/// let mut resizer = Resizer::new();
/// resizer.set_sampler(ConvSampler::linear(2000));
/// let out = resizer.resize(&img, 50, 30, None).unwrap();
/// assert_eq!((out.width(), out.height()), (50, 30));
/// ```
#[derive(Debug, Default)]
pub struct Resizer {
    sampler: Option<ConvSampler>,
    max_threads: usize,
}

impl Resizer {
    /// Creates a resizer with no sampler and no thread limit.
    pub fn new() -> Self {
        Self {
            sampler: None,
            max_threads: 0,
        }
    }

    /// Installs the sampler used for all subsequent resizes.
    pub fn set_sampler(&mut self, sampler: ConvSampler) {
        self.sampler = Some(sampler);
    }

    /// Limits worker threads. 1 forces single-threaded execution, 0 means
    /// as many threads as the hardware provides.
    pub fn set_max_threads(&mut self, n: usize) {
        self.max_threads = n;
    }

    /// Resizes `image` to `width` x `height`.
    ///
    /// When the target equals the source size the pixels are deep-copied and
    /// the metadata shared, with no filtering. A cancelled progress callback
    /// leaves the result partially filled.
    ///
    /// # Errors
    ///
    /// [`ResampleError::SamplerNotSet`] without a sampler,
    /// [`ResampleError::InvalidTarget`] for a zero dimension.
    pub fn resize<T: Channel>(
        &self,
        image: &Image<T>,
        width: usize,
        height: usize,
        progress: Progress<'_>,
    ) -> ResampleResult<Image<T>> {
        if self.sampler.is_none() {
            return Err(ResampleError::SamplerNotSet);
        }
        if width == 0 || height == 0 {
            return Err(ResampleError::InvalidTarget { width, height });
        }

        if width == image.width() && height == image.height() {
            let mut result = image.clone();
            result.make_unique(Select::Pixels);
            return Ok(result);
        }

        debug!(
            from_w = image.width(),
            from_h = image.height(),
            to_w = width,
            to_h = height,
            "resize"
        );

        let scale_x = width as f32 / image.width() as f32;
        let scale_y = height as f32 / image.height() as f32;

        let mut result: Image<T> = Image::new();
        result.reshape(width, height).expect("fresh image is empty");
        result.set_channel_count(image.channels());
        result.allocate();

        let mut total_pixels = width * height;

        if width == image.width() {
            self.run_pass(image, &mut result, Direction::Vertical, progress, 0, total_pixels);
        } else if height == image.height() {
            self.run_pass(image, &mut result, Direction::Horizontal, progress, 0, total_pixels);
        } else {
            // two passes through an intermediate image; do the more strongly
            // scaled axis first so the intermediate stays small
            let mut interm: Image<T> = Image::new();
            interm.set_channel_count(image.channels());
            if scale_x < scale_y {
                interm.reshape(width, image.height()).expect("fresh image is empty");
                interm.allocate();
                total_pixels += interm.width() * interm.height();

                self.run_pass(image, &mut interm, Direction::Horizontal, progress, 0, total_pixels);
                let done = interm.width() * interm.height();
                self.run_pass(&interm, &mut result, Direction::Vertical, progress, done, total_pixels);
            } else {
                interm.reshape(image.width(), height).expect("fresh image is empty");
                interm.allocate();
                total_pixels += interm.width() * interm.height();

                self.run_pass(image, &mut interm, Direction::Vertical, progress, 0, total_pixels);
                let done = interm.width() * interm.height();
                self.run_pass(&interm, &mut result, Direction::Horizontal, progress, done, total_pixels);
            }
        }

        result.copy_metadata_from(image);
        result.set_channel_types(image.channel_types());

        if let Some(cb) = progress {
            cb(1.0);
        }

        Ok(result)
    }

    /// Runs one sampling pass, splitting the output into worker stripes.
    fn run_pass<T: Channel>(
        &self,
        image: &Image<T>,
        result: &mut Image<T>,
        dir: Direction,
        progress: Progress<'_>,
        pixels_offset: usize,
        total_pixels: usize,
    ) {
        let sampler = self.sampler.as_ref().expect("checked by resize");

        let width = result.width();
        let height = result.height();
        let channels = result.channels();

        let hw_threads = rayon::current_num_threads();
        let limit = if self.max_threads == 0 {
            hw_threads
        } else {
            hw_threads.min(self.max_threads)
        };
        // no more than one thread per four lines of the longer dimension
        let max_dim = width.max(height);
        let n_threads = limit.min(max_dim / 4).max(1);

        trace!(n_threads, width, height, ?dir, "resize pass");

        let factor_x = image.width() as f32 / width as f32;
        let factor_y = image.height() as f32 / height as f32;
        let filter_scale_x = factor_x.max(1.0);
        let filter_scale_y = factor_y.max(1.0);

        let slots: Vec<AtomicUsize> = (0..n_threads).map(|_| AtomicUsize::new(0)).collect();
        let split_x = width > height;

        let out = StripeOut(result.buffer_mut().flat_data_mut().as_mut_ptr());

        let worker = |idx: usize, x1: usize, y1: usize, x2: usize, y2: usize| {
            let out = &out;
            let mut sample = [T::default(); 8];
            let n = channels.min(8);
            'outer: for i in x1..x2 {
                let orig_x = i as f32 * factor_x;
                for j in y1..y2 {
                    let orig_y = j as f32 * factor_y;
                    sampler.sample(
                        image,
                        orig_x,
                        orig_y,
                        &mut sample[..n],
                        dir,
                        filter_scale_x,
                        filter_scale_y,
                    );
                    let off = (i * channels) + (j * channels * width);
                    // stripes are disjoint, so this write cannot alias another
                    // worker's output
                    let dst = unsafe { std::slice::from_raw_parts_mut(out.0.add(off), n) };
                    dst.copy_from_slice(&sample[..n]);
                }
                let done = (i - x1 + 1) * (y2 - y1);
                if let Some(cb) = progress {
                    slots[idx].store(done, Ordering::Relaxed);
                    let all: usize = slots.iter().map(|s| s.load(Ordering::Relaxed)).sum();
                    if !cb((pixels_offset + all) as f32 / total_pixels as f32) {
                        break 'outer;
                    }
                }
            }
        };

        if n_threads == 1 {
            worker(0, 0, 0, width, height);
        } else {
            let step = max_dim as f32 / n_threads as f32;
            rayon::scope(|scope| {
                for idx in 0..n_threads {
                    let lo = (idx as f32 * step) as usize;
                    let hi = if idx + 1 == n_threads {
                        max_dim
                    } else {
                        ((idx + 1) as f32 * step) as usize
                    };
                    let (x1, y1, x2, y2) = if split_x {
                        (lo, 0, hi, height)
                    } else {
                        (0, lo, width, hi)
                    };
                    let worker = &worker;
                    scope.spawn(move |_| worker(idx, x1, y1, x2, y2));
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn gradient_image(width: usize, height: usize) -> Image<u8> {
        let mut img: Image<u8> = Image::new();
        img.reshape(width, height).unwrap();
        img.set_channel_types("rgb");
        img.allocate();
        for y in 0..height {
            for x in 0..width {
                let px = img.sample_mut(x, y);
                px[0] = (x * 255 / width.max(1)) as u8;
                px[1] = (y * 255 / height.max(1)) as u8;
                px[2] = 128;
            }
        }
        img
    }

    fn constant_image(value: u8, width: usize, height: usize) -> Image<u8> {
        let mut img: Image<u8> = Image::new();
        img.reshape(width, height).unwrap();
        img.set_channel_types("rgb");
        img.allocate();
        img.buffer_mut().for_each_sample_mut(|px| px.fill(value));
        img
    }

    fn lanczos_resizer() -> Resizer {
        let mut r = Resizer::new();
        r.set_sampler(ConvSampler::lanczos(3.0, 2000));
        r
    }

    #[test]
    fn test_no_sampler_is_an_error() {
        let resizer = Resizer::new();
        let img = constant_image(10, 8, 8);
        assert!(matches!(
            resizer.resize(&img, 4, 4, None),
            Err(ResampleError::SamplerNotSet)
        ));
    }

    #[test]
    fn test_identity_size_copies_pixels() {
        let resizer = lanczos_resizer();
        let img = gradient_image(12, 9);
        let out = resizer.resize(&img, 12, 9, None).unwrap();
        for y in 0..9 {
            for x in 0..12 {
                assert_eq!(out.sample(x, y), img.sample(x, y));
            }
        }
        assert!(out.is_unique(Select::Pixels));
    }

    #[test]
    fn test_constant_survives_all_samplers() {
        let img = constant_image(137, 33, 21);
        let samplers = [
            ConvSampler::boxcar(),
            ConvSampler::linear(2000),
            ConvSampler::cubic(1.0 / 3.0, 1.0 / 3.0, 2000),
            ConvSampler::lanczos(3.0, 2000),
        ];
        for sampler in samplers {
            let mut resizer = Resizer::new();
            resizer.set_sampler(sampler);
            for &(w, h) in &[(17, 11), (66, 42), (33, 10), (5, 21)] {
                let out = resizer.resize(&img, w, h, None).unwrap();
                for y in 0..h {
                    for x in 0..w {
                        for c in 0..3 {
                            let v = out.sample(x, y)[c] as i32;
                            assert!((v - 137).abs() <= 1, "{w}x{h} at ({x},{y}): {v}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_metadata_shared_and_types_kept() {
        use lapse_core::Metadatum;
        let mut img = gradient_image(20, 20);
        img.add_metadatum("comment", Metadatum::new(b"hi".to_vec()));
        let resizer = lanczos_resizer();
        let out = resizer.resize(&img, 10, 10, None).unwrap();
        assert!(out.has_metadatum("comment"));
        assert_eq!(out.channel_types(), "rgb");
    }

    #[test]
    fn test_threaded_matches_single_threaded() {
        let img = gradient_image(97, 53);
        let mut single = lanczos_resizer();
        single.set_max_threads(1);
        let multi = lanczos_resizer();

        let a = single.resize(&img, 41, 29, None).unwrap();
        let b = multi.resize(&img, 41, 29, None).unwrap();
        for y in 0..29 {
            for x in 0..41 {
                assert_eq!(a.sample(x, y), b.sample(x, y), "mismatch at ({x},{y})");
            }
        }
    }

    #[test]
    fn test_single_axis_pass() {
        let img = constant_image(90, 40, 40);
        let resizer = lanczos_resizer();
        let out = resizer.resize(&img, 40, 20, None).unwrap();
        assert_eq!((out.width(), out.height()), (40, 20));
        assert!((out.sample(5, 5)[0] as i32 - 90).abs() <= 1);
    }

    #[test]
    fn test_progress_reaches_one() {
        use std::sync::Mutex;
        let img = gradient_image(64, 64);
        let resizer = lanczos_resizer();
        let last = Mutex::new(0.0f32);
        let cb = |p: f32| {
            *last.lock().unwrap() = p;
            true
        };
        resizer.resize(&img, 32, 32, Some(&cb)).unwrap();
        assert!((*last.lock().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cancellation_is_honored() {
        let img = gradient_image(128, 128);
        let mut resizer = lanczos_resizer();
        resizer.set_max_threads(1);
        let called = AtomicBool::new(false);
        let cb = |_p: f32| {
            called.store(true, Ordering::Relaxed);
            false
        };
        // a cancelled resize still returns a (partially filled) result
        let out = resizer.resize(&img, 64, 64, Some(&cb)).unwrap();
        assert!(called.load(Ordering::Relaxed));
        assert_eq!((out.width(), out.height()), (64, 64));
    }
}
