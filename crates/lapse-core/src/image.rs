//! An image with metadata.
//!
//! [`Image`] pairs a [`PixelBuffer`] with a [`MetadataMap`] and a channel-type
//! string. Like its parts, it behaves somewhat like a reference: copying is
//! cheap and copies share data with the originals. Deep copies go through
//! [`Image::clone_deep`] or [`Image::make_unique`].

use crate::{Axis, Channel, CoreResult, MetadataMap, Metadatum, PixelBuffer};

/// 8-bit image, the working type of the JPEG pipeline.
pub type Image8 = Image<u8>;
/// 32-bit float image, used for color-space intermediates.
pub type Image32 = Image<f32>;

/// Selects which halves of an image an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    /// Only the pixel data.
    Pixels,
    /// Only the metadata.
    Meta,
    /// Both pixel data and metadata.
    Both,
}

impl Select {
    fn pixels(self) -> bool {
        matches!(self, Select::Pixels | Select::Both)
    }

    fn meta(self) -> bool {
        matches!(self, Select::Meta | Select::Both)
    }
}

/// A pixel buffer with attached metadata and channel-type tags.
///
/// The channel-type string has one character per channel describing its
/// semantic role. The image itself does not interpret it; the recommended
/// codes are:
///
/// - `-` unused (padding)
/// - `a` alpha (in rgba), color component a (in Lab)
/// - `b` blue (in rgba), color component b (in Lab)
/// - `c` cyan
/// - `C` Cr or Cb (in YCC, depending on position)
/// - `g` green
/// - `k` black
/// - `L` lightness
/// - `m` magenta
/// - `r` red
/// - `X` color component X (in XYZ)
/// - `y` yellow
/// - `Y` luma (in YCC), color component Y (in XYZ)
/// - `Z` color component Z (in XYZ)
#[derive(Debug, Clone)]
pub struct Image<T> {
    pixels: PixelBuffer<T>,
    metadata: MetadataMap,
    channel_types: String,
}

impl<T: Channel> Default for Image<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Channel> Image<T> {
    /// Creates an empty image.
    pub fn new() -> Self {
        Self {
            pixels: PixelBuffer::new(),
            metadata: MetadataMap::new(),
            channel_types: String::new(),
        }
    }

    // --- pixel data ------------------------------------------------------

    /// Returns the width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Returns the height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Returns the number of color channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.pixels.channels()
    }

    /// Returns the total element count of the visible image.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns `true` when no pixel data is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the underlying buffer.
    #[inline]
    pub fn buffer(&self) -> &PixelBuffer<T> {
        &self.pixels
    }

    /// Returns the underlying buffer mutably.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer<T> {
        &mut self.pixels
    }

    /// Returns the channels of pixel (x, y).
    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> &[T] {
        self.pixels.sample(x, y)
    }

    /// Returns the channels of pixel (x, y) mutably (copy-on-write).
    #[inline]
    pub fn sample_mut(&mut self, x: usize, y: usize) -> &mut [T] {
        self.pixels.sample_mut(x, y)
    }

    /// Sets the logical dimensions; only valid with no pixel data.
    pub fn reshape(&mut self, width: usize, height: usize) -> CoreResult<()> {
        self.pixels.reshape(width, height)
    }

    /// Narrows to the first `n` channels without moving data.
    pub fn set_channel_count(&mut self, n: usize) {
        self.pixels.set_channel_count(n);
    }

    /// Installs a freshly sized flat backing buffer.
    pub fn allocate(&mut self) {
        self.pixels.allocate();
    }

    /// Makes the pixel data contiguous in row-major order.
    pub fn flatten(&mut self) {
        self.pixels.flatten();
    }

    /// Crops the image. See [`PixelBuffer::crop`].
    pub fn crop(&mut self, offset_x: usize, offset_y: usize, width: usize, height: usize) {
        self.pixels.crop(offset_x, offset_y, width, height);
    }

    /// Returns a cropped shallow copy; pixels and metadata are shared.
    pub fn cropped(&self, offset_x: usize, offset_y: usize, width: usize, height: usize) -> Self {
        let mut result = self.clone();
        result.crop(offset_x, offset_y, width, height);
        result
    }

    /// Rotates clockwise by multiples of 90 degrees. O(1).
    pub fn coarse_rotate(&mut self, n_rot: i32) {
        self.pixels.coarse_rotate(n_rot);
    }

    /// Flips along the selected axes. O(1).
    pub fn flip(&mut self, axis: Axis) {
        self.pixels.flip(axis);
    }

    /// Swaps the x and y axes. O(1).
    pub fn flip_xy(&mut self) {
        self.pixels.flip_xy();
    }

    /// Narrows the view to a single channel; channel types become `"k"`.
    pub fn select_channel(&mut self, i: usize) {
        self.pixels.select_channel(i);
        self.channel_types = "k".to_string();
    }

    /// Returns a grayscale shallow copy of one channel.
    pub fn separate_channel(&self, i: usize) -> Self {
        let mut result = self.clone();
        result.select_channel(i);
        result
    }

    // --- metadata --------------------------------------------------------

    /// Returns the metadata map.
    #[inline]
    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Returns the metadata map mutably.
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.metadata
    }

    /// Inserts a metadatum, replacing an existing entry for the tag.
    pub fn add_metadatum(&mut self, tag: impl Into<String>, datum: Metadatum) {
        self.metadata.insert(tag, datum);
    }

    /// Appends a metadatum; the id strings must match.
    pub fn append_metadatum(&mut self, tag: impl Into<String>, datum: Metadatum) -> CoreResult<()> {
        self.metadata.append(tag, datum)
    }

    /// Returns `true` if the tag is present.
    pub fn has_metadatum(&self, tag: &str) -> bool {
        self.metadata.has(tag)
    }

    /// Looks up a metadatum.
    pub fn metadatum(&self, tag: &str) -> Option<&Metadatum> {
        self.metadata.get(tag)
    }

    /// Shallow-copies metadata from another image (any element type).
    pub fn copy_metadata_from<U>(&mut self, original: &Image<U>) {
        self.metadata = original.metadata.clone();
    }

    // --- whole-image operations ------------------------------------------

    /// Makes a deep copy of both the pixel data and the metadata.
    pub fn clone_deep(&self) -> Self {
        let mut result = self.clone();
        result.make_unique(Select::Both);
        result
    }

    /// Ensures the selected parts do not share memory with any other image.
    ///
    /// Making the pixels unique also leaves them contiguous in row-major
    /// order when a copy was needed.
    pub fn make_unique(&mut self, which: Select) {
        if which.pixels() {
            self.pixels.make_unique();
        }
        if which.meta() {
            self.metadata.make_unique();
        }
    }

    /// Returns `true` if the selected parts are not shared.
    pub fn is_unique(&self, which: Select) -> bool {
        let mut res = true;
        if which.pixels() {
            res = res && self.pixels.is_unique();
        }
        if which.meta() {
            res = res && self.metadata.is_unique();
        }
        res
    }

    /// Clears the selected parts.
    pub fn clear(&mut self, which: Select) {
        if which.pixels() {
            self.pixels.clear();
        }
        if which.meta() {
            self.metadata.clear();
        }
    }

    // --- channel types ---------------------------------------------------

    /// Returns the channel-type string.
    #[inline]
    pub fn channel_types(&self) -> &str {
        &self.channel_types
    }

    /// Sets the channel-type string and with it the channel count.
    pub fn set_channel_types(&mut self, s: impl Into<String>) {
        let s = s.into();
        self.pixels.set_channel_count(s.len());
        self.channel_types = s;
    }

    /// Clamps a computed value to the element range.
    #[inline]
    pub fn clamp_color(x: f64) -> T {
        T::clamp_from(x)
    }
}
