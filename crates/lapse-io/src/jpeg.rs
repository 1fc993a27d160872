//! JPEG loading and writing.
//!
//! [`JpegIo`] wraps the codec crates (`jpeg-decoder` / `jpeg-encoder`) for
//! the pixel data and does its own marker work through [`crate::markers`]:
//! comments, chunked ICC profiles, IPTC, EXIF, and XMP survive a load/write
//! round-trip. EXIF orientation is normalized at load time by rotating the
//! pixels and rewriting the tag.

use std::io::Cursor;
use std::path::Path;

use lapse_core::{Axis, Image8};
use tracing::{debug, trace};

use crate::{exif, markers, IoError, IoResult};

/// Progress callback: receives the completed fraction, returns `false` to
/// request an abort at the next line boundary.
pub type Progress = Box<dyn Fn(f32) -> bool + Send + Sync>;

/// Information from a JPEG file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Number of color components.
    pub ncomps: usize,
    /// Channel-type string of the decoded image (`rgb`, `k`, `cmyk`).
    pub colorspace: String,
}

/// JPEG reader/writer with metadata and orientation support.
///
/// # Example
///
/// ```rust,no_run
/// use lapse_io::JpegIo;
///
/// let mut io = JpegIo::new();
/// io.set_quality(95);
/// io.set_obey_orientation(false);
///
/// let image = io.load("in.jpg").unwrap();
/// io.write("out.jpg", &image).unwrap();
/// ```
pub struct JpegIo {
    quality: u8,
    size_hint: Option<(usize, usize)>,
    obey_orientation: bool,
    progress: Option<Progress>,
}

impl Default for JpegIo {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegIo {
    /// Creates an IO object with quality 95 and orientation obedience on.
    pub fn new() -> Self {
        Self {
            quality: 95,
            size_hint: None,
            obey_orientation: true,
            progress: None,
        }
    }

    /// Sets the save quality (1..=100).
    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality;
    }

    /// Sets the load size hint.
    ///
    /// Loading is accelerated when the needed image is smaller than the
    /// stored one: the codec's DCT scaling decodes at 1/2, 1/4, or 1/8
    /// resolution. The load is not guaranteed to obey the hint exactly, but
    /// the returned image is never smaller than it.
    pub fn set_size_hint(&mut self, width: usize, height: usize) {
        self.size_hint = Some((width, height));
    }

    /// Controls whether EXIF orientation tags are applied at load time.
    pub fn set_obey_orientation(&mut self, obey: bool) {
        self.obey_orientation = obey;
    }

    /// Installs a progress callback for load and write.
    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
    }

    fn notify(&self, line: usize, total: usize) -> bool {
        match &self.progress {
            Some(cb) => cb(line as f32 / total as f32),
            None => true,
        }
    }

    /// Chooses the DCT downscale denominator (1, 2, 4, or 8) for the
    /// current size hint: `2^floor(log2(scale))` clamped to 8, where scale
    /// is how much larger the stored image is than the hint.
    fn scale_denominator(&self, width: usize, height: usize) -> usize {
        let Some((hint_w, hint_h)) = self.size_hint else {
            return 1;
        };
        if hint_w == 0 || hint_h == 0 || width < hint_w || height < hint_h {
            return 1;
        }
        let scale_x = width as f32 / hint_w as f32;
        let scale_y = height as f32 / hint_h as f32;
        let scale = scale_x.max(scale_y);
        let pow = (scale.ln() / 2f32.ln()).floor().min(3.0).max(0.0) as u32;
        1usize << pow
    }

    /// Loads a JPEG file.
    ///
    /// Decodes the pixel data (honoring the size hint), attaches all
    /// recognized marker metadata, and normalizes the EXIF orientation when
    /// [`set_obey_orientation`](Self::set_obey_orientation) is on: the
    /// pixels are flipped/rotated upright, flattened, and the orientation
    /// tag rewritten to 1 in the blob's own byte order.
    pub fn load(&self, path: impl AsRef<Path>) -> IoResult<Image8> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        debug!(path = %path.display(), len = bytes.len(), "jpeg load");

        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(&bytes[..]));
        decoder
            .read_info()
            .map_err(|e| IoError::Decode(e.to_string()))?;
        let info = decoder
            .info()
            .ok_or_else(|| IoError::Decode("missing JPEG info".into()))?;

        let denom = self.scale_denominator(info.width as usize, info.height as usize);
        let (mut out_w, mut out_h) = (info.width as usize, info.height as usize);
        if denom > 1 {
            let (w, h) = decoder
                .scale(
                    (info.width as usize).div_ceil(denom) as u16,
                    (info.height as usize).div_ceil(denom) as u16,
                )
                .map_err(|e| IoError::Decode(e.to_string()))?;
            out_w = w as usize;
            out_h = h as usize;
            trace!(denom, out_w, out_h, "size hint scaling");
        }

        let pixels = decoder
            .decode()
            .map_err(|e| IoError::Decode(e.to_string()))?;
        let format = decoder
            .info()
            .ok_or_else(|| IoError::Decode("missing JPEG info".into()))?
            .pixel_format;

        let (channel_types, data): (&str, Vec<u8>) = match format {
            jpeg_decoder::PixelFormat::RGB24 => ("rgb", pixels),
            jpeg_decoder::PixelFormat::L8 => ("k", pixels),
            jpeg_decoder::PixelFormat::L16 => {
                // keep the high byte of each 16-bit sample
                ("k", pixels.chunks_exact(2).map(|px| px[0]).collect())
            }
            jpeg_decoder::PixelFormat::CMYK32 => ("cmyk", pixels),
        };

        let mut image = Image8::new();
        image.reshape(out_w, out_h).expect("fresh image is empty");
        image.set_channel_types(channel_types);
        image.allocate();

        let row_len = out_w * image.channels();
        for y in 0..out_h {
            image
                .buffer_mut()
                .row_mut(y)
                .copy_from_slice(&data[y * row_len..(y + 1) * row_len]);
            if !self.notify(y, out_h) {
                break;
            }
        }

        markers::collect_metadata(&bytes, image.metadata_mut())?;

        if self.obey_orientation && image.has_metadatum("exif") {
            self.apply_orientation(&mut image);
        }

        self.notify(out_h, out_h);
        Ok(image)
    }

    /// Rotates the pixels upright and rewrites the orientation tag to 1.
    fn apply_orientation(&self, image: &mut Image8) {
        let orientation = exif::orientation(&image.metadatum("exif").expect("checked").blob);
        trace!(orientation, "exif orientation");
        match orientation {
            2 => image.flip(Axis::X),
            3 => image.coarse_rotate(2),
            4 => {
                image.flip(Axis::X);
                image.coarse_rotate(2);
            }
            5 => {
                image.flip(Axis::Y);
                image.coarse_rotate(1);
            }
            6 => image.coarse_rotate(1),
            7 => {
                image.flip(Axis::Y);
                image.coarse_rotate(-1);
            }
            8 => image.coarse_rotate(-1),
            // 1 is normal orientation; anything else is ignored
            _ => return,
        }
        if (2..=8).contains(&orientation) {
            image.flatten();
            if let Some(datum) = image.metadata_mut().get_mut("exif") {
                exif::set_orientation(&mut datum.blob, 1);
            }
        }
    }

    /// Writes a JPEG file at the configured quality.
    ///
    /// A flattened working copy is encoded, then the metadata segments are
    /// spliced into the stream: comment, chunked ICC profile, and the
    /// remaining tags (`iptc`, `exif`, `xmp`, `jpeg_appN`). An aborting
    /// progress callback leaves no file behind.
    pub fn write(&self, path: impl AsRef<Path>, image: &Image8) -> IoResult<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), w = image.width(), h = image.height(), "jpeg write");

        let mut flat = image.clone();
        flat.flatten();

        let color_type = match flat.channel_types() {
            "k" => jpeg_encoder::ColorType::Luma,
            "rgb" => jpeg_encoder::ColorType::Rgb,
            "bgr" => jpeg_encoder::ColorType::Bgr,
            "YCC" => jpeg_encoder::ColorType::Ycbcr,
            "cmyk" => jpeg_encoder::ColorType::Cmyk,
            "YCCk" => jpeg_encoder::ColorType::CmykAsYcck,
            other => {
                return Err(IoError::Encode(format!(
                    "unrecognized color space '{other}'"
                )))
            }
        };

        // assemble scanlines, honoring per-line abort
        let mut data = Vec::with_capacity(flat.len());
        for y in 0..flat.height() {
            data.extend_from_slice(flat.buffer().row(y));
            if !self.notify(y, flat.height()) {
                return Ok(());
            }
        }

        let mut encoded = Vec::new();
        let encoder = jpeg_encoder::Encoder::new(&mut encoded, self.quality);
        encoder
            .encode(&data, flat.width() as u16, flat.height() as u16, color_type)
            .map_err(|e| IoError::Encode(e.to_string()))?;

        let full = markers::splice_metadata(encoded, flat.metadata())?;
        std::fs::write(path, full)?;

        self.notify(flat.height(), flat.height());
        Ok(())
    }

    /// Reads just the header of a JPEG file.
    ///
    /// When orientation obedience is on and the EXIF orientation is one of
    /// the transposed variants (5..=8), the reported width and height are
    /// swapped. The tag itself is left untouched; only
    /// [`load`](Self::load) normalizes it.
    pub fn inspect(&self, path: impl AsRef<Path>) -> IoResult<Header> {
        let bytes = std::fs::read(path.as_ref())?;

        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(&bytes[..]));
        decoder
            .read_info()
            .map_err(|e| IoError::Decode(e.to_string()))?;
        let info = decoder
            .info()
            .ok_or_else(|| IoError::Decode("missing JPEG info".into()))?;

        let (ncomps, colorspace) = match info.pixel_format {
            jpeg_decoder::PixelFormat::RGB24 => (3, "rgb"),
            jpeg_decoder::PixelFormat::L8 | jpeg_decoder::PixelFormat::L16 => (1, "k"),
            jpeg_decoder::PixelFormat::CMYK32 => (4, "cmyk"),
        };

        let mut header = Header {
            width: info.width as usize,
            height: info.height as usize,
            ncomps,
            colorspace: colorspace.to_string(),
        };

        if self.obey_orientation {
            let mut meta = lapse_core::MetadataMap::new();
            markers::collect_metadata(&bytes, &mut meta)?;
            if let Some(datum) = meta.get("exif") {
                if matches!(exif::orientation(&datum.blob), 5..=8) {
                    std::mem::swap(&mut header.width, &mut header.height);
                }
            }
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::testblob;
    use lapse_core::Metadatum;

    fn gradient(width: usize, height: usize) -> Image8 {
        let mut img = Image8::new();
        img.reshape(width, height).unwrap();
        img.set_channel_types("rgb");
        img.allocate();
        for y in 0..height {
            for x in 0..width {
                let px = img.sample_mut(x, y);
                px[0] = (x * 7 % 256) as u8;
                px[1] = (y * 11 % 256) as u8;
                px[2] = ((x + y) * 3 % 256) as u8;
            }
        }
        img
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("lapse_io_{name}_{}.jpg", std::process::id()))
    }

    #[test]
    fn test_round_trip_dimensions() {
        let img = gradient(32, 24);
        let path = temp_path("roundtrip");

        let io = JpegIo::new();
        io.write(&path, &img).unwrap();
        let loaded = io.load(&path).unwrap();

        assert_eq!((loaded.width(), loaded.height()), (32, 24));
        assert_eq!(loaded.channel_types(), "rgb");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_quality_95_is_close() {
        let img = gradient(16, 16);
        let path = temp_path("quality");

        let io = JpegIo::new();
        io.write(&path, &img).unwrap();
        let loaded = io.load(&path).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                for c in 0..3 {
                    let a = img.sample(x, y)[c] as i32;
                    let b = loaded.sample(x, y)[c] as i32;
                    assert!((a - b).abs() <= 24, "({x},{y})[{c}]: {a} vs {b}");
                }
            }
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut img = gradient(8, 8);
        img.add_metadatum("comment", Metadatum::new(b"sunrise frame".to_vec()));
        img.add_metadatum(
            "iptc",
            Metadatum::with_id(vec![1, 2, 3], "Photoshop 0000"),
        );
        let path = temp_path("meta");

        let mut io = JpegIo::new();
        io.set_obey_orientation(false);
        io.write(&path, &img).unwrap();
        let loaded = io.load(&path).unwrap();

        assert_eq!(loaded.metadatum("comment").unwrap().blob, b"sunrise frame");
        assert_eq!(loaded.metadatum("iptc").unwrap().blob, vec![1, 2, 3]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_orientation_normalized_on_load() {
        // uniform-color quadrant pattern makes the rotation observable
        let mut img = gradient(10, 6);
        img.buffer_mut().for_each_sample_mut(|px| px.fill(0));
        img.sample_mut(0, 0).copy_from_slice(&[250, 250, 250]);

        let path = temp_path("orient");
        {
            let mut io = JpegIo::new();
            io.set_obey_orientation(false);
            io.write(&path, &img).unwrap();
        }

        // splice an EXIF blob with orientation 6 into the written file
        let bytes = std::fs::read(&path).unwrap();
        let mut meta = lapse_core::MetadataMap::new();
        meta.insert(
            "exif",
            Metadatum::with_id(testblob::exif_with(6, (28, 10), (1, 100), 100), "Exif\0\0"),
        );
        let with_exif = markers::splice_metadata(bytes, &meta).unwrap();
        std::fs::write(&path, with_exif).unwrap();

        let io = JpegIo::new();
        let header = io.inspect(&path).unwrap();
        // inspect swaps the reported dimensions for orientation 6
        assert_eq!((header.width, header.height), (6, 10));

        let loaded = io.load(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (6, 10));
        // the bright corner (0,0) of the raw image lands at the top-right
        // after a clockwise quarter turn
        assert!(loaded.sample(5, 0)[0] > 200);
        // the tag was rewritten to 1
        assert_eq!(exif::orientation(&loaded.metadatum("exif").unwrap().blob), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_orientation_ignored_when_disobeying() {
        let img = gradient(10, 6);
        let path = temp_path("noorient");
        {
            let mut io = JpegIo::new();
            io.set_obey_orientation(false);
            io.write(&path, &img).unwrap();
        }
        let bytes = std::fs::read(&path).unwrap();
        let mut meta = lapse_core::MetadataMap::new();
        meta.insert(
            "exif",
            Metadatum::with_id(testblob::exif_with(6, (28, 10), (1, 100), 100), "Exif\0\0"),
        );
        std::fs::write(&path, markers::splice_metadata(bytes, &meta).unwrap()).unwrap();

        let mut io = JpegIo::new();
        io.set_obey_orientation(false);
        let loaded = io.load(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (10, 6));
        assert_eq!(exif::orientation(&loaded.metadatum("exif").unwrap().blob), 6);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_size_hint_denominator() {
        let mut io = JpegIo::new();
        assert_eq!(io.scale_denominator(4000, 3000), 1);

        io.set_size_hint(1000, 750);
        assert_eq!(io.scale_denominator(4000, 3000), 4);
        assert_eq!(io.scale_denominator(1500, 1200), 1);
        // hint larger than the image disables scaling
        assert_eq!(io.scale_denominator(800, 600), 1);

        io.set_size_hint(100, 100);
        assert_eq!(io.scale_denominator(4000, 3000), 8);
    }

    #[test]
    fn test_size_hint_load() {
        let img = gradient(64, 64);
        let path = temp_path("hint");
        let io = JpegIo::new();
        io.write(&path, &img).unwrap();

        let mut io = JpegIo::new();
        io.set_size_hint(16, 16);
        let loaded = io.load(&path).unwrap();
        // never smaller than the hint, always smaller than the original
        assert!(loaded.width() >= 16 && loaded.width() < 64);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_inspect_plain() {
        let img = gradient(20, 10);
        let path = temp_path("inspect");
        let io = JpegIo::new();
        io.write(&path, &img).unwrap();

        let header = io.inspect(&path).unwrap();
        assert_eq!(header.width, 20);
        assert_eq!(header.height, 10);
        assert_eq!(header.ncomps, 3);
        assert_eq!(header.colorspace, "rgb");

        let _ = std::fs::remove_file(&path);
    }
}
