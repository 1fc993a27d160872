//! The slice of EXIF this pipeline needs.
//!
//! EXIF blobs are TIFF streams: a byte-order header, then chains of IFDs
//! holding 12-byte tag entries. This module reads and rewrites the
//! orientation tag (0x0112) in IFD0 and extracts the three exposure fields
//! behind the EV100 computation (FNumber, ExposureTime, ISOSpeedRatings)
//! from the Exif sub-IFD. Values are decoded in whichever byte order the
//! blob declares.

use lapse_core::Image8;

use crate::{IoError, IoResult};

/// TIFF byte order declared by an EXIF blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `II` - little endian (Intel).
    Little,
    /// `MM` - big endian (Motorola).
    Big,
}

/// EXIF orientation tag id.
const TAG_ORIENTATION: u16 = 0x0112;
/// Pointer from IFD0 to the Exif sub-IFD.
const TAG_EXIF_IFD: u16 = 0x8769;
/// Exposure time in seconds (RATIONAL).
const TAG_EXPOSURE_TIME: u16 = 0x829A;
/// F-number (RATIONAL).
const TAG_F_NUMBER: u16 = 0x829D;
/// ISO speed (SHORT).
const TAG_ISO: u16 = 0x8827;

/// Detects the byte order from the TIFF header.
///
/// Returns `None` when the blob is too short or the order bytes disagree.
pub fn byte_order(blob: &[u8]) -> Option<ByteOrder> {
    if blob.len() < 8 || blob[0] != blob[1] {
        return None;
    }
    match blob[0] {
        0x49 => Some(ByteOrder::Little),
        0x4D => Some(ByteOrder::Big),
        _ => None,
    }
}

fn read_u16(blob: &[u8], pos: usize, bo: ByteOrder) -> Option<u16> {
    let bytes: [u8; 2] = blob.get(pos..pos + 2)?.try_into().ok()?;
    Some(match bo {
        ByteOrder::Little => u16::from_le_bytes(bytes),
        ByteOrder::Big => u16::from_be_bytes(bytes),
    })
}

fn read_u32(blob: &[u8], pos: usize, bo: ByteOrder) -> Option<u32> {
    let bytes: [u8; 4] = blob.get(pos..pos + 4)?.try_into().ok()?;
    Some(match bo {
        ByteOrder::Little => u32::from_le_bytes(bytes),
        ByteOrder::Big => u32::from_be_bytes(bytes),
    })
}

fn write_u16(blob: &mut [u8], pos: usize, bo: ByteOrder, value: u16) {
    let bytes = match bo {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    };
    blob[pos..pos + 2].copy_from_slice(&bytes);
}

/// One parsed IFD entry.
struct Entry {
    kind: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field within the blob.
    value_pos: usize,
}

/// Finds a tag in the IFD starting at `ifd_offset`.
fn find_entry(blob: &[u8], bo: ByteOrder, ifd_offset: usize, tag: u16) -> Option<Entry> {
    let n = read_u16(blob, ifd_offset, bo)? as usize;
    let entries = ifd_offset.checked_add(2)?;
    if blob.len() < entries.checked_add(12 * n)? {
        return None;
    }
    for i in 0..n {
        let p = entries + 12 * i;
        if read_u16(blob, p, bo)? == tag {
            return Some(Entry {
                kind: read_u16(blob, p + 2, bo)?,
                count: read_u32(blob, p + 4, bo)?,
                value_pos: p + 8,
            });
        }
    }
    None
}

/// Offset of IFD0, from the TIFF header.
fn ifd0_offset(blob: &[u8], bo: ByteOrder) -> Option<usize> {
    let offset = read_u32(blob, 4, bo)? as usize;
    if blob.len() < offset + 2 {
        return None;
    }
    Some(offset)
}

/// Locates the 2-byte orientation value field in IFD0.
///
/// The entry must have type 3 (SHORT) and exactly one component; anything
/// else is treated as no orientation information.
fn orientation_value_pos(blob: &[u8], bo: ByteOrder) -> Option<usize> {
    let ifd = ifd0_offset(blob, bo)?;
    let entry = find_entry(blob, bo, ifd, TAG_ORIENTATION)?;
    if entry.kind != 3 || entry.count != 1 {
        return None;
    }
    Some(entry.value_pos)
}

/// Reads the EXIF orientation (1..=8) from a blob.
///
/// Returns 1 (normal) when the blob carries no usable orientation tag.
pub fn orientation(blob: &[u8]) -> u16 {
    let Some(bo) = byte_order(blob) else { return 1 };
    match orientation_value_pos(blob, bo) {
        Some(pos) => read_u16(blob, pos, bo).unwrap_or(1),
        None => 1,
    }
}

/// Rewrites the orientation tag in place, in the blob's own byte order.
///
/// No-op when the blob carries no usable orientation tag.
pub fn set_orientation(blob: &mut [u8], value: u16) {
    let Some(bo) = byte_order(blob) else { return };
    if let Some(pos) = orientation_value_pos(blob, bo) {
        write_u16(blob, pos, bo, value);
    }
}

/// Reads a RATIONAL value (numerator / denominator, both u32 at an offset).
fn rational(blob: &[u8], bo: ByteOrder, entry: &Entry) -> Option<f64> {
    if entry.kind != 5 || entry.count == 0 {
        return None;
    }
    let offset = read_u32(blob, entry.value_pos, bo)? as usize;
    let num = read_u32(blob, offset, bo)?;
    let den = read_u32(blob, offset + 4, bo)?;
    if den == 0 {
        return None;
    }
    Some(num as f64 / den as f64)
}

/// Reads the first SHORT value of an entry (stored inline).
fn short(blob: &[u8], bo: ByteOrder, entry: &Entry) -> Option<u16> {
    if entry.kind != 3 || entry.count == 0 {
        return None;
    }
    read_u16(blob, entry.value_pos, bo)
}

/// Camera exposure properties read from an image's EXIF blob.
///
/// # Example
///
/// ```rust,no_run
/// use lapse_core::Image8;
/// use lapse_io::exif::ExifProperties;
///
/// # let image: Image8 = Image8::new();
/// let props = ExifProperties::from_image(&image).unwrap();
/// let ev = props.ev100().unwrap();
/// ```
pub struct ExifProperties<'a> {
    blob: &'a [u8],
    bo: ByteOrder,
}

impl<'a> ExifProperties<'a> {
    /// Binds to the `exif` metadatum of an image.
    ///
    /// # Errors
    ///
    /// [`IoError::MissingExifField`] when no EXIF blob is attached,
    /// [`IoError::Format`] when the TIFF header is unreadable.
    pub fn from_image(image: &'a Image8) -> IoResult<Self> {
        let blob = &image
            .metadatum("exif")
            .ok_or(IoError::MissingExifField("exif"))?
            .blob;
        let bo = byte_order(blob).ok_or_else(|| {
            IoError::Format("EXIF blob has no readable TIFF header".into())
        })?;
        Ok(Self { blob, bo })
    }

    /// Looks up a tag in the Exif sub-IFD.
    fn exif_field(&self, tag: u16) -> Option<Entry> {
        let ifd0 = ifd0_offset(self.blob, self.bo)?;
        let pointer = find_entry(self.blob, self.bo, ifd0, TAG_EXIF_IFD)?;
        if pointer.kind != 4 || pointer.count != 1 {
            return None;
        }
        let sub = read_u32(self.blob, pointer.value_pos, self.bo)? as usize;
        if self.blob.len() < sub + 2 {
            return None;
        }
        find_entry(self.blob, self.bo, sub, tag)
    }

    /// F-number of the shot.
    pub fn f_number(&self) -> IoResult<f64> {
        self.exif_field(TAG_F_NUMBER)
            .and_then(|e| rational(self.blob, self.bo, &e))
            .ok_or(IoError::MissingExifField("FNumber"))
    }

    /// Exposure time in seconds.
    pub fn exposure_time(&self) -> IoResult<f64> {
        self.exif_field(TAG_EXPOSURE_TIME)
            .and_then(|e| rational(self.blob, self.bo, &e))
            .ok_or(IoError::MissingExifField("ExposureTime"))
    }

    /// ISO speed rating.
    pub fn iso(&self) -> IoResult<f64> {
        self.exif_field(TAG_ISO)
            .and_then(|e| short(self.blob, self.bo, &e))
            .map(f64::from)
            .ok_or(IoError::MissingExifField("ISOSpeedRatings"))
    }

    /// Exposure value at ISO 100: `Av + Tv - Sv` with
    /// `Av = log2(N^2)`, `Tv = -log2(t)`, `Sv = log2(ISO / 100)`.
    pub fn ev100(&self) -> IoResult<f64> {
        let n = self.f_number()?;
        let t = self.exposure_time()?;
        let iso = self.iso()?;

        let av = (n * n).log2();
        let tv = -t.log2();
        let sv = (iso / 100.0).log2();
        Ok(av + tv - sv)
    }
}
