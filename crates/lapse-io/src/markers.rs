//! Byte-level JPEG segment scanning and splicing.
//!
//! The codec crates handle entropy-coded pixel data; everything living in
//! marker segments (comments, ICC profiles, IPTC, EXIF, XMP) is parsed and
//! emitted here. Reading walks the raw segment stream and routes each
//! recognized payload into a [`MetadataMap`]; writing splices freshly built
//! segments into an encoded stream, including the multi-chunk ICC format.

use lapse_core::{MetadataMap, Metadatum};

use crate::{IoError, IoResult};

/// Marker byte for COM segments.
pub const COM: u8 = 0xFE;
/// Marker byte for APP0 (JFIF).
pub const APP0: u8 = 0xE0;
/// Marker byte for APP1 (EXIF, XMP).
pub const APP1: u8 = 0xE1;
/// Marker byte for APP2 (ICC profiles).
pub const APP2: u8 = 0xE2;
/// Marker byte for APP13 (Photoshop / IPTC).
pub const APP13: u8 = 0xED;

/// Maximum payload of one segment (the two length bytes count toward the
/// 65535 segment limit).
const MAX_SEGMENT: usize = 65533;

/// One marker segment: the marker byte and its payload (length bytes
/// excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Marker byte (for example 0xE1 for APP1).
    pub marker: u8,
    /// Segment payload without the two length bytes.
    pub payload: &'a [u8],
}

/// Walks the segment stream of a JPEG file up to the start of scan data.
///
/// Returns an empty list when the SOI magic is absent. Truncated segments
/// terminate the walk.
pub fn scan(data: &[u8]) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return segments;
    }

    let mut pos = 2usize;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        if pos >= data.len() {
            break;
        }

        let marker = data[pos];
        pos += 1;

        // EOI / SOS end the metadata region
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        // standalone markers carry no length
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            continue;
        }

        if pos + 2 > data.len() {
            break;
        }
        let seg_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += 2;
        if seg_len < 2 || pos + seg_len - 2 > data.len() {
            break;
        }
        segments.push(Segment {
            marker,
            payload: &data[pos..pos + seg_len - 2],
        });
        pos += seg_len - 2;
    }

    segments
}

/// Scans a JPEG byte stream and appends all recognized metadata segments
/// into `meta`.
///
/// Routing:
///
/// - COM segments concatenate under `comment`
/// - APP2 with the `ICC_PROFILE\0` magic append under `icc` (chunk headers
///   stripped, id preserved), reassembling multi-segment profiles
/// - APP13 with the `Photoshop ` prefix append under `iptc` with the 4-byte
///   version folded into the id
/// - APP1 starting with `exif` (case-insensitive) strips the 6-byte header
///   into the id and appends under `exif`; APP1 starting with `http`
///   appends under `xmp` with the NUL-terminated namespace URI as id;
///   anything else lands under `jpeg_app1`
/// - remaining APPn segments land under `jpeg_appN`
///
/// Segments too short for their magic are skipped silently.
///
/// # Errors
///
/// Propagates [`lapse_core::CoreError::MetadataIdMismatch`] when appended
/// segments disagree on their id string; this is fatal to the load.
pub fn collect_metadata(data: &[u8], meta: &mut MetadataMap) -> IoResult<()> {
    for segment in scan(data) {
        match segment.marker {
            COM => {
                meta.append("comment", Metadatum::new(segment.payload.to_vec()))?;
            }
            APP2 => read_icc(segment.payload, meta)?,
            APP13 => read_iptc(segment.payload, meta)?,
            m if (APP0..=0xEF).contains(&m) && m != APP0 => {
                read_app(m, segment.payload, meta)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_icc(payload: &[u8], meta: &mut MetadataMap) -> IoResult<()> {
    // too short to contain anything interesting
    if payload.len() <= 14 {
        return Ok(());
    }
    // the magic is "ICC_PROFILE" plus a NUL, 12 bytes total
    if payload[11] != 0 || &payload[..11] != b"ICC_PROFILE" {
        return Ok(());
    }
    let id = String::from_utf8_lossy(&payload[..12]).into_owned();
    // skip current chunk index and total chunk count
    meta.append("icc", Metadatum::with_id(payload[14..].to_vec(), id))?;
    Ok(())
}

fn read_iptc(payload: &[u8], meta: &mut MetadataMap) -> IoResult<()> {
    if payload.len() <= 14 {
        return Ok(());
    }
    if &payload[..10] != b"Photoshop " {
        return Ok(());
    }
    // the id keeps the magic word plus the 4-byte version
    let id = String::from_utf8_lossy(&payload[..14]).into_owned();
    meta.append("iptc", Metadatum::with_id(payload[14..].to_vec(), id))?;
    Ok(())
}

fn read_app(marker: u8, payload: &[u8], meta: &mut MetadataMap) -> IoResult<()> {
    if marker == APP1 && payload.len() >= 4 && payload[..4].eq_ignore_ascii_case(b"exif") {
        if payload.len() >= 6 {
            let id = String::from_utf8_lossy(&payload[..6]).into_owned();
            meta.append("exif", Metadatum::with_id(payload[6..].to_vec(), id))?;
        }
        return Ok(());
    }
    if marker == APP1 && payload.len() >= 5 && payload[..5].eq_ignore_ascii_case(b"http:") {
        if let Some(nul) = payload.iter().position(|&b| b == 0) {
            let id = String::from_utf8_lossy(&payload[..=nul]).into_owned();
            meta.append("xmp", Metadatum::with_id(payload[nul + 1..].to_vec(), id))?;
            return Ok(());
        }
    }
    let tag = format!("jpeg_app{}", marker - APP0);
    meta.append(tag, Metadatum::new(payload.to_vec()))?;
    Ok(())
}

/// Appends one marker segment to `out`.
fn push_segment(out: &mut Vec<u8>, marker: u8, parts: &[&[u8]]) {
    let payload_len: usize = parts.iter().map(|p| p.len()).sum();
    debug_assert!(payload_len <= MAX_SEGMENT);
    out.push(0xFF);
    out.push(marker);
    out.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    for part in parts {
        out.extend_from_slice(part);
    }
}

/// Builds the ICC APP2 chunk sequence for a profile blob.
///
/// Each chunk is prefixed with the id string and the 1-indexed pair
/// (chunk number, chunk count); the payload per chunk is capped at
/// `65533 - id_len - 2` bytes.
fn push_icc(out: &mut Vec<u8>, datum: &Metadatum) {
    if datum.blob.is_empty() {
        return;
    }
    let id = datum.id.as_bytes();
    let chunk_len = MAX_SEGMENT - id.len() - 2;
    let n_chunks = (datum.blob.len() - 1) / chunk_len + 1;

    for (i, chunk) in datum.blob.chunks(chunk_len).enumerate() {
        let counters = [(i + 1) as u8, n_chunks as u8];
        push_segment(out, APP2, &[id, &counters, chunk]);
    }
}

/// Builds segments for a non-ICC metadatum under the given marker.
fn push_app(out: &mut Vec<u8>, marker: u8, datum: &Metadatum) {
    let id = datum.id.as_bytes();
    let chunk_len = MAX_SEGMENT - id.len();
    for chunk in datum.blob.chunks(chunk_len.max(1)) {
        if id.is_empty() {
            push_segment(out, marker, &[chunk]);
        } else {
            push_segment(out, marker, &[id, chunk]);
        }
    }
}

/// Maps a metadata tag to its output marker. Unrecognized tags are skipped.
fn marker_for_tag(tag: &str) -> Option<u8> {
    match tag {
        "iptc" => Some(APP13),
        "exif" => Some(APP1),
        "xmp" => Some(APP1),
        "icc" => Some(APP2),
        _ => tag
            .strip_prefix("jpeg_app")
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n < 16)
            .map(|n| APP0 + n),
    }
}

/// Splices metadata segments into an encoded JPEG stream.
///
/// The segments are inserted after the SOI marker and any leading APP0
/// (JFIF) segments the encoder produced: first the comment, then the ICC
/// profile in its chunked format, then all remaining metadata by tag.
pub fn splice_metadata(encoded: Vec<u8>, meta: &MetadataMap) -> IoResult<Vec<u8>> {
    if encoded.len() < 2 || encoded[0] != 0xFF || encoded[1] != 0xD8 {
        return Err(IoError::Encode("encoder produced no SOI marker".into()));
    }

    // insertion point: after SOI and any leading JFIF segment
    let mut insert_at = 2usize;
    while insert_at + 4 <= encoded.len()
        && encoded[insert_at] == 0xFF
        && encoded[insert_at + 1] == APP0
    {
        let len = u16::from_be_bytes([encoded[insert_at + 2], encoded[insert_at + 3]]) as usize;
        insert_at += 2 + len;
    }

    let mut extra = Vec::new();
    if let Some(comment) = meta.get("comment") {
        for chunk in comment.blob.chunks(MAX_SEGMENT) {
            push_segment(&mut extra, COM, &[chunk]);
        }
    }
    if let Some(icc) = meta.get("icc") {
        push_icc(&mut extra, icc);
    }
    for (tag, datum) in meta.iter() {
        if tag == "icc" || tag == "comment" {
            continue;
        }
        if let Some(marker) = marker_for_tag(tag) {
            push_app(&mut extra, marker, datum);
        }
    }

    let mut result = Vec::with_capacity(encoded.len() + extra.len());
    result.extend_from_slice(&encoded[..insert_at]);
    result.extend_from_slice(&extra);
    result.extend_from_slice(&encoded[insert_at..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal JPEG shell: SOI + provided segments + SOS stub + EOI.
    fn jpeg_shell(segments: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        for (marker, payload) in segments {
            push_segment(&mut data, *marker, &[payload]);
        }
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_scan_basic() {
        let data = jpeg_shell(&[(COM, b"hello".to_vec())]);
        let segments = scan(&data);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].marker, COM);
        assert_eq!(segments[0].payload, b"hello");
    }

    #[test]
    fn test_scan_stops_at_sos() {
        let mut data = jpeg_shell(&[(COM, b"a".to_vec())]);
        // bytes after SOS must not be interpreted as segments
        data.extend_from_slice(&[0xFF, COM, 0x00, 0x03, 0x62]);
        let segments = scan(&data);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_comment_multi_segment() {
        let data = jpeg_shell(&[(COM, b"hello ".to_vec()), (COM, b"world".to_vec())]);
        let mut meta = MetadataMap::new();
        collect_metadata(&data, &mut meta).unwrap();
        assert_eq!(meta.get("comment").unwrap().blob, b"hello world");
    }

    #[test]
    fn test_icc_reassembly() {
        let mut id = b"ICC_PROFILE\0".to_vec();
        id.push(1); // chunk 1
        id.push(2); // of 2
        let mut seg1 = id.clone();
        seg1.extend_from_slice(&[10, 11, 12]);
        let mut seg2 = b"ICC_PROFILE\0".to_vec();
        seg2.extend_from_slice(&[2, 2, 13, 14]);

        // pad segment payloads past the 14-byte minimum
        seg1.extend_from_slice(&[0; 12]);
        seg2.extend_from_slice(&[0; 12]);

        let data = jpeg_shell(&[(APP2, seg1), (APP2, seg2)]);
        let mut meta = MetadataMap::new();
        collect_metadata(&data, &mut meta).unwrap();
        let icc = meta.get("icc").unwrap();
        assert_eq!(icc.id, "ICC_PROFILE\0");
        assert_eq!(&icc.blob[..3], &[10, 11, 12]);
    }

    #[test]
    fn test_exif_header_stripped() {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(b"II*\0rest");
        let data = jpeg_shell(&[(APP1, payload)]);
        let mut meta = MetadataMap::new();
        collect_metadata(&data, &mut meta).unwrap();
        let exif = meta.get("exif").unwrap();
        assert_eq!(exif.id, "Exif\0\0");
        assert_eq!(&exif.blob[..4], b"II*\0");
    }

    #[test]
    fn test_xmp_namespace_id() {
        let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
        payload.extend_from_slice(b"<xml/>");
        let data = jpeg_shell(&[(APP1, payload)]);
        let mut meta = MetadataMap::new();
        collect_metadata(&data, &mut meta).unwrap();
        let xmp = meta.get("xmp").unwrap();
        assert_eq!(xmp.id, "http://ns.adobe.com/xap/1.0/\0");
        assert_eq!(xmp.blob, b"<xml/>");
    }

    #[test]
    fn test_unrecognized_app1_kept_raw() {
        let data = jpeg_shell(&[(APP1, b"something else".to_vec())]);
        let mut meta = MetadataMap::new();
        collect_metadata(&data, &mut meta).unwrap();
        assert!(meta.has("jpeg_app1"));
    }

    #[test]
    fn test_appn_tag_naming() {
        let data = jpeg_shell(&[(0xE5, b"five".to_vec())]);
        let mut meta = MetadataMap::new();
        collect_metadata(&data, &mut meta).unwrap();
        assert_eq!(meta.get("jpeg_app5").unwrap().blob, b"five");
    }

    #[test]
    fn test_splice_round_trip() {
        let mut meta = MetadataMap::new();
        meta.insert("comment", Metadatum::new(b"shot at dawn".to_vec()));
        // a blob bigger than one chunk to force multi-segment ICC output
        let profile: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
        meta.insert("icc", Metadatum::with_id(profile.clone(), "ICC_PROFILE\0"));
        meta.insert("iptc", Metadatum::with_id(vec![9, 9], "Photoshop 0000"));

        let encoded = jpeg_shell(&[]);
        let written = splice_metadata(encoded, &meta).unwrap();

        let mut back = MetadataMap::new();
        collect_metadata(&written, &mut back).unwrap();
        assert_eq!(back.get("comment").unwrap().blob, b"shot at dawn");
        assert_eq!(back.get("icc").unwrap().blob, profile);
        assert_eq!(back.get("iptc").unwrap().blob, vec![9, 9]);
        assert_eq!(back.get("iptc").unwrap().id, "Photoshop 0000");
    }

    #[test]
    fn test_splice_after_jfif() {
        let jfif = b"JFIF\0\x01\x02\0\0\x01\0\x01\0\0".to_vec();
        let encoded = jpeg_shell(&[(APP0, jfif)]);
        let mut meta = MetadataMap::new();
        meta.insert("comment", Metadatum::new(b"x".to_vec()));
        let written = splice_metadata(encoded, &meta).unwrap();

        let segments = scan(&written);
        assert_eq!(segments[0].marker, APP0);
        assert_eq!(segments[1].marker, COM);
    }

    #[test]
    fn test_icc_chunk_granularity_is_invisible() {
        // splitting at write time then re-reading yields the original blob
        let blob: Vec<u8> = (0..200_000u32).map(|i| (i / 3) as u8).collect();
        let mut meta = MetadataMap::new();
        meta.insert("icc", Metadatum::with_id(blob.clone(), "ICC_PROFILE\0"));
        let written = splice_metadata(jpeg_shell(&[]), &meta).unwrap();

        // every APP2 payload respects the segment ceiling
        for segment in scan(&written) {
            assert!(segment.payload.len() <= MAX_SEGMENT);
        }

        let mut back = MetadataMap::new();
        collect_metadata(&written, &mut back).unwrap();
        assert_eq!(back.get("icc").unwrap().blob, blob);
    }
}
