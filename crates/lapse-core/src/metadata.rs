//! Copy-on-write metadata storage.
//!
//! Images carry a map from small tag strings (`exif`, `icc`, `iptc`, `xmp`,
//! `comment`, `jpeg_appN`) to opaque blobs. The map itself is copy-on-write:
//! shallow copies share the contents, so attaching the same metadata to every
//! derived image (crops, resize results) is cheap.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{CoreError, CoreResult};

/// One item of metadata: an id string plus a structureless blob.
///
/// The id can be empty. For some file types, such as JPEG, the id is part of
/// the metadata as stored in the file (for example the `ICC_PROFILE\0` chunk
/// prefix or the `Exif\0\0` header).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadatum {
    /// String identifier stored alongside the blob.
    pub id: String,
    /// The data itself.
    pub blob: Vec<u8>,
}

impl Metadatum {
    /// Creates a metadatum with an empty id.
    pub fn new(blob: Vec<u8>) -> Self {
        Self { id: String::new(), blob }
    }

    /// Creates a metadatum with an id string.
    pub fn with_id(blob: Vec<u8>, id: impl Into<String>) -> Self {
        Self { id: id.into(), blob }
    }
}

/// Copy-on-write map from tag names to metadata blobs.
///
/// Cloning shares the contents; mutation clones them first when shared.
///
/// # Example
///
/// ```rust
/// use lapse_core::{MetadataMap, Metadatum};
///
/// let mut meta = MetadataMap::new();
/// meta.append("icc", Metadatum::with_id(vec![1, 2], "ICC_PROFILE\0")).unwrap();
/// meta.append("icc", Metadatum::with_id(vec![3], "ICC_PROFILE\0")).unwrap();
/// assert_eq!(meta.get("icc").unwrap().blob, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    contents: Arc<BTreeMap<String, Metadatum>>,
}

impl MetadataMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Returns `true` if this map does not share contents with any other.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.contents) == 1
    }

    /// Clones the contents into a private allocation when shared.
    pub fn make_unique(&mut self) {
        let _ = Arc::make_mut(&mut self.contents);
    }

    /// Inserts a metadatum, replacing any existing entry for the tag.
    pub fn insert(&mut self, tag: impl Into<String>, datum: Metadatum) {
        Arc::make_mut(&mut self.contents).insert(tag.into(), datum);
    }

    /// Appends a metadatum to a tag.
    ///
    /// If the tag is absent the datum is inserted as-is. If present, the id
    /// strings must match and the blobs are concatenated. This is what makes
    /// multi-segment metadata (chunked ICC profiles, long JPEG comments)
    /// reassemble correctly regardless of how the file split them.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MetadataIdMismatch`] when the tag exists with a
    /// different id string.
    pub fn append(&mut self, tag: impl Into<String>, datum: Metadatum) -> CoreResult<()> {
        let tag = tag.into();
        let contents = Arc::make_mut(&mut self.contents);
        match contents.get_mut(&tag) {
            None => {
                contents.insert(tag, datum);
            }
            Some(existing) => {
                if existing.id != datum.id {
                    return Err(CoreError::MetadataIdMismatch {
                        tag,
                        existing: existing.id.clone(),
                        incoming: datum.id,
                    });
                }
                existing.blob.extend_from_slice(&datum.blob);
            }
        }
        Ok(())
    }

    /// Looks up a metadatum by tag.
    pub fn get(&self, tag: &str) -> Option<&Metadatum> {
        self.contents.get(tag)
    }

    /// Looks up a metadatum mutably, cloning shared contents first.
    pub fn get_mut(&mut self, tag: &str) -> Option<&mut Metadatum> {
        Arc::make_mut(&mut self.contents).get_mut(tag)
    }

    /// Returns `true` if the tag is present.
    pub fn has(&self, tag: &str) -> bool {
        self.contents.contains_key(tag)
    }

    /// Removes a metadatum.
    pub fn remove(&mut self, tag: &str) -> Option<Metadatum> {
        Arc::make_mut(&mut self.contents).remove(tag)
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        Arc::make_mut(&mut self.contents).clear();
    }

    /// Iterates over `(tag, metadatum)` entries in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Metadatum)> {
        self.contents.iter()
    }
}
