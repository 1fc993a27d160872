//! ICC profile wrapper.

use std::path::Path;

use lcms2::Profile as LcmsProfile;

use crate::{IccError, IccResult, Transform};

/// An ICC color profile.
///
/// Wraps an engine profile handle. Profiles can be loaded from `.icc` files,
/// created from raw embedded bytes (as extracted from a JPEG APP2 marker),
/// generated from built-ins, or computed from an existing transform as a
/// device link. The handle is released when the profile is dropped.
///
/// # Example
///
/// ```rust
/// use lapse_icc::Profile;
///
/// let srgb = Profile::srgb();
/// let bytes = srgb.to_bytes().unwrap();
/// let reloaded = Profile::from_memory(&bytes).unwrap();
/// ```
pub struct Profile {
    pub(crate) inner: LcmsProfile,
}

impl Profile {
    /// Loads a profile from an ICC file.
    ///
    /// # Errors
    ///
    /// Returns [`IccError::LoadFailed`] if the file cannot be read or does
    /// not contain a valid profile.
    pub fn from_file(path: &Path) -> IccResult<Self> {
        let inner = LcmsProfile::new_file(path)
            .map_err(|e| IccError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        Ok(Self { inner })
    }

    /// Creates a profile from raw ICC bytes.
    ///
    /// This is the entry point for profiles embedded in image files.
    ///
    /// # Errors
    ///
    /// Returns [`IccError::InvalidProfile`] on malformed data.
    pub fn from_memory(data: &[u8]) -> IccResult<Self> {
        let inner =
            LcmsProfile::new_icc(data).map_err(|e| IccError::InvalidProfile(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Creates the standard IEC 61966-2-1 sRGB profile.
    pub fn srgb() -> Self {
        Self {
            inner: LcmsProfile::new_srgb(),
        }
    }

    /// Creates the CIE XYZ profile (D50 adapted).
    pub fn xyz() -> Self {
        Self {
            inner: LcmsProfile::new_xyz(),
        }
    }

    /// Creates the null profile (discards all color information).
    pub fn null_profile() -> Self {
        Self {
            inner: LcmsProfile::new_null(),
        }
    }

    /// Creates a built-in profile by name.
    ///
    /// Recognized names: `sRGB`, `XYZ`, `null`.
    ///
    /// # Errors
    ///
    /// Returns [`IccError::CreateFailed`] for unknown names.
    pub fn from_builtin(name: &str) -> IccResult<Self> {
        match name {
            "sRGB" => Ok(Self::srgb()),
            "XYZ" => Ok(Self::xyz()),
            "null" => Ok(Self::null_profile()),
            other => Err(IccError::CreateFailed(format!(
                "unrecognized built-in profile: {other}"
            ))),
        }
    }

    /// Creates a device-link profile from a transform.
    ///
    /// A device link encapsulates the composed multi-stage transform between
    /// two device spaces in a single profile. Use version 3.4 for
    /// compatibility with older software; 4.2 is the current format.
    /// `keep_sequence` preserves the description of the original profiles at
    /// the cost of profile size.
    pub fn device_link<I, O>(
        transform: &Transform<I, O>,
        version: f64,
        keep_sequence: bool,
    ) -> IccResult<Self>
    where
        I: Copy + Clone + lcms2::Pod,
        O: Copy + Clone + lcms2::Pod,
    {
        let flags = if keep_sequence {
            lcms2::Flags::KEEP_SEQUENCE
        } else {
            lcms2::Flags::default()
        };
        let inner = LcmsProfile::new_device_link(&transform.inner, version, flags)
            .map_err(|e| IccError::CreateFailed(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Serializes the profile to ICC bytes.
    pub fn to_bytes(&self) -> IccResult<Vec<u8>> {
        self.inner
            .icc()
            .map_err(|e| IccError::CreateFailed(e.to_string()))
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        assert!(Profile::from_builtin("sRGB").is_ok());
        assert!(Profile::from_builtin("XYZ").is_ok());
        assert!(Profile::from_builtin("null").is_ok());
        assert!(Profile::from_builtin("AdobeRGB").is_err());
    }

    #[test]
    fn test_memory_round_trip() {
        let srgb = Profile::srgb();
        let bytes = srgb.to_bytes().unwrap();
        assert!(!bytes.is_empty());
        assert!(Profile::from_memory(&bytes).is_ok());
    }

    #[test]
    fn test_invalid_memory() {
        assert!(Profile::from_memory(&[0u8; 16]).is_err());
    }
}
