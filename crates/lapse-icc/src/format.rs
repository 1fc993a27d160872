//! Pixel layout to engine wire-format translation.

use lapse_core::{Channel, Element, Image};
use lcms2::PixelFormat;

use crate::{IccError, IccResult};

/// A pixel layout: numeric element kind plus channel-type string.
///
/// Construction validates the pair against the engine's format table, so a
/// `PixelLayout` always has a wire format. Not every combination is valid;
/// for example XYZ requires at least 16-bit elements and YCCk has no engine
/// format at any depth.
///
/// # Example
///
/// ```rust
/// use lapse_core::Element;
/// use lapse_icc::PixelLayout;
///
/// assert!(PixelLayout::new(Element::U8, "rgb").is_ok());
/// assert!(PixelLayout::new(Element::U8, "XYZ").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    element: Element,
    format: PixelFormat,
}

impl PixelLayout {
    /// Builds a layout, validating the combination.
    ///
    /// # Errors
    ///
    /// Returns [`IccError::UnsupportedColorFormat`] when the pair has no
    /// engine format.
    pub fn new(element: Element, channels: &str) -> IccResult<Self> {
        let format = lcms_format(element, channels)?;
        Ok(Self { element, format })
    }

    /// Derives the layout from an image's element type and channel types.
    pub fn of_image<T: Channel>(image: &Image<T>) -> IccResult<Self> {
        Self::new(T::ELEMENT, image.channel_types())
    }

    /// Returns the numeric element kind.
    pub fn element(&self) -> Element {
        self.element
    }

    /// Returns the engine wire format.
    pub(crate) fn format(&self) -> PixelFormat {
        self.format
    }
}

/// Translates an (element, channel-string) pair to the engine format token.
fn lcms_format(element: Element, channels: &str) -> IccResult<PixelFormat> {
    let unsupported = || IccError::UnsupportedColorFormat {
        element,
        channels: channels.to_string(),
    };

    let format = match element {
        Element::U8 => match channels {
            "k" => PixelFormat::GRAY_8,
            "rgb" => PixelFormat::RGB_8,
            "bgr" => PixelFormat::BGR_8,
            "YCC" => PixelFormat::YCbCr_8,
            "Lab" => PixelFormat::Lab_8,
            "cmyk" => PixelFormat::CMYK_8,
            _ => return Err(unsupported()),
        },
        Element::I16 | Element::U16 => match channels {
            "k" => PixelFormat::GRAY_16,
            "rgb" => PixelFormat::RGB_16,
            "bgr" => PixelFormat::BGR_16,
            "YCC" => PixelFormat::YCbCr_16,
            "Lab" => PixelFormat::Lab_16,
            "XYZ" => PixelFormat::XYZ_16,
            "cmyk" => PixelFormat::CMYK_16,
            _ => return Err(unsupported()),
        },
        Element::F32 => match channels {
            "k" => PixelFormat::GRAY_FLT,
            "rgb" => PixelFormat::RGB_FLT,
            "Lab" => PixelFormat::Lab_FLT,
            "XYZ" => PixelFormat::XYZ_FLT,
            "cmyk" => PixelFormat::CMYK_FLT,
            _ => return Err(unsupported()),
        },
        Element::F64 => match channels {
            "k" => PixelFormat::GRAY_DBL,
            "rgb" => PixelFormat::RGB_DBL,
            "Lab" => PixelFormat::Lab_DBL,
            "XYZ" => PixelFormat::XYZ_DBL,
            "cmyk" => PixelFormat::CMYK_DBL,
            _ => return Err(unsupported()),
        },
    };

    Ok(format)
}
