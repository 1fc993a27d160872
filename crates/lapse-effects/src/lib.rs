//! # lapse-effects
//!
//! The keyframable image effects of the lapse pipeline.
//!
//! Each effect is a callable over an 8-bit image plus a property map; the
//! scheduler interpolates the property values per frame and looks effects up
//! by name in an [`EffectRegistry`].
//!
//! # Effects
//!
//! | Name | Purpose |
//! |------|---------|
//! | `exposure` | EV shifts, relative or anchored to the shot's EXIF EV100 |
//! | `whitebalance` | Chromaticity shifts with LMS adaptation and highlight protection |
//! | `cropresize` | Geometric crop plus filtered resize |
//! | `pad` | Letterbox onto a solid background |
//!
//! # Example
//!
//! ```rust,no_run
//! use lapse_core::Image8;
//! use lapse_effects::{EffectRegistry, PropertyMap};
//!
//! let registry = EffectRegistry::builtin();
//! let mut image = Image8::new();
//! let mut props = PropertyMap::new();
//! props.insert("evrel".to_string(), 0.5);
//!
//! registry.get("exposure").unwrap().apply(&mut image, &props, 1).unwrap();
//! ```

#![warn(missing_docs)]

mod cropresize;
mod error;
mod exposure;
mod pad;
mod registry;
mod whitebalance;
mod xyz;

pub use cropresize::CropResizeEffect;
pub use error::{EffectError, EffectResult};
pub use exposure::{multiply_exposure, ExposureEffect};
pub use pad::PadEffect;
pub use registry::{Effect, EffectRegistry, PropertyMap};
pub use whitebalance::WhiteBalanceEffect;
