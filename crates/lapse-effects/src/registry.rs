//! Effect trait and the name-to-effect registry.

use std::collections::BTreeMap;

use lapse_core::Image8;

use crate::{
    CropResizeEffect, EffectError, EffectResult, ExposureEffect, PadEffect, WhiteBalanceEffect,
};

/// Property values an effect receives for one frame.
///
/// Absent keys take the effect's documented defaults; booleans are encoded
/// as numbers with `>= 0.5` meaning true.
pub type PropertyMap = BTreeMap<String, f64>;

/// An image effect, applied in place.
pub trait Effect: Send + Sync {
    /// Applies the effect with the given per-frame properties.
    ///
    /// `verbosity` gates the effect's diagnostic logging; levels at or
    /// above 2 describe the concrete parameters in use.
    fn apply(&self, image: &mut Image8, props: &PropertyMap, verbosity: i32) -> EffectResult<()>;
}

/// Keyed table of all available effects.
///
/// Built once before frames are scheduled and passed by reference through
/// the pipeline; it is never mutated during frame processing.
///
/// # Example
///
/// ```rust
/// use lapse_effects::EffectRegistry;
///
/// let registry = EffectRegistry::builtin();
/// assert!(registry.get("exposure").is_ok());
/// assert!(registry.get("vignette").is_err());
/// ```
pub struct EffectRegistry {
    effects: BTreeMap<&'static str, Box<dyn Effect>>,
}

impl EffectRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            effects: BTreeMap::new(),
        }
    }

    /// Creates the registry with all built-in effects.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.add("exposure", Box::new(ExposureEffect));
        registry.add("whitebalance", Box::new(WhiteBalanceEffect::new()));
        registry.add("cropresize", Box::new(CropResizeEffect));
        registry.add("pad", Box::new(PadEffect));
        registry
    }

    /// Registers an effect under a name.
    pub fn add(&mut self, name: &'static str, effect: Box<dyn Effect>) {
        self.effects.insert(name, effect);
    }

    /// Looks up an effect by name.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::UnknownEffect`] for unregistered names.
    pub fn get(&self, name: &str) -> EffectResult<&dyn Effect> {
        self.effects
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| EffectError::UnknownEffect(name.to_string()))
    }

    /// Lists the registered effect names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.effects.keys().copied()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
