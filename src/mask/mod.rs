//! Reversible raw <-> display transforms for masked inputs.
//!
//! A field either names a preset held by a [`MaskRegistry`] or carries an
//! inline [`MaskPreset`]. `format` and `parse` never fail on user input; only
//! resolving an unregistered preset name does.

mod presets;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

pub use presets::{
    CREDIT_CARD, DATE, PHONE, POSTAL_CODE, credit_card_preset, date_preset, phone_preset,
    postal_code_preset,
};

pub type MaskFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MaskError {
    #[error("unknown mask preset `{0}`")]
    UnknownPreset(String),
}

#[derive(Clone)]
pub struct MaskPreset {
    format: MaskFn,
    parse: MaskFn,
    placeholder: Option<Cow<'static, str>>,
    max_length: Option<usize>,
    max_raw_length: Option<usize>,
}

impl MaskPreset {
    pub fn new(
        format: impl Fn(&str) -> String + Send + Sync + 'static,
        parse: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            format: Arc::new(format),
            parse: Arc::new(parse),
            placeholder: None,
            max_length: None,
            max_raw_length: None,
        }
    }

    pub fn placeholder(mut self, value: impl Into<Cow<'static, str>>) -> Self {
        self.placeholder = Some(value.into());
        self
    }

    /// Cap on the displayed string, used as the input's `maxlength`.
    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    pub fn max_raw_length(mut self, value: usize) -> Self {
        self.max_raw_length = Some(value);
        self
    }

    pub fn format(&self, raw: &str) -> String {
        (self.format)(raw)
    }

    pub fn parse(&self, display: &str) -> String {
        (self.parse)(display)
    }

    pub fn placeholder_text(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn display_max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn raw_max_length(&self) -> Option<usize> {
        self.max_raw_length
    }
}

impl Debug for MaskPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskPreset")
            .field("placeholder", &self.placeholder)
            .field("max_length", &self.max_length)
            .field("max_raw_length", &self.max_raw_length)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum Mask {
    Preset(Cow<'static, str>),
    Custom(MaskPreset),
}

impl Mask {
    pub fn preset(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Preset(name.into())
    }

    pub fn custom(preset: MaskPreset) -> Self {
        Self::Custom(preset)
    }
}

/// Config files can only name presets; inline transforms are code-only.
impl<'de> Deserialize<'de> for Mask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::Preset(Cow::Owned(name)))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MaskRegistry {
    presets: HashMap<String, MaskPreset>,
}

impl MaskRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtin_presets() -> Self {
        let mut registry = Self::empty();
        registry.register(PHONE, phone_preset());
        registry.register(CREDIT_CARD, credit_card_preset());
        registry.register(POSTAL_CODE, postal_code_preset());
        registry.register(DATE, date_preset());
        registry
    }

    /// Last write wins on name collisions.
    pub fn register(&mut self, name: impl Into<String>, preset: MaskPreset) {
        self.presets.insert(name.into(), preset);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn resolve<'a>(&'a self, mask: &'a Mask) -> Result<&'a MaskPreset, MaskError> {
        match mask {
            Mask::Preset(name) => self
                .presets
                .get(name.as_ref())
                .ok_or_else(|| MaskError::UnknownPreset(name.to_string())),
            Mask::Custom(preset) => Ok(preset),
        }
    }

    pub fn format(&self, raw: &str, mask: &Mask) -> Result<String, MaskError> {
        Ok(self.resolve(mask)?.format(raw))
    }

    pub fn parse(&self, display: &str, mask: &Mask) -> Result<String, MaskError> {
        Ok(self.resolve(mask)?.parse(display))
    }

    pub fn placeholder(&self, mask: &Mask) -> Result<Option<String>, MaskError> {
        Ok(self.resolve(mask)?.placeholder_text().map(str::to_string))
    }

    pub fn max_length(&self, mask: &Mask) -> Result<Option<usize>, MaskError> {
        Ok(self.resolve(mask)?.display_max_length())
    }

    pub fn max_raw_length(&self, mask: &Mask) -> Result<Option<usize>, MaskError> {
        Ok(self.resolve(mask)?.raw_max_length())
    }
}
