//! Declarative description of the onboarding form: steps, fields, labels,
//! grid placement and masks. Built in code or loaded from JSON.

use std::collections::HashSet;

use serde::Deserialize;

use crate::mask::{self, Mask};
use crate::rules::{CORPORATION_NUMBER_LENGTH, NAME_MAX_LENGTH};
use crate::schema::OnboardingField;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid form configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("form configuration has no steps")]
    NoSteps,
    #[error("active step {index} is out of range ({count} steps)")]
    ActiveStepOutOfRange { index: usize, count: usize },
    #[error("field `{0:?}` is configured more than once")]
    DuplicateField(OnboardingField),
    #[error("field `{0:?}` is not part of the active step")]
    UnknownField(OnboardingField),
}

/// Closed set of input kinds; rendering and validation dispatch on it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Phone,
    Number,
}

impl FieldKind {
    pub fn input_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Number => "text",
            FieldKind::Phone => "tel",
        }
    }

    /// Virtual keyboard hint (`inputmode`).
    pub fn input_mode(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Phone => "tel",
            FieldKind::Number => "numeric",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grid {
    #[default]
    Full,
    Half,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncValidationConfig {
    #[serde(default)]
    pub show_indicator: bool,
    #[serde(default)]
    pub debounce_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(rename = "name")]
    pub field: OnboardingField,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub mask: Option<Mask>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub auto_focus: bool,
    #[serde(default)]
    pub async_validation: Option<AsyncValidationConfig>,
}

impl FieldDescriptor {
    pub fn new(field: OnboardingField, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            field,
            label: label.into(),
            kind,
            grid: Grid::Full,
            mask: None,
            max_length: None,
            auto_focus: false,
            async_validation: None,
        }
    }

    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = grid;
        self
    }

    pub fn mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    pub fn auto_focus(mut self, value: bool) -> Self {
        self.auto_focus = value;
        self
    }

    pub fn async_validation(mut self, value: AsyncValidationConfig) -> Self {
        self.async_validation = Some(value);
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub submit_label: String,
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub active_step: usize,
}

impl FormConfig {
    /// The built-in onboarding form.
    pub fn onboarding() -> Self {
        Self {
            title: "form.title".into(),
            subtitle: Some("form.subtitle".into()),
            submit_label: "form.submit".into(),
            steps: vec![StepConfig {
                id: "details".into(),
                title: "form.steps.details.title".into(),
                fields: vec![
                    FieldDescriptor::new(
                        OnboardingField::FirstName,
                        "form.fields.firstName.label",
                        FieldKind::Text,
                    )
                    .grid(Grid::Half)
                    .max_length(NAME_MAX_LENGTH)
                    .auto_focus(true),
                    FieldDescriptor::new(
                        OnboardingField::LastName,
                        "form.fields.lastName.label",
                        FieldKind::Text,
                    )
                    .grid(Grid::Half)
                    .max_length(NAME_MAX_LENGTH),
                    FieldDescriptor::new(
                        OnboardingField::Phone,
                        "form.fields.phone.label",
                        FieldKind::Phone,
                    )
                    .mask(Mask::preset(mask::PHONE)),
                    FieldDescriptor::new(
                        OnboardingField::CorporationNumber,
                        "form.fields.corporationNumber.label",
                        FieldKind::Number,
                    )
                    .max_length(CORPORATION_NUMBER_LENGTH)
                    .async_validation(AsyncValidationConfig {
                        show_indicator: true,
                        debounce_ms: 0,
                    }),
                ],
            }],
            active_step: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let step = self.active()?;
        let mut seen = HashSet::new();
        for descriptor in &step.fields {
            if !seen.insert(descriptor.field) {
                return Err(ConfigError::DuplicateField(descriptor.field));
            }
        }
        Ok(())
    }

    pub fn active(&self) -> Result<&StepConfig, ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }
        self.steps
            .get(self.active_step)
            .ok_or(ConfigError::ActiveStepOutOfRange {
                index: self.active_step,
                count: self.steps.len(),
            })
    }

    /// Fields of the active step, in display order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.active()
            .map(|step| step.fields.as_slice())
            .unwrap_or_default()
    }

    pub fn descriptor(&self, field: OnboardingField) -> Result<&FieldDescriptor, ConfigError> {
        self.fields()
            .iter()
            .find(|descriptor| descriptor.field == field)
            .ok_or(ConfigError::UnknownField(field))
    }
}
