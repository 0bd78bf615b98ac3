//! The onboarding record and its validation schema.
//!
//! Validation is two-phase: a pure sync rule chain chosen by the field's
//! [`FieldKind`], then, for fields configured with async validation and only
//! when the sync chain passed, a registry lookup through the shared
//! [`ValidationSession`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{FieldDescriptor, FieldKind, FormConfig};
use crate::form::{
    AsyncFieldValidator, BoxedValidationFuture, FieldKey, FieldLens, FormController, FormModel,
    FormResult, ValidationError,
};
use crate::rules::{self, CORPORATION_NUMBER_LENGTH, NAME_MAX_LENGTH};
use crate::session::ValidationSession;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, FormModel)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub corporation_number: String,
}

/// Field selector usable wherever a [`FieldLens`] is expected.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnboardingField {
    FirstName,
    LastName,
    Phone,
    CorporationNumber,
}

impl OnboardingField {
    pub const ALL: [OnboardingField; 4] = [
        OnboardingField::FirstName,
        OnboardingField::LastName,
        OnboardingField::Phone,
        OnboardingField::CorporationNumber,
    ];

    pub fn from_key(key: FieldKey) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl FieldLens<OnboardingRecord> for OnboardingField {
    type Value = String;

    fn key(self) -> FieldKey {
        let fields = OnboardingRecord::fields();
        match self {
            OnboardingField::FirstName => fields.first_name().key(),
            OnboardingField::LastName => fields.last_name().key(),
            OnboardingField::Phone => fields.phone().key(),
            OnboardingField::CorporationNumber => fields.corporation_number().key(),
        }
    }

    fn get<'a>(self, model: &'a OnboardingRecord) -> &'a Self::Value {
        let fields = OnboardingRecord::fields();
        match self {
            OnboardingField::FirstName => fields.first_name().get(model),
            OnboardingField::LastName => fields.last_name().get(model),
            OnboardingField::Phone => fields.phone().get(model),
            OnboardingField::CorporationNumber => fields.corporation_number().get(model),
        }
    }

    fn set(self, model: &mut OnboardingRecord, value: Self::Value) {
        let fields = OnboardingRecord::fields();
        match self {
            OnboardingField::FirstName => fields.first_name().set(model, value),
            OnboardingField::LastName => fields.last_name().set(model, value),
            OnboardingField::Phone => fields.phone().set(model, value),
            OnboardingField::CorporationNumber => fields.corporation_number().set(model, value),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OnboardingError {
    Required,
    MaxLength { max: usize },
    InvalidPhone,
    CorporationLength { length: usize },
    DigitsOnly,
    InvalidCorporation,
}

impl ValidationError for OnboardingError {
    fn message_key(&self) -> &'static str {
        match self {
            OnboardingError::Required => "errors.required",
            OnboardingError::MaxLength { .. } => "errors.maxLength",
            OnboardingError::InvalidPhone => "errors.invalidPhone",
            OnboardingError::CorporationLength { .. } => "errors.corporationNumber.lengthError",
            OnboardingError::DigitsOnly => "errors.corporationNumber.digitsOnlyError",
            OnboardingError::InvalidCorporation => "errors.corporationNumber.invalidCorporation",
        }
    }

    fn message_params(&self) -> Vec<(&'static str, String)> {
        match self {
            OnboardingError::MaxLength { max } => vec![("max", max.to_string())],
            OnboardingError::CorporationLength { length } => vec![("length", length.to_string())],
            _ => Vec::new(),
        }
    }
}

/// Async phase of the corporation number: the registry must know it.
#[derive(Clone)]
pub struct CorporationRule {
    session: ValidationSession,
}

impl CorporationRule {
    pub fn new(session: ValidationSession) -> Self {
        Self { session }
    }
}

impl AsyncFieldValidator<OnboardingRecord, OnboardingField, OnboardingError> for CorporationRule {
    type Fut<'a> = BoxedValidationFuture<'a, OnboardingError>;

    fn validate<'a>(&'a self, _model: &'a OnboardingRecord, value: &'a String) -> Self::Fut<'a> {
        Box::pin(async move {
            if self.session.check_async(value).await {
                Ok(())
            } else {
                Err(OnboardingError::InvalidCorporation)
            }
        })
    }
}

/// Sync rule chain for one configured field. The first failing rule wins.
pub fn check_field_sync(descriptor: &FieldDescriptor, value: &str) -> Result<(), OnboardingError> {
    match descriptor.kind {
        FieldKind::Text => {
            rules::check_name(value, descriptor.max_length.unwrap_or(NAME_MAX_LENGTH))
        }
        FieldKind::Phone => rules::check_phone(value),
        FieldKind::Number => rules::check_corporation_format(
            value,
            descriptor.max_length.unwrap_or(CORPORATION_NUMBER_LENGTH),
        ),
    }
}

#[derive(Clone)]
pub struct FieldSchema {
    descriptors: Vec<FieldDescriptor>,
    session: ValidationSession,
}

impl FieldSchema {
    pub fn new(config: &FormConfig, session: ValidationSession) -> Self {
        Self {
            descriptors: config.fields().to_vec(),
            session,
        }
    }

    /// Registers every configured field as required, with its sync chain and,
    /// when configured, the async registry check.
    pub fn install(
        &self,
        controller: &FormController<OnboardingRecord, OnboardingError>,
    ) -> FormResult<()> {
        for descriptor in &self.descriptors {
            let field = descriptor.field;
            controller.register_required_field(field)?;

            let rule = descriptor.clone();
            controller.register_field_validator(
                field,
                move |_model: &OnboardingRecord, value: &String| check_field_sync(&rule, value),
            )?;

            if let Some(async_config) = descriptor.async_validation {
                controller.register_async_field_validator(
                    field,
                    async_config.debounce_ms,
                    CorporationRule::new(self.session.clone()),
                )?;
            }
        }
        Ok(())
    }

    /// Validates a whole record outside any controller.
    ///
    /// Every configured field gets an entry; `None` means valid.
    pub async fn validate_record(
        &self,
        record: &OnboardingRecord,
    ) -> BTreeMap<OnboardingField, Option<OnboardingError>> {
        let mut results = BTreeMap::new();
        for descriptor in &self.descriptors {
            let value = descriptor.field.get(record);
            let mut outcome = check_field_sync(descriptor, value).err();
            if outcome.is_none()
                && descriptor.async_validation.is_some()
                && !self.session.check_async(value).await
            {
                outcome = Some(OnboardingError::InvalidCorporation);
            }
            results.insert(descriptor.field, outcome);
        }
        results
    }
}
