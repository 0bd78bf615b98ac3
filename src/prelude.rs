pub use crate::client::{
    ClientError, CorporationCheck, CorporationChecker, ExceptionReporter, SubmissionClient,
};
pub use crate::config::{FieldKind, FormConfig, Grid};
pub use crate::form::{
    FieldLens, FieldStatus, FormModel, FormOptions, SubmitOutcome, SubmitState, ValidationMode,
};
pub use crate::i18n::{I18nManager, Locale, Translate};
pub use crate::mask::{Mask, MaskPreset, MaskRegistry};
pub use crate::onboarding::{
    AriaRole, FieldView, FormAlert, OnboardingForm, OnboardingFormError, OnboardingServices,
};
pub use crate::schema::{OnboardingError, OnboardingField, OnboardingRecord};
pub use crate::session::ValidationSession;
