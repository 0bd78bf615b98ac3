//! Headless engine for the client onboarding form: masked inputs, two-phase
//! field validation with a deduplicated corporation registry check, and a
//! single-transaction submit flow.

pub mod client;
pub mod config;
pub mod form;
pub mod i18n;
pub mod id;
pub mod mask;
pub mod onboarding;
pub mod prelude;
pub mod rules;
pub mod sanitize;
pub mod schema;
pub mod session;

pub use client::{
    ClientError, CorporationCheck, CorporationChecker, ExceptionReporter, ReportContext,
    SubmissionClient, TracingReporter,
};
pub use config::{FieldDescriptor, FieldKind, FormConfig, Grid, StepConfig};
pub use i18n::{I18nManager, Locale, Translate};
pub use onboarding::{OnboardingForm, OnboardingFormError, OnboardingServices};
pub use schema::{OnboardingError, OnboardingField, OnboardingRecord};
pub use session::ValidationSession;
