mod binding;
mod controller;
mod validation;

#[cfg(test)]
mod tests;

pub use binding::translate_error;
pub use controller::{
    FieldKey, FieldMeta, FieldStatus, FormController, FormError, FormId, FormOptions, FormResult,
    FormSnapshot, SubmitFailure, SubmitOutcome, SubmitState, ValidationMode,
    ValidationTicket,
};
pub use onboarding_form_derive::FormModel;
pub use validation::{
    AsyncFieldValidator, BoxedValidationFuture, FieldLens, FieldValidator, FieldValue, FormModel,
    ValidationError,
};
