//! The onboarding form instance: configuration, live state, masks, the
//! validation session and the external clients bound together, plus the
//! accessible view-model a renderer consumes.

use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{
    CorporationChecker, ExceptionReporter, ReportContext, SubmissionClient, TracingReporter,
};
use crate::config::{ConfigError, FieldDescriptor, FieldKind, FormConfig, Grid};
use crate::form::{
    FieldLens, FieldStatus, FormController, FormError, FormId, FormOptions, FormSnapshot,
    SubmitOutcome, translate_error,
};
use crate::i18n::{I18nManager, Translate};
use crate::id::{field_error_id, field_input_id};
use crate::mask::{MaskError, MaskPreset, MaskRegistry};
use crate::schema::{FieldSchema, OnboardingError, OnboardingField, OnboardingRecord};
use crate::session::ValidationSession;

pub type OnboardingSnapshot = FormSnapshot<OnboardingRecord, OnboardingError>;

#[derive(Debug, thiserror::Error)]
pub enum OnboardingFormError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// External collaborators the form talks to.
#[derive(Clone)]
pub struct OnboardingServices {
    pub checker: Arc<dyn CorporationChecker>,
    pub submitter: Arc<dyn SubmissionClient>,
    pub reporter: Arc<dyn ExceptionReporter>,
    pub translator: Arc<dyn Translate>,
}

impl OnboardingServices {
    pub fn new(checker: Arc<dyn CorporationChecker>, submitter: Arc<dyn SubmissionClient>) -> Self {
        Self {
            checker,
            submitter,
            reporter: Arc::new(TracingReporter),
            translator: Arc::new(I18nManager::new()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translate>) -> Self {
        self.translator = translator;
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AriaRole {
    Alert,
    Status,
}

impl AriaRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AriaRole::Alert => "alert",
            AriaRole::Status => "status",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldErrorView {
    pub id: String,
    pub message: String,
    pub role: AriaRole,
}

/// Everything needed to render one input accessibly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldView {
    pub field: OnboardingField,
    pub label: String,
    pub input_id: String,
    pub value: String,
    pub placeholder: Option<String>,
    pub max_length: Option<usize>,
    pub kind: FieldKind,
    pub input_type: &'static str,
    pub input_mode: &'static str,
    pub grid: Grid,
    pub auto_focus: bool,
    pub required: bool,
    pub status: FieldStatus,
    pub error: Option<FieldErrorView>,
    pub aria_invalid: bool,
    pub aria_busy: bool,
    pub aria_describedby: Option<String>,
    /// Spinner next to the input while its async check runs.
    pub show_indicator: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormAlert {
    pub role: AriaRole,
    pub message: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmitButtonView {
    pub label: String,
    pub disabled: bool,
    pub busy: bool,
}

pub struct OnboardingForm {
    config: FormConfig,
    controller: FormController<OnboardingRecord, OnboardingError>,
    masks: RwLock<Arc<MaskRegistry>>,
    session: ValidationSession,
    submitter: Arc<dyn SubmissionClient>,
    reporter: Arc<dyn ExceptionReporter>,
    translator: Arc<dyn Translate>,
}

impl OnboardingForm {
    /// Builds a form with its own validation session.
    pub fn new(config: FormConfig, services: OnboardingServices) -> Result<Self, OnboardingFormError> {
        let session = ValidationSession::new(services.checker.clone());
        Self::with_session(config, services, session, FormOptions::default())
    }

    /// Builds a form on an existing session; clones of one session share
    /// cached corporation checks.
    ///
    /// Corporation checks go through the session's own checker, so
    /// `services.checker` is unused here. Check failures seen by this form
    /// are reported to `services.reporter`.
    pub fn with_session(
        config: FormConfig,
        services: OnboardingServices,
        session: ValidationSession,
        options: FormOptions,
    ) -> Result<Self, OnboardingFormError> {
        config.validate()?;
        let masks = MaskRegistry::with_builtin_presets();
        for descriptor in config.fields() {
            if let Some(mask) = &descriptor.mask {
                masks.resolve(mask)?;
            }
        }

        let session = session.with_reporter(services.reporter.clone());
        let controller = FormController::new(OnboardingRecord::default(), options);
        FieldSchema::new(&config, session.clone()).install(&controller)?;

        Ok(Self {
            config,
            controller,
            masks: RwLock::new(Arc::new(masks)),
            session,
            submitter: services.submitter,
            reporter: services.reporter,
            translator: services.translator,
        })
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn controller(&self) -> &FormController<OnboardingRecord, OnboardingError> {
        &self.controller
    }

    pub fn session(&self) -> &ValidationSession {
        &self.session
    }

    /// Registers or replaces a mask preset on the live form.
    pub fn register_mask_preset(&self, name: impl Into<String>, preset: MaskPreset) {
        let mut masks = self.masks.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *masks).register(name, preset);
    }

    /// Applies a keystroke: the display text is parsed through the field's
    /// mask and the raw value validated.
    pub async fn change(
        &self,
        field: OnboardingField,
        display: &str,
    ) -> Result<(), OnboardingFormError> {
        let descriptor = self.config.descriptor(field)?;
        let masks = self.mask_registry();
        self.controller
            .set_display_async(field, display, &masks, descriptor.mask.as_ref())
            .await?;
        Ok(())
    }

    pub async fn blur(&self, field: OnboardingField) -> Result<(), OnboardingFormError> {
        self.config.descriptor(field)?;
        self.controller.touch_async(field).await?;
        Ok(())
    }

    /// Validates everything, then hands the sanitized record to the
    /// submission client exactly once.
    pub async fn submit(&self) -> Result<SubmitOutcome, OnboardingFormError> {
        let submitter = self.submitter.clone();
        let reporter = self.reporter.clone();
        let context =
            ReportContext::new("submit").tag("form_id", self.controller.form_id()?.0.to_string());
        let outcome = self
            .controller
            .submit_async(move |record| async move {
                submitter.submit(record).await.inspect_err(|error| {
                    reporter.report(error, &context);
                })
            })
            .await?;

        match &outcome {
            SubmitOutcome::Succeeded => tracing::info!("onboarding form submitted"),
            SubmitOutcome::Failed(failure) => tracing::error!(
                has_message = failure.message.is_some(),
                "onboarding form submission failed"
            ),
            SubmitOutcome::Invalid => {
                let first_error = self.controller.snapshot()?.first_error;
                tracing::debug!(?first_error, "onboarding form submission blocked by validation");
            }
            SubmitOutcome::Superseded => {
                tracing::debug!("onboarding form edited during submit validation; nothing sent")
            }
            SubmitOutcome::Blocked => tracing::debug!("submit ignored while the gate is closed"),
        }
        Ok(outcome)
    }

    pub fn snapshot(&self) -> Result<OnboardingSnapshot, OnboardingFormError> {
        Ok(self.controller.snapshot()?)
    }

    pub fn title(&self) -> String {
        self.translator.translate(&self.config.title, &[])
    }

    pub fn subtitle(&self) -> Option<String> {
        self.config
            .subtitle
            .as_deref()
            .map(|key| self.translator.translate(key, &[]))
    }

    pub fn field_views(&self) -> Result<Vec<FieldView>, OnboardingFormError> {
        let snapshot = self.controller.snapshot()?;
        let form_id = self.controller.form_id()?;
        let masks = self.mask_registry();

        self.config
            .fields()
            .iter()
            .map(|descriptor| self.field_view(descriptor, &snapshot, form_id, &masks))
            .collect()
    }

    /// Form-level message: the submission error, or the success notice.
    pub fn form_alert(&self) -> Result<Option<FormAlert>, OnboardingFormError> {
        let snapshot = self.controller.snapshot()?;
        if let Some(failure) = &snapshot.submit_error {
            let message = failure
                .message
                .clone()
                .unwrap_or_else(|| self.translator.translate("form.submitError.fallback", &[]));
            return Ok(Some(FormAlert {
                role: AriaRole::Alert,
                message,
            }));
        }
        if snapshot.is_success() {
            return Ok(Some(FormAlert {
                role: AriaRole::Status,
                message: self.translator.translate("form.success", &[]),
            }));
        }
        Ok(None)
    }

    pub fn submit_button(&self) -> Result<SubmitButtonView, OnboardingFormError> {
        let snapshot = self.controller.snapshot()?;
        let label_key = if snapshot.is_submitting() {
            "form.submitting"
        } else {
            self.config.submit_label.as_str()
        };
        Ok(SubmitButtonView {
            label: self.translator.translate(label_key, &[]),
            disabled: snapshot.is_submit_disabled(),
            busy: snapshot.is_submitting() || snapshot.is_validating,
        })
    }

    /// Input to focus after a rejected submit: the first invalid field in
    /// display order.
    pub fn focus_target(&self) -> Result<Option<String>, OnboardingFormError> {
        if !self.controller.options().focus_first_error_on_submit {
            return Ok(None);
        }
        let snapshot = self.controller.snapshot()?;
        if snapshot.submit_count == 0 {
            return Ok(None);
        }
        let form_id = self.controller.form_id()?;
        Ok(self
            .config
            .fields()
            .iter()
            .map(|descriptor| descriptor.field.key())
            .find(|key| {
                snapshot
                    .field_meta
                    .get(key)
                    .is_some_and(|meta| meta.error.is_some())
            })
            .map(|key| field_input_id(form_id, key)))
    }

    fn field_view(
        &self,
        descriptor: &FieldDescriptor,
        snapshot: &OnboardingSnapshot,
        form_id: FormId,
        masks: &MaskRegistry,
    ) -> Result<FieldView, OnboardingFormError> {
        let field = descriptor.field;
        let key = field.key();
        let value = self
            .controller
            .display_value(field, masks, descriptor.mask.as_ref())?;
        let (placeholder, mask_max_length) = match &descriptor.mask {
            Some(mask) => (masks.placeholder(mask)?, masks.max_length(mask)?),
            None => (None, None),
        };

        let status = snapshot
            .field_meta
            .get(&key)
            .map_or(FieldStatus::Valid, |meta| meta.status());
        let error_id = field_error_id(form_id, key);
        let error = self
            .controller
            .field_error_for_display(field)?
            .map(|error| FieldErrorView {
                id: error_id.clone(),
                message: translate_error(&error, self.translator.as_ref()),
                role: AriaRole::Alert,
            });
        let show_indicator = status == FieldStatus::Validating
            && descriptor
                .async_validation
                .is_some_and(|config| config.show_indicator);

        Ok(FieldView {
            field,
            label: self.translator.translate(&descriptor.label, &[]),
            input_id: field_input_id(form_id, key),
            value,
            placeholder,
            max_length: descriptor.max_length.or(mask_max_length),
            kind: descriptor.kind,
            input_type: descriptor.kind.input_type(),
            input_mode: descriptor.kind.input_mode(),
            grid: descriptor.grid,
            auto_focus: descriptor.auto_focus,
            required: self.controller.is_required(field)?,
            status,
            aria_invalid: error.is_some(),
            aria_busy: status == FieldStatus::Validating,
            aria_describedby: error.as_ref().map(|error| error.id.clone()),
            error,
            show_indicator,
        })
    }

    fn mask_registry(&self) -> Arc<MaskRegistry> {
        self.masks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
