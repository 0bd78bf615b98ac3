use super::*;
use futures::executor::block_on;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::i18n::Translate;
use crate::mask::{self, Mask, MaskRegistry};

#[derive(Clone, Debug, Eq, PartialEq)]
struct TestError(&'static str);

impl ValidationError for TestError {
    fn message_key(&self) -> &'static str {
        self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct LimitError {
    max: usize,
}

impl ValidationError for LimitError {
    fn message_key(&self) -> &'static str {
        "errors.maxLength"
    }

    fn message_params(&self) -> Vec<(&'static str, String)> {
        vec![("max", self.max.to_string())]
    }
}

/// Echoes the key followed by its params so assertions can see both.
struct EchoTranslator;

impl Translate for EchoTranslator {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .fold(key.to_string(), |text, (name, value)| format!("{text} {name}={value}"))
    }
}

fn error_of<T, E>(controller: &FormController<T, E>, key: FieldKey) -> Option<E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    controller
        .snapshot()
        .expect("snapshot")
        .field_meta
        .get(&key)
        .and_then(|meta| meta.error.clone())
}

fn submit_counting(
    controller: &FormController<ApplicantForm, TestError>,
    calls: &Arc<AtomicUsize>,
) -> SubmitOutcome {
    let calls = calls.clone();
    block_on(controller.submit_async(move |_model: ApplicantForm| async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<(), SubmitFailure>(())
    }))
    .expect("submit")
}

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, FormModel)]
struct ApplicantForm {
    email: String,
    first_name: String,
    last_name: String,
    phone: String,
    nickname: Option<String>,
    tags: Vec<String>,
}

fn base_form() -> ApplicantForm {
    ApplicantForm {
        email: "user@example.com".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        phone: String::new(),
        nickname: None,
        tags: vec!["a".into()],
    }
}

fn required(_model: &ApplicantForm, value: &String) -> Result<(), TestError> {
    if value.trim().is_empty() {
        Err(TestError("required"))
    } else {
        Ok(())
    }
}

#[derive(Clone)]
struct PerfForm {
    values: BTreeMap<&'static str, String>,
}

impl FormModel for PerfForm {
    type Fields = ();

    fn fields() -> Self::Fields {}
}

#[derive(Clone, Copy)]
struct MapLens {
    key: &'static str,
}

impl FieldLens<PerfForm> for MapLens {
    type Value = String;

    fn key(self) -> FieldKey {
        FieldKey::new(self.key)
    }

    fn get<'a>(self, model: &'a PerfForm) -> &'a Self::Value {
        model
            .values
            .get(self.key)
            .expect("perf key must exist in model values")
    }

    fn set(self, model: &mut PerfForm, value: Self::Value) {
        model.values.insert(self.key, value);
    }
}

/// Values containing `slow` take 70ms, the rest 5ms; values containing `bad`
/// are rejected.
struct TimedValidator;

impl AsyncFieldValidator<ApplicantForm, ApplicantFormEmailLens, TestError> for TimedValidator {
    type Fut<'a> = BoxedValidationFuture<'a, TestError>;

    fn validate<'a>(&'a self, _model: &'a ApplicantForm, value: &'a String) -> Self::Fut<'a> {
        let delay_ms = if value.contains("slow") { 70 } else { 5 };
        let reject = value.contains("bad");
        Box::pin(async move {
            thread::sleep(Duration::from_millis(delay_ms));
            if reject {
                Err(TestError("async error"))
            } else {
                Ok(())
            }
        })
    }
}

struct ContainsValidator {
    needle: &'static str,
    calls: Arc<AtomicUsize>,
}

impl ContainsValidator {
    fn new(needle: &'static str) -> Self {
        Self {
            needle,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AsyncFieldValidator<ApplicantForm, ApplicantFormEmailLens, TestError> for ContainsValidator {
    type Fut<'a> = BoxedValidationFuture<'a, TestError>;

    fn validate<'a>(&'a self, _model: &'a ApplicantForm, value: &'a String) -> Self::Fut<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        let needle = self.needle;
        Box::pin(async move {
            if value.contains(needle) {
                Err(TestError("email invalid"))
            } else {
                Ok(())
            }
        })
    }
}

fn timed_controller(mode: ValidationMode) -> FormController<ApplicantForm, TestError> {
    let controller = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: mode,
            ..FormOptions::default()
        },
    );
    controller
        .register_async_field_validator(ApplicantForm::fields().email(), 0, TimedValidator)
        .expect("register async validator");
    controller
}

#[test]
fn field_lens_updates_model_and_dirty_state() {
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    let fields = ApplicantForm::fields();

    controller
        .set(fields.email(), "changed@example.com".into())
        .expect("set must succeed");
    let snapshot = controller.snapshot().expect("snapshot must succeed");
    assert!(snapshot.is_dirty);
    assert_eq!(snapshot.model.email, "changed@example.com");

    let email_meta = snapshot
        .field_meta
        .get(&fields.email().key())
        .expect("email meta should exist");
    assert!(email_meta.dirty);

    controller
        .set(fields.email(), "user@example.com".into())
        .expect("set back to initial");
    let snapshot = controller.snapshot().expect("snapshot");
    assert!(!snapshot.is_dirty);
}

#[test]
fn validation_mode_controls_when_errors_appear() {
    let fields = ApplicantForm::fields();
    let on_change = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnChange,
            ..FormOptions::default()
        },
    );
    on_change
        .register_field_validator(fields.email(), required)
        .expect("register validator");
    on_change
        .set(fields.email(), "".into())
        .expect("set should trigger validation");
    assert_eq!(
        error_of(&on_change, fields.email().key()),
        Some(TestError("required"))
    );

    let on_blur = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnBlur,
            ..FormOptions::default()
        },
    );
    on_blur
        .register_field_validator(fields.email(), required)
        .expect("register validator");
    on_blur.set(fields.email(), "".into()).expect("set");
    assert_eq!(error_of(&on_blur, fields.email().key()), None);
    on_blur.touch(fields.email()).expect("touch");
    assert_eq!(
        error_of(&on_blur, fields.email().key()),
        Some(TestError("required"))
    );

    let on_submit = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnSubmit,
            ..FormOptions::default()
        },
    );
    on_submit
        .register_field_validator(fields.email(), required)
        .expect("register validator");
    on_submit
        .set(fields.email(), "".into())
        .expect("set should not trigger validation immediately");
    on_submit.touch(fields.email()).expect("touch");
    assert_eq!(error_of(&on_submit, fields.email().key()), None);
    assert!(!on_submit.validate_form().expect("validate form"));
}

#[test]
fn first_failing_validator_wins() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    controller
        .register_field_validator(fields.email(), required)
        .expect("register required");
    controller
        .register_field_validator(fields.email(), |_model: &ApplicantForm, value: &String| {
            if value.contains('@') {
                Ok(())
            } else {
                Err(TestError("email format"))
            }
        })
        .expect("register format");

    controller.set(fields.email(), " ".into()).expect("set blank");
    assert_eq!(
        error_of(&controller, fields.email().key()),
        Some(TestError("required"))
    );

    controller.set(fields.email(), "user".into()).expect("set");
    assert_eq!(
        error_of(&controller, fields.email().key()),
        Some(TestError("email format"))
    );
}

#[test]
fn async_validation_ticket_keeps_latest_result() {
    let controller = timed_controller(ValidationMode::OnChange);
    let lens = ApplicantForm::fields().email();

    let slow = {
        let controller = controller.clone();
        thread::spawn(move || {
            block_on(controller.set_async(lens, "slow-bad@example.com".into())).expect("slow set");
        })
    };
    thread::sleep(Duration::from_millis(10));
    let fast = {
        let controller = controller.clone();
        thread::spawn(move || {
            block_on(controller.set_async(lens, "fast@example.com".into())).expect("fast set");
        })
    };

    slow.join().expect("slow thread joins");
    fast.join().expect("fast thread joins");

    let snapshot = controller.snapshot().expect("snapshot");
    let email_meta = &snapshot.field_meta[&lens.key()];
    assert!(email_meta.error.is_none());
    assert_eq!(email_meta.status(), FieldStatus::Valid);
    assert_eq!(snapshot.model.email, "fast@example.com");
}

#[test]
fn edit_discards_result_of_check_for_previous_value() {
    let controller = timed_controller(ValidationMode::OnChange);
    let lens = ApplicantForm::fields().email();

    let stale = {
        let controller = controller.clone();
        thread::spawn(move || {
            block_on(controller.set_async(lens, "slow-bad@example.com".into()))
                .expect("stale set");
        })
    };
    thread::sleep(Duration::from_millis(15));
    controller
        .set(lens, "next@example.com".into())
        .expect("edit while checking");
    stale.join().expect("stale thread joins");

    let snapshot = controller.snapshot().expect("snapshot");
    let meta = &snapshot.field_meta[&lens.key()];
    assert_eq!(meta.error, None);
    assert!(!meta.validating);
}

#[test]
fn pending_async_check_reports_validating_and_closes_gate() {
    let controller = timed_controller(ValidationMode::OnChange);
    let lens = ApplicantForm::fields().email();

    let pending = {
        let controller = controller.clone();
        thread::spawn(move || {
            block_on(controller.set_async(lens, "slow@example.com".into())).expect("async set");
        })
    };
    thread::sleep(Duration::from_millis(15));
    let snapshot = controller.snapshot().expect("snapshot");
    assert!(snapshot.is_validating);
    assert!(snapshot.is_valid);
    assert!(snapshot.is_submit_disabled());
    assert_eq!(
        snapshot.field_meta[&lens.key()].status(),
        FieldStatus::Validating
    );

    pending.join().expect("pending thread joins");
    let snapshot = controller.snapshot().expect("snapshot");
    assert!(!snapshot.is_validating);
    assert!(!snapshot.is_submit_disabled());
}

#[test]
fn async_phase_runs_only_after_sync_phase_passes() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    let validator = ContainsValidator::new("bad");
    let calls = validator.calls.clone();
    controller
        .register_field_validator(fields.email(), required)
        .expect("register sync");
    controller
        .register_async_field_validator(fields.email(), 0, validator)
        .expect("register async");

    block_on(controller.set_async(fields.email(), "  ".into())).expect("set blank");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        error_of(&controller, fields.email().key()),
        Some(TestError("required"))
    );

    block_on(controller.set_async(fields.email(), "bad@example.com".into())).expect("set bad");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let meta = controller.snapshot().expect("snapshot").field_meta[&fields.email().key()].clone();
    assert_eq!(meta.error, Some(TestError("email invalid")));
    assert_eq!(meta.status(), FieldStatus::Invalid);
}

#[test]
fn async_registered_validator_is_debounced_with_latest_ticket_wins() {
    let fields = ApplicantForm::fields();
    let controller = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnChange,
            ..FormOptions::default()
        },
    );
    let validator = ContainsValidator::new("bad");
    let calls = validator.calls.clone();
    controller
        .register_async_field_validator(fields.email(), 30, validator)
        .expect("register async validator");

    let first = {
        let controller = controller.clone();
        let lens = fields.email();
        thread::spawn(move || {
            block_on(controller.set_async(lens, "bad@example.com".into())).expect("first set");
        })
    };
    thread::sleep(Duration::from_millis(5));
    let second = {
        let controller = controller.clone();
        let lens = fields.email();
        thread::spawn(move || {
            block_on(controller.set_async(lens, "good@example.com".into())).expect("second set");
        })
    };

    first.join().expect("first thread joins");
    second.join().expect("second thread joins");

    let snapshot = controller.snapshot().expect("snapshot");
    let meta = snapshot
        .field_meta
        .get(&fields.email().key())
        .expect("email meta");
    assert!(meta.error.is_none());
    assert_eq!(snapshot.model.email, "good@example.com");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn validate_form_async_runs_registered_async_validators() {
    let fields = ApplicantForm::fields();
    let controller = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnSubmit,
            ..FormOptions::default()
        },
    );
    controller
        .register_async_field_validator(fields.email(), 0, ContainsValidator::new("bad"))
        .expect("register async validator");
    controller
        .set(fields.email(), "bad@example.com".into())
        .expect("set invalid value");
    assert!(controller.snapshot().expect("snapshot").is_valid);

    let valid = block_on(controller.validate_form_async()).expect("validate async");
    assert!(!valid);
    assert_eq!(
        error_of(&controller, fields.email().key()),
        Some(TestError("email invalid"))
    );

    controller
        .set(fields.email(), "ok@example.com".into())
        .expect("set valid value");
    assert!(block_on(controller.validate_form_async()).expect("validate async"));
    assert!(controller.snapshot().expect("snapshot").is_valid);
}

#[test]
fn edit_during_submit_validation_sends_nothing() {
    let controller = timed_controller(ValidationMode::OnBlur);
    let lens = ApplicantForm::fields().email();
    controller
        .set(lens, "slow@example.com".into())
        .expect("set checked value");
    let calls = Arc::new(AtomicUsize::new(0));

    let submitting = {
        let controller = controller.clone();
        let calls = calls.clone();
        thread::spawn(move || submit_counting(&controller, &calls))
    };
    thread::sleep(Duration::from_millis(20));
    assert_eq!(
        controller.snapshot().expect("snapshot").submit_state,
        SubmitState::Validating
    );
    controller
        .set(lens, "bad@example.com".into())
        .expect("edit while submit validates");

    assert_eq!(
        submitting.join().expect("submit thread joins"),
        SubmitOutcome::Superseded
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let snapshot = controller.snapshot().expect("snapshot");
    assert_eq!(snapshot.submit_state, SubmitState::Idle);
    assert_eq!(snapshot.model.email, "bad@example.com");

    assert_eq!(submit_counting(&controller, &calls), SubmitOutcome::Invalid);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        error_of(&controller, lens.key()),
        Some(TestError("async error"))
    );
}

#[test]
fn value_restored_during_submit_validation_is_still_superseded() {
    let controller = timed_controller(ValidationMode::OnBlur);
    let lens = ApplicantForm::fields().email();
    controller
        .set(lens, "slow@example.com".into())
        .expect("set checked value");
    let calls = Arc::new(AtomicUsize::new(0));

    let submitting = {
        let controller = controller.clone();
        let calls = calls.clone();
        thread::spawn(move || submit_counting(&controller, &calls))
    };
    thread::sleep(Duration::from_millis(20));
    controller
        .set(lens, "other@example.com".into())
        .expect("first edit");
    controller
        .set(lens, "slow@example.com".into())
        .expect("edit back");

    assert_eq!(
        submitting.join().expect("submit thread joins"),
        SubmitOutcome::Superseded
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(submit_counting(&controller, &calls), SubmitOutcome::Succeeded);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn submit_is_blocked_while_gate_is_closed() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    controller
        .register_required_field(fields.phone())
        .expect("register required");
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = {
        let calls = calls.clone();
        block_on(controller.submit_async(move |_model: ApplicantForm| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), SubmitFailure>(())
        }))
        .expect("submit")
    };
    assert_eq!(outcome, SubmitOutcome::Blocked);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let snapshot = controller.snapshot().expect("snapshot");
    assert!(snapshot.has_empty_required);
    assert_eq!(snapshot.submit_count, 0);
    assert_eq!(snapshot.submit_state, SubmitState::Idle);
}

#[test]
fn submit_with_invalid_model_does_not_call_collaborator() {
    let fields = ApplicantForm::fields();
    let controller = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnSubmit,
            ..FormOptions::default()
        },
    );
    controller
        .register_field_validator(fields.email(), |_model: &ApplicantForm, value: &String| {
            if value.contains('@') {
                Ok(())
            } else {
                Err(TestError("email format"))
            }
        })
        .expect("register validator");
    controller.set(fields.email(), "user".into()).expect("set");

    let calls = Arc::new(AtomicUsize::new(0));
    let outcome = {
        let calls = calls.clone();
        block_on(controller.submit_async(move |_model: ApplicantForm| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), SubmitFailure>(())
        }))
        .expect("submit")
    };
    assert_eq!(outcome, SubmitOutcome::Invalid);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let snapshot = controller.snapshot().expect("snapshot");
    assert_eq!(snapshot.submit_state, SubmitState::Idle);
    assert_eq!(snapshot.submit_count, 1);
    assert_eq!(snapshot.first_error, Some(fields.email().key()));
    assert_eq!(
        controller
            .field_error_for_display(fields.email())
            .expect("display error"),
        Some(TestError("email format"))
    );
}

#[test]
fn successful_submit_sends_sanitized_model_and_resets() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    controller
        .set(fields.email(), "<b>new</b>@example.com".into())
        .expect("set email");
    controller
        .set(fields.tags(), vec!["<i>kept</i>".into()])
        .expect("set tags");

    let received = Arc::new(std::sync::Mutex::new(None));
    let outcome = {
        let received = received.clone();
        block_on(controller.submit_async(move |model: ApplicantForm| async move {
            *received.lock().expect("received lock") = Some(model);
            Ok::<(), SubmitFailure>(())
        }))
        .expect("submit")
    };
    assert_eq!(outcome, SubmitOutcome::Succeeded);

    let sent = received
        .lock()
        .expect("received lock")
        .clone()
        .expect("collaborator called");
    assert_eq!(sent.email, "new@example.com");
    assert_eq!(sent.tags, vec!["<i>kept</i>".to_string()]);

    let snapshot = controller.snapshot().expect("snapshot");
    assert!(snapshot.is_success());
    assert!(!snapshot.is_dirty);
    assert_eq!(snapshot.model, base_form());
    assert_eq!(snapshot.submit_count, 0);
    assert_eq!(snapshot.submit_error, None);
}

#[test]
fn failed_submit_keeps_values_until_next_edit() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    controller
        .set(fields.email(), "kept@example.com".into())
        .expect("set email");

    let outcome = block_on(controller.submit_async(|_model: ApplicantForm| async {
        Err::<(), _>(SubmitFailure::new("Service unavailable"))
    }))
    .expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Failed(SubmitFailure::new("Service unavailable"))
    );

    let snapshot = controller.snapshot().expect("snapshot");
    assert_eq!(snapshot.submit_state, SubmitState::Failed);
    assert_eq!(snapshot.model.email, "kept@example.com");
    assert_eq!(
        snapshot
            .submit_error
            .and_then(|failure| failure.message)
            .as_deref(),
        Some("Service unavailable")
    );

    controller
        .set(fields.last_name(), "Byron".into())
        .expect("unrelated edit");
    let snapshot = controller.snapshot().expect("snapshot");
    assert_eq!(snapshot.submit_error, None);
    assert_eq!(snapshot.submit_state, SubmitState::Idle);
    assert_eq!(snapshot.model.email, "kept@example.com");
}

#[test]
fn concurrent_submit_is_blocked_while_submitting() {
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = {
        let controller = controller.clone();
        let calls = calls.clone();
        thread::spawn(move || {
            block_on(controller.submit_async(move |_model: ApplicantForm| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(60));
                Ok::<(), SubmitFailure>(())
            }))
            .expect("first submit")
        })
    };
    thread::sleep(Duration::from_millis(15));
    assert!(controller.snapshot().expect("snapshot").is_submitting());
    let second = block_on(controller.submit_async(|_model: ApplicantForm| async {
        Ok::<(), SubmitFailure>(())
    }))
    .expect("second submit");
    assert_eq!(second, SubmitOutcome::Blocked);

    assert_eq!(first.join().expect("first joins"), SubmitOutcome::Succeeded);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn single_field_update_keeps_other_field_meta_stable() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());

    controller
        .set(fields.last_name(), "Lovelace".into())
        .expect("seed last name meta");
    controller
        .set(fields.email(), "only-email-changed@example.com".into())
        .expect("update email only");

    let snapshot = controller.snapshot().expect("snapshot");
    assert!(
        snapshot
            .field_meta
            .get(&fields.email().key())
            .is_some_and(|meta| meta.dirty)
    );
    assert!(
        snapshot
            .field_meta
            .get(&fields.last_name().key())
            .is_some_and(|meta| !meta.dirty)
    );
}

#[test]
fn error_visibility_requires_touch_or_submit() {
    let fields = ApplicantForm::fields();
    let controller = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnChange,
            ..FormOptions::default()
        },
    );
    controller
        .register_field_validator(fields.email(), required)
        .expect("register validator");

    controller
        .set(fields.email(), "".into())
        .expect("set invalid");
    assert_eq!(
        controller
            .field_error_for_display(fields.email())
            .expect("display error"),
        None
    );

    controller.touch(fields.email()).expect("touch field");
    assert_eq!(
        controller
            .field_error_for_display(fields.email())
            .expect("display error"),
        Some(TestError("required"))
    );

    let submitted = FormController::<ApplicantForm, TestError>::new(
        base_form(),
        FormOptions {
            validate_mode: ValidationMode::OnChange,
            ..FormOptions::default()
        },
    );
    submitted
        .register_field_validator(fields.last_name(), required)
        .expect("register validator");
    submitted
        .set(fields.last_name(), " ".into())
        .expect("set invalid");
    assert_eq!(
        submitted
            .field_error_for_display(fields.last_name())
            .expect("display error"),
        None
    );
    submitted
        .set(fields.last_name(), "Byron".into())
        .expect("fix value");
    let calls = Arc::new(AtomicUsize::new(0));
    assert_eq!(submit_counting(&submitted, &calls), SubmitOutcome::Succeeded);
    submitted
        .set(fields.last_name(), " ".into())
        .expect("set invalid after reset");
    assert_eq!(
        submitted
            .field_error_for_display(fields.last_name())
            .expect("display error"),
        None
    );
}

#[test]
fn error_messages_carry_params_through_translation() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, LimitError>::new(base_form(), FormOptions::default());
    controller
        .register_field_validator(fields.first_name(), |_model: &ApplicantForm, value: &String| {
            if value.chars().count() > 8 {
                Err(LimitError { max: 8 })
            } else {
                Ok(())
            }
        })
        .expect("register validator");
    controller
        .set(fields.first_name(), "Augusta Ada".into())
        .expect("set");
    controller.touch(fields.first_name()).expect("touch");
    let error = controller
        .field_error_for_display(fields.first_name())
        .expect("display error")
        .expect("error shown after touch");
    assert_eq!(
        translate_error(&error, &EchoTranslator),
        "errors.maxLength max=8"
    );
    assert_eq!(
        translate_error(&LimitError { max: 3 }, &EchoTranslator),
        "errors.maxLength max=3"
    );
}

#[test]
fn masked_fields_store_raw_and_display_formatted() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());
    let masks = MaskRegistry::with_builtin_presets();
    let phone = Mask::preset(mask::PHONE);

    block_on(controller.set_display_async(
        fields.phone(),
        "+1 (306) 277-61",
        &masks,
        Some(&phone),
    ))
    .expect("set display");
    assert_eq!(
        controller.snapshot().expect("snapshot").model.phone,
        "+130627761"
    );
    assert_eq!(
        controller
            .display_value(fields.phone(), &masks, Some(&phone))
            .expect("display"),
        "+1 (306) 277-61"
    );
    assert_eq!(
        controller
            .display_value(fields.email(), &masks, None)
            .expect("display"),
        "user@example.com"
    );

    let unknown = Mask::preset("iban");
    assert!(matches!(
        controller.display_value(fields.phone(), &masks, Some(&unknown)),
        Err(FormError::Mask(_))
    ));
}

#[test]
fn required_fields_track_emptiness_per_value_kind() {
    let fields = ApplicantForm::fields();
    let controller =
        FormController::<ApplicantForm, TestError>::new(base_form(), FormOptions::default());

    controller
        .register_required_field(fields.nickname())
        .expect("register required option");
    controller
        .register_required_field(fields.tags())
        .expect("register required vec");
    assert!(controller.is_required(fields.nickname()).expect("is required"));
    assert!(!controller.is_required(fields.email()).expect("is required"));
    assert!(controller.snapshot().expect("snapshot").has_empty_required);

    controller
        .set(fields.nickname(), Some("neo".into()))
        .expect("set nickname");
    assert!(!controller.snapshot().expect("snapshot").has_empty_required);

    controller.set(fields.tags(), Vec::new()).expect("clear tags");
    assert!(controller.snapshot().expect("snapshot").has_empty_required);

    controller
        .set(fields.tags(), vec!["b".into()])
        .expect("refill tags");
    assert!(!controller.snapshot().expect("snapshot").has_empty_required);
}

#[test]
fn two_hundred_fields_update_invokes_single_validator_path() {
    let keys = (0..200)
        .map(|index| Box::leak(format!("field-{index}").into_boxed_str()) as &'static str)
        .collect::<Vec<_>>();

    let model = PerfForm {
        values: keys.iter().map(|key| (*key, String::new())).collect(),
    };

    let invoke_count = Arc::new(AtomicUsize::new(0));
    let controller = FormController::<PerfForm, TestError>::new(
        model,
        FormOptions {
            validate_mode: ValidationMode::OnChange,
            ..FormOptions::default()
        },
    );

    for key in &keys {
        let counter = invoke_count.clone();
        controller
            .register_field_validator(
                MapLens { key: *key },
                move |_model: &PerfForm, _value: &String| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .expect("register validator");
    }

    let target = keys[137];
    controller
        .set(MapLens { key: target }, "changed".into())
        .expect("update single field");

    let snapshot = controller.snapshot().expect("snapshot");
    assert_eq!(invoke_count.load(Ordering::SeqCst), 1);
    assert_eq!(snapshot.field_meta.len(), 1);
    assert!(
        snapshot
            .field_meta
            .get(&FieldKey::new(target))
            .expect("target meta")
            .error
            .is_none()
    );
}

#[test]
fn derive_macro_generates_field_lenses() {
    let fields = ApplicantForm::fields();
    assert_eq!(fields.email().key().as_str(), "email");
    assert_eq!(fields.first_name().key().as_str(), "first_name");
    assert_eq!(
        ApplicantForm::field_keys()
            .into_iter()
            .map(FieldKey::as_str)
            .collect::<Vec<_>>(),
        vec![
            "email",
            "first_name",
            "last_name",
            "phone",
            "nickname",
            "tags"
        ]
    );
}

#[test]
fn derived_sanitizer_strips_markup_from_string_fields_only() {
    let mut model = base_form();
    model.email = "<a href=\"x\">user</a>@example.com".into();
    model.nickname = Some("<b>neo</b>".into());
    let clean = model.sanitized();
    assert_eq!(clean.email, "user@example.com");
    assert_eq!(clean.nickname.as_deref(), Some("<b>neo</b>"));
    assert_eq!(model.email, "<a href=\"x\">user</a>@example.com");
}
