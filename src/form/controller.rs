use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::validation::{FieldLens, FieldValue, FormModel, ValidationError};
use crate::mask::MaskError;

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
    pub focus_first_error_on_submit: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnChange,
            focus_first_error_on_submit: true,
        }
    }
}

/// Where a field sits in its validation lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldStatus {
    Valid,
    Invalid,
    Validating,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldMeta<E> {
    pub dirty: bool,
    pub touched: bool,
    pub validating: bool,
    pub error: Option<E>,
}

impl<E> FieldMeta<E> {
    pub fn status(&self) -> FieldStatus {
        if self.validating {
            FieldStatus::Validating
        } else if self.error.is_some() {
            FieldStatus::Invalid
        } else {
            FieldStatus::Valid
        }
    }
}

impl<E> Default for FieldMeta<E> {
    fn default() -> Self {
        Self {
            dirty: false,
            touched: false,
            validating: false,
            error: None,
        }
    }
}

/// A failed submission as surfaced to the user.
///
/// `message` is `None` when the underlying error carried no text; the view
/// then shows a generic fallback.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubmitFailure {
    pub message: Option<String>,
}

impl SubmitFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// The submit gate was closed; nothing ran.
    Blocked,
    /// Full validation found errors; the collaborator was not called.
    Invalid,
    /// The model was edited while submit-time validation ran, so the checked
    /// values are stale. Nothing was sent.
    Superseded,
    Succeeded,
    Failed(SubmitFailure),
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T, E> {
    pub model: T,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub submit_error: Option<SubmitFailure>,
    pub is_dirty: bool,
    pub is_valid: bool,
    pub is_validating: bool,
    pub has_empty_required: bool,
    pub first_error: Option<FieldKey>,
    pub field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
}

impl<T, E> FormSnapshot<T, E> {
    pub fn is_submitting(&self) -> bool {
        self.submit_state == SubmitState::Submitting
    }

    pub fn is_success(&self) -> bool {
        self.submit_state == SubmitState::Succeeded
    }

    pub fn is_submit_disabled(&self) -> bool {
        !self.is_valid || self.has_empty_required || self.is_submitting() || self.is_validating
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    AlreadySubmitting,
    Mask(MaskError),
}

impl From<MaskError> for FormError {
    fn from(error: MaskError) -> Self {
        FormError::Mask(error)
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::Mask(error) => write!(f, "mask misconfigured: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SyncFieldValidatorFn<T, E> = Arc<dyn Fn(&T) -> Result<(), E> + Send + Sync>;
pub(super) type AsyncFieldValidatorFn<T, E> =
    Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'static>> + Send + Sync>;
pub(super) type EmptinessCheck<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

#[derive(Clone)]
pub(super) struct AsyncFieldValidatorEntry<T, E> {
    pub(super) debounce: Duration,
    pub(super) validator: AsyncFieldValidatorFn<T, E>,
}

pub(super) struct FormState<T, E> {
    pub(super) id: FormId,
    pub(super) initial_model: T,
    pub(super) model: T,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) submit_error: Option<SubmitFailure>,
    pub(super) dirty_fields: BTreeSet<FieldKey>,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
    pub(super) tickets: BTreeMap<FieldKey, ValidationTicket>,
    /// Bumped by every write through [`FormController::set`].
    pub(super) edits: u64,
    pub(super) first_error: Option<FieldKey>,
}

impl<T, E> FormState<T, E> {
    pub(super) fn ensure_meta(&mut self, key: FieldKey) -> &mut FieldMeta<E> {
        self.field_meta.entry(key).or_default()
    }

    /// Invalidates any in-flight async result for `key`.
    pub(super) fn bump_ticket(&mut self, key: FieldKey) -> ValidationTicket {
        let next = ValidationTicket(self.tickets.get(&key).map_or(0, |ticket| ticket.0) + 1);
        self.tickets.insert(key, next);
        next
    }

    fn reset_fields(&mut self)
    where
        T: Clone,
    {
        self.model = self.initial_model.clone();
        self.dirty_fields.clear();
        self.first_error = None;
        let keys = self.field_meta.keys().copied().collect::<Vec<_>>();
        for key in keys {
            self.bump_ticket(key);
        }
        for meta in self.field_meta.values_mut() {
            *meta = FieldMeta::default();
        }
    }
}

#[derive(Clone)]
pub struct FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub(super) options: FormOptions,
    pub(super) state: Arc<RwLock<FormState<T, E>>>,
    pub(super) sync_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<SyncFieldValidatorFn<T, E>>>>>,
    pub(super) async_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<AsyncFieldValidatorEntry<T, E>>>>>,
    pub(super) required_fields: Arc<RwLock<BTreeMap<FieldKey, EmptinessCheck<T>>>>,
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn new(initial: T, options: FormOptions) -> Self {
        Self {
            options,
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                initial_model: initial.clone(),
                model: initial,
                submit_state: SubmitState::Idle,
                submit_count: 0,
                submit_error: None,
                dirty_fields: BTreeSet::new(),
                field_meta: BTreeMap::new(),
                tickets: BTreeMap::new(),
                edits: 0,
                first_error: None,
            })),
            sync_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            async_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            required_fields: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    /// Required fields gate submission while their value is empty.
    pub fn register_required_field<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
        L::Value: FieldValue,
    {
        let check: EmptinessCheck<T> =
            Arc::new(move |model: &T| lens.get(model).is_empty_value());
        let mut required = write_lock(&self.required_fields, "registering required field")?;
        required.insert(lens.key(), check);
        Ok(())
    }

    pub fn is_required<L>(&self, lens: L) -> FormResult<bool>
    where
        L: FieldLens<T>,
    {
        Ok(read_lock(&self.required_fields, "reading required fields")?.contains_key(&lens.key()))
    }

    /// Submits the sanitized model through `f`.
    ///
    /// Refuses to start while the gate in [`FormSnapshot::is_submit_disabled`]
    /// is closed, re-runs every validator (async included), then calls `f`
    /// once with exactly the model that was validated. An edit landing while
    /// validation runs yields [`SubmitOutcome::Superseded`]. Success resets
    /// the form to its initial values; failure keeps the entered values and
    /// records the error until the next edit.
    pub async fn submit_async<F, Fut, Err>(&self, f: F) -> FormResult<SubmitOutcome>
    where
        T: FormModel,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), Err>>,
        Err: Into<SubmitFailure>,
    {
        if self.snapshot()?.is_submit_disabled() {
            return Ok(SubmitOutcome::Blocked);
        }

        let (validated, edits) = {
            let mut state = write_lock(&self.state, "preparing async submit")?;
            if state.submit_state == SubmitState::Submitting {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
            (state.model.clone(), state.edits)
        };

        let is_valid = self.validate_form_async().await?;

        let model = {
            let mut state = write_lock(&self.state, "moving async submit state to submitting")?;
            let outcome = if state.edits != edits {
                Some(SubmitOutcome::Superseded)
            } else if !is_valid {
                Some(SubmitOutcome::Invalid)
            } else {
                None
            };
            if let Some(outcome) = outcome {
                transition_submit_state(&mut state, SubmitState::Idle)?;
                return Ok(outcome);
            }
            transition_submit_state(&mut state, SubmitState::Submitting)?;
            validated.sanitized()
        };
        let submit_result = f(model).await;

        let mut state = write_lock(&self.state, "completing async submit")?;
        match submit_result {
            Ok(()) => {
                transition_submit_state(&mut state, SubmitState::Succeeded)?;
                state.reset_fields();
                state.submit_count = 0;
                Ok(SubmitOutcome::Succeeded)
            }
            Err(error) => {
                let failure = error.into();
                transition_submit_state(&mut state, SubmitState::Failed)?;
                state.submit_error = Some(failure.clone());
                Ok(SubmitOutcome::Failed(failure))
            }
        }
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T, E>> {
        let required = read_lock(&self.required_fields, "reading required fields for snapshot")?;
        let state = read_lock(&self.state, "creating form snapshot")?;
        let is_valid = state.field_meta.values().all(|meta| meta.error.is_none());
        let is_validating = state.field_meta.values().any(|meta| meta.validating);
        let has_empty_required = required.values().any(|is_empty| is_empty(&state.model));
        Ok(FormSnapshot {
            model: state.model.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            submit_error: state.submit_error.clone(),
            is_dirty: !state.dirty_fields.is_empty(),
            is_valid,
            is_validating,
            has_empty_required,
            first_error: state.first_error,
            field_meta: state.field_meta.clone(),
        })
    }
}

pub(super) fn transition_submit_state<T, E>(
    state: &mut FormState<T, E>,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Validating)
            | (SubmitState::Failed, SubmitState::Validating)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(super) fn first_error_key<E>(
    field_meta: &BTreeMap<FieldKey, FieldMeta<E>>,
) -> Option<FieldKey> {
    field_meta
        .iter()
        .find_map(|(key, meta)| meta.error.is_some().then_some(*key))
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
