use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_timer::Delay;

use super::controller::{
    AsyncFieldValidatorEntry, AsyncFieldValidatorFn, FieldKey, FormController, FormResult,
    SubmitState, SyncFieldValidatorFn, ValidationMode, ValidationTicket, first_error_key,
    read_lock, write_lock,
};

/// A field error expressed as a translation key plus interpolation params.
pub trait ValidationError: Clone + Send + Sync + 'static {
    fn message_key(&self) -> &'static str;

    fn message_params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;

    fn field_keys() -> Vec<FieldKey> {
        Vec::new()
    }

    /// Copy of the model that is safe to hand to a downstream renderer.
    fn sanitized(&self) -> Self {
        self.clone()
    }
}

/// Values whose emptiness can gate submission.
pub trait FieldValue {
    fn is_empty_value(&self) -> bool;
}

impl FieldValue for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<V> FieldValue for Option<V> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<V> FieldValue for Vec<V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

pub trait FieldValidator<T, L, E>: Send + Sync
where
    L: FieldLens<T>,
    E: ValidationError,
{
    fn validate(&self, model: &T, value: &L::Value) -> Result<(), E>;
}

impl<T, L, E, F> FieldValidator<T, L, E> for F
where
    L: FieldLens<T>,
    E: ValidationError,
    F: for<'a> Fn(&'a T, &'a L::Value) -> Result<(), E> + Send + Sync,
{
    fn validate(&self, model: &T, value: &L::Value) -> Result<(), E> {
        (self)(model, value)
    }
}

pub type BoxedValidationFuture<'a, E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'a>>;

/// Second validation phase. Only entered once every sync validator of the
/// field has passed.
pub trait AsyncFieldValidator<T, L, E>: Send + Sync
where
    L: FieldLens<T>,
    E: ValidationError,
{
    type Fut<'a>: Future<Output = Result<(), E>> + Send + 'a
    where
        Self: 'a,
        T: 'a,
        L::Value: 'a;

    fn validate<'a>(&'a self, model: &'a T, value: &'a L::Value) -> Self::Fut<'a>;
}

impl<T, L, E, F> AsyncFieldValidator<T, L, E> for F
where
    L: FieldLens<T>,
    E: ValidationError,
    F: for<'a> Fn(&'a T, &'a L::Value) -> BoxedValidationFuture<'a, E> + Send + Sync,
{
    type Fut<'a>
        = BoxedValidationFuture<'a, E>
    where
        Self: 'a,
        T: 'a,
        L::Value: 'a;

    fn validate<'a>(&'a self, model: &'a T, value: &'a L::Value) -> Self::Fut<'a> {
        (self)(model, value)
    }
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    /// Validators of one field run in registration order; the first error wins.
    pub fn register_field_validator<L, V>(&self, lens: L, validator: V) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: FieldValidator<T, L, E> + 'static,
    {
        let key = lens.key();
        let validator = Arc::new(validator);
        let wrapped: SyncFieldValidatorFn<T, E> =
            Arc::new(move |model: &T| validator.validate(model, lens.get(model)));
        let mut validators =
            write_lock(&self.sync_field_validators, "registering field validator")?;
        validators.entry(key).or_default().push(wrapped);
        Ok(())
    }

    /// Registers the async phase of a field. A zero `debounce_ms` runs the
    /// check immediately.
    pub fn register_async_field_validator<L, V>(
        &self,
        lens: L,
        debounce_ms: u64,
        validator: V,
    ) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: AsyncFieldValidator<T, L, E> + 'static,
    {
        let key = lens.key();
        let validator = Arc::new(validator);
        let wrapped: AsyncFieldValidatorFn<T, E> = Arc::new(move |model: T| {
            let value = lens.get(&model).clone();
            let validator = validator.clone();
            Box::pin(async move { validator.validate(&model, &value).await })
        });
        let entry = AsyncFieldValidatorEntry {
            debounce: Duration::from_millis(debounce_ms),
            validator: wrapped,
        };
        let mut validators = write_lock(
            &self.async_field_validators,
            "registering async field validator",
        )?;
        validators.entry(key).or_default().push(entry);
        Ok(())
    }

    /// Writes a field value and runs the sync phase per [`ValidationMode`].
    ///
    /// Any edit acknowledges a previous submit failure and clears it. The
    /// field's ticket is bumped so a pending async result for the old value
    /// is discarded when it lands.
    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        {
            let mut state = write_lock(&self.state, "writing form model")?;
            lens.set(&mut state.model, value);
            state.edits = state.edits.wrapping_add(1);
            let is_dirty = lens.get(&state.model) != lens.get(&state.initial_model);
            if is_dirty {
                state.dirty_fields.insert(key);
            } else {
                state.dirty_fields.remove(&key);
            }
            state.bump_ticket(key);
            let meta = state.ensure_meta(key);
            meta.dirty = is_dirty;
            meta.validating = false;
            if state.submit_error.take().is_some() && state.submit_state == SubmitState::Failed {
                state.submit_state = SubmitState::Idle;
            }
        }

        if self.options.validate_mode == ValidationMode::OnChange {
            let _ = self.validate_field_by_key(key)?;
        }
        Ok(())
    }

    pub fn touch<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        {
            let mut state = write_lock(&self.state, "touching field")?;
            state.ensure_meta(key).touched = true;
        }

        if self.options.validate_mode == ValidationMode::OnBlur {
            let _ = self.validate_field_by_key(key)?;
        }
        Ok(())
    }

    pub async fn set_async<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.set(lens, value)?;
        if self.options.validate_mode == ValidationMode::OnChange {
            let _ = self.validate_field_async_by_key(key).await?;
        }
        Ok(())
    }

    pub async fn touch_async<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.touch(lens)?;
        if self.options.validate_mode == ValidationMode::OnBlur {
            let _ = self.validate_field_async_by_key(key).await?;
        }
        Ok(())
    }

    /// Sync phase for every registered field.
    pub fn validate_form(&self) -> FormResult<bool> {
        let model = {
            read_lock(&self.state, "reading model for form validation")?
                .model
                .clone()
        };
        let field_validators = read_lock(
            &self.sync_field_validators,
            "reading field validators for form validation",
        )?
        .clone();

        let mut field_errors = BTreeMap::<FieldKey, Option<E>>::new();
        for (key, validators) in field_validators {
            let error = validators
                .iter()
                .find_map(|validator| validator(&model).err());
            field_errors.insert(key, error);
        }

        {
            let mut state = write_lock(&self.state, "applying form validation result")?;
            let mut keys = state
                .field_meta
                .keys()
                .copied()
                .collect::<BTreeSet<FieldKey>>();
            keys.extend(field_errors.keys().copied());
            for key in keys {
                let meta = state.ensure_meta(key);
                meta.validating = false;
                meta.error = field_errors.remove(&key).flatten();
            }
            state.first_error = first_error_key(&state.field_meta);
        }

        Ok(self.snapshot()?.is_valid)
    }

    /// Both phases for the whole model. Async validators only run for fields
    /// whose sync phase passed. A check still pending when this returns
    /// counts as not valid.
    pub async fn validate_form_async(&self) -> FormResult<bool> {
        let _ = self.validate_form()?;
        let keys = read_lock(
            &self.async_field_validators,
            "reading async validator keys for form validation",
        )?
        .keys()
        .copied()
        .collect::<Vec<_>>();

        for key in keys {
            let _ = self.validate_field_async_by_key(key).await?;
        }

        let snapshot = self.snapshot()?;
        Ok(snapshot.is_valid && !snapshot.is_validating)
    }

    pub(super) fn validate_field_by_key(&self, key: FieldKey) -> FormResult<bool> {
        let model = {
            read_lock(&self.state, "reading model for field validation")?
                .model
                .clone()
        };
        let validators = {
            read_lock(
                &self.sync_field_validators,
                "reading field validators for key validation",
            )?
            .get(&key)
            .cloned()
            .unwrap_or_default()
        };

        let error = validators
            .iter()
            .find_map(|validator| validator(&model).err());

        let mut state = write_lock(&self.state, "writing field validation result")?;
        let meta = state.ensure_meta(key);
        meta.validating = false;
        meta.error = error;
        let is_valid = meta.error.is_none();
        state.first_error = first_error_key(&state.field_meta);
        Ok(is_valid)
    }

    pub(super) async fn validate_field_async_by_key(
        &self,
        key: FieldKey,
    ) -> FormResult<Vec<ValidationTicket>> {
        let validators = {
            read_lock(
                &self.async_field_validators,
                "reading registered async validators",
            )?
            .get(&key)
            .cloned()
            .unwrap_or_default()
        };

        let mut tickets = Vec::with_capacity(validators.len());
        for entry in validators {
            let started = {
                let mut state = write_lock(&self.state, "starting registered async validation")?;
                if state
                    .field_meta
                    .get(&key)
                    .is_some_and(|meta| meta.error.is_some())
                {
                    None
                } else {
                    let ticket = state.bump_ticket(key);
                    state.ensure_meta(key).validating = true;
                    Some((ticket, state.model.clone()))
                }
            };
            let Some((ticket, model)) = started else {
                break;
            };

            if !entry.debounce.is_zero() {
                Delay::new(entry.debounce).await;
                if !self.is_latest_ticket(key, ticket)? {
                    continue;
                }
            }

            let result = (entry.validator)(model).await;
            self.finish_async_validation(key, ticket, result)?;
            tickets.push(ticket);
        }
        Ok(tickets)
    }

    fn is_latest_ticket(&self, key: FieldKey, ticket: ValidationTicket) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking latest validation ticket")?
            .tickets
            .get(&key)
            .copied()
            == Some(ticket))
    }

    fn finish_async_validation(
        &self,
        key: FieldKey,
        ticket: ValidationTicket,
        result: Result<(), E>,
    ) -> FormResult<()> {
        let mut state = write_lock(&self.state, "finishing async validation")?;
        if state.tickets.get(&key).copied() != Some(ticket) {
            return Ok(());
        }
        let meta = state.ensure_meta(key);
        meta.validating = false;
        meta.error = result.err();
        state.first_error = first_error_key(&state.field_meta);
        Ok(())
    }
}
