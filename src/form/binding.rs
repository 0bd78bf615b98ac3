use super::controller::{FieldKey, FormController, FormResult, read_lock};
use super::validation::{FieldLens, ValidationError};
use crate::i18n::Translate;
use crate::mask::{Mask, MaskRegistry};

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    /// The field's error once it should be shown: after the field was
    /// blurred, or after any submit attempt.
    pub fn field_error_for_display<L>(&self, lens: L) -> FormResult<Option<E>>
    where
        L: FieldLens<T>,
    {
        self.display_error(lens.key())
    }

    /// Current value as the user sees it, masked when the field has a mask.
    pub fn display_value<L>(
        &self,
        lens: L,
        masks: &MaskRegistry,
        mask: Option<&Mask>,
    ) -> FormResult<String>
    where
        L: FieldLens<T, Value = String>,
    {
        let raw = lens
            .get(&read_lock(&self.state, "reading display value")?.model)
            .clone();
        match mask {
            Some(mask) => Ok(masks.format(&raw, mask)?),
            None => Ok(raw),
        }
    }

    /// Parses a typed display string back to its raw form and stores it.
    pub async fn set_display_async<L>(
        &self,
        lens: L,
        display: &str,
        masks: &MaskRegistry,
        mask: Option<&Mask>,
    ) -> FormResult<()>
    where
        L: FieldLens<T, Value = String>,
    {
        let raw = match mask {
            Some(mask) => masks.parse(display, mask)?,
            None => display.to_string(),
        };
        self.set_async(lens, raw).await
    }

    pub(crate) fn display_error(&self, key: FieldKey) -> FormResult<Option<E>> {
        let state = read_lock(&self.state, "reading display error")?;
        let Some(meta) = state.field_meta.get(&key) else {
            return Ok(None);
        };
        if !meta.touched && state.submit_count == 0 {
            return Ok(None);
        }
        Ok(meta.error.clone())
    }
}

pub fn translate_error<E>(error: &E, translator: &dyn Translate) -> String
where
    E: ValidationError,
{
    let params = error.message_params();
    let params = params
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect::<Vec<_>>();
    translator.translate(error.message_key(), &params)
}
