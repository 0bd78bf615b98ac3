use crate::form::{FieldKey, FormId};

/// Stable element id for a field's input.
pub fn field_input_id(form: FormId, key: FieldKey) -> String {
    format!("{}-{}", form_prefix(form), key.as_str().replace('_', "-"))
}

/// Element id of the error text, referenced by `aria-describedby`.
pub fn field_error_id(form: FormId, key: FieldKey) -> String {
    format!("{}-error", field_input_id(form, key))
}

fn form_prefix(form: FormId) -> String {
    let seed = format!("onboarding-form:{}", form.0);
    format!("form-{:08x}", fnv1a64(seed.as_bytes()) as u32)
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x00000100000001b3;

    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
