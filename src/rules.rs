//! Pure, synchronous validation rules for the onboarding fields.

use crate::schema::OnboardingError;

pub const NAME_MAX_LENGTH: usize = 50;
pub const CORPORATION_NUMBER_LENGTH: usize = 9;

/// Structural plausibility of a Canadian (NANP) phone number.
///
/// Accepts ten digits, or eleven with a leading `1`. The area code cannot
/// start with `0` or `1`.
pub fn is_canadian_phone(value: &str) -> bool {
    let digits = value
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    let national = match digits.len() {
        11 if digits.starts_with('1') => &digits[1..],
        10 => digits.as_str(),
        _ => return false,
    };
    matches!(national.as_bytes().first(), Some(b'2'..=b'9'))
}

pub fn check_name(value: &str, max_length: usize) -> Result<(), OnboardingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OnboardingError::Required);
    }
    if trimmed.chars().count() > max_length {
        return Err(OnboardingError::MaxLength { max: max_length });
    }
    Ok(())
}

pub fn check_phone(value: &str) -> Result<(), OnboardingError> {
    if value.trim().is_empty() {
        return Err(OnboardingError::Required);
    }
    if !is_canadian_phone(value) {
        return Err(OnboardingError::InvalidPhone);
    }
    Ok(())
}

/// Format checks only. A value passing here is eligible for the remote check.
pub fn check_corporation_format(value: &str, length: usize) -> Result<(), OnboardingError> {
    if value.is_empty() {
        return Err(OnboardingError::Required);
    }
    if value.chars().count() != length {
        return Err(OnboardingError::CorporationLength { length });
    }
    if !value.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(OnboardingError::DigitsOnly);
    }
    Ok(())
}
