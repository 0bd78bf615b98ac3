use super::MaskPreset;

pub const PHONE: &str = "phone";
pub const CREDIT_CARD: &str = "creditCard";
pub const POSTAL_CODE: &str = "postalCode";
pub const DATE: &str = "date";

const PHONE_DIGITS: usize = 11;
const CARD_DIGITS: usize = 16;
const POSTAL_CHARS: usize = 6;
const DATE_DIGITS: usize = 8;

fn digits(input: &str, cap: usize) -> String {
    input.chars().filter(char::is_ascii_digit).take(cap).collect()
}

/// Canadian phone number, `+1 (306) 277-6103`. Raw values keep the leading `+`.
pub fn phone_preset() -> MaskPreset {
    MaskPreset::new(format_phone, parse_phone)
        .placeholder("+1 (555) 555-5555")
        .max_length(17)
        .max_raw_length(PHONE_DIGITS)
}

fn format_phone(raw: &str) -> String {
    let digits = digits(raw, PHONE_DIGITS);
    let len = digits.len();
    match len {
        0 => String::new(),
        1 => format!("+{digits}"),
        2..=4 => format!("+{} ({}", &digits[..1], &digits[1..]),
        5..=7 => format!("+{} ({}) {}", &digits[..1], &digits[1..4], &digits[4..]),
        _ => format!(
            "+{} ({}) {}-{}",
            &digits[..1],
            &digits[1..4],
            &digits[4..7],
            &digits[7..]
        ),
    }
}

fn parse_phone(display: &str) -> String {
    let digits = digits(display, PHONE_DIGITS);
    if digits.is_empty() {
        digits
    } else {
        format!("+{digits}")
    }
}

pub fn credit_card_preset() -> MaskPreset {
    MaskPreset::new(format_credit_card, |display| digits(display, CARD_DIGITS))
        .placeholder("0000 0000 0000 0000")
        .max_length(19)
        .max_raw_length(CARD_DIGITS)
}

fn format_credit_card(raw: &str) -> String {
    let digits = digits(raw, CARD_DIGITS);
    digits
        .as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canadian postal code, `A1A 1A1`.
pub fn postal_code_preset() -> MaskPreset {
    MaskPreset::new(format_postal_code, parse_postal_code)
        .placeholder("A1A 1A1")
        .max_length(7)
        .max_raw_length(POSTAL_CHARS)
}

fn parse_postal_code(display: &str) -> String {
    display
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .take(POSTAL_CHARS)
        .collect()
}

fn format_postal_code(raw: &str) -> String {
    let cleaned = parse_postal_code(raw);
    if cleaned.len() > 3 {
        format!("{} {}", &cleaned[..3], &cleaned[3..])
    } else {
        cleaned
    }
}

/// `MM/DD/YYYY`.
pub fn date_preset() -> MaskPreset {
    MaskPreset::new(format_date, |display| digits(display, DATE_DIGITS))
        .placeholder("MM/DD/YYYY")
        .max_length(10)
        .max_raw_length(DATE_DIGITS)
}

fn format_date(raw: &str) -> String {
    let digits = digits(raw, DATE_DIGITS);
    match digits.len() {
        0..=2 => digits,
        3..=4 => format!("{}/{}", &digits[..2], &digits[2..]),
        _ => format!("{}/{}/{}", &digits[..2], &digits[2..4], &digits[4..]),
    }
}
