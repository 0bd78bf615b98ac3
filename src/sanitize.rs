use std::sync::LazyLock;

use regex::Regex;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("markup pattern must compile")
});

/// Removes every HTML tag and comment, keeping the text content.
///
/// Applied only at the submission boundary; live input is never rewritten.
pub fn strip_html(value: &str) -> String {
    if !value.contains('<') {
        return value.to_string();
    }
    MARKUP.replace_all(value, "").into_owned()
}
