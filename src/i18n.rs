use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/onboarding_i18n_generated.rs"));
}

/// Narrow lookup the form engine depends on. User-facing text always goes
/// through a key; missing keys render as the key itself.
pub trait Translate: Send + Sync {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum Locale {
    #[default]
    System,
    Tag(String),
}

impl From<String> for Locale {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("system") {
            return Self::System;
        }
        Self::Tag(value.trim().to_string())
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

#[derive(Clone)]
pub struct I18nManager {
    catalog: Arc<I18nCatalog>,
    locale: Arc<RwLock<Locale>>,
}

impl Default for I18nManager {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nManager {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(I18nCatalog::load()),
            locale: Arc::new(RwLock::new(Locale::System)),
        }
    }

    pub fn with_locale(locale: impl Into<Locale>) -> Self {
        let manager = Self::new();
        manager.set_locale(locale);
        manager
    }

    pub fn locale(&self) -> Locale {
        self.locale
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_locale(&self, locale: impl Into<Locale>) {
        *self.locale.write().unwrap_or_else(PoisonError::into_inner) = locale.into();
    }

    pub fn default_locale(&self) -> &'static str {
        self.catalog.default_locale
    }

    pub fn available_locales(&self) -> Vec<&'static str> {
        let mut locales = self.catalog.locales.keys().copied().collect::<Vec<_>>();
        locales.sort_unstable();
        locales
    }

    pub fn resolved_locale(&self) -> &'static str {
        self.catalog
            .resolve_locale(self.requested_locale().as_deref())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn t(&self, key: &str) -> String {
        self.lookup(key).unwrap_or(key).to_string()
    }

    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        let raw = self.lookup(key).unwrap_or(key);
        if params.is_empty() {
            return raw.to_string();
        }
        format_template(raw, params)
    }

    fn requested_locale(&self) -> Option<String> {
        match self.locale() {
            Locale::System => system_locale(),
            Locale::Tag(tag) => Some(tag),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'static str> {
        let resolved = self.resolved_locale();
        self.catalog.lookup(resolved, key)
    }
}

impl Translate for I18nManager {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        self.t_with(key, params)
    }
}

#[cfg(feature = "i18n")]
fn system_locale() -> Option<String> {
    sys_locale::get_locale()
}

#[cfg(not(feature = "i18n"))]
fn system_locale() -> Option<String> {
    None
}

struct I18nCatalog {
    default_locale: &'static str,
    locales: HashMap<&'static str, HashMap<&'static str, &'static str>>,
    normalized_locale_lookup: HashMap<String, &'static str>,
    language_lookup: HashMap<String, &'static str>,
}

impl I18nCatalog {
    fn load() -> Self {
        let mut locales = HashMap::new();
        let mut normalized_locale_lookup = HashMap::new();
        let mut language_lookup = HashMap::new();
        let mut ambiguous_languages = HashSet::new();

        for (locale, entries) in generated::LOCALES.iter().copied() {
            let normalized = normalize_locale_tag(locale);
            normalized_locale_lookup.insert(normalized.clone(), locale);

            let language = language_of(&normalized);
            if let Some(existing) = language_lookup.get(&language) {
                if *existing != locale {
                    ambiguous_languages.insert(language.clone());
                }
            } else {
                language_lookup.insert(language, locale);
            }

            locales.insert(locale, entries.iter().copied().collect::<HashMap<_, _>>());
        }

        for language in ambiguous_languages {
            language_lookup.remove(&language);
        }

        if !locales.contains_key(generated::DEFAULT_LOCALE) {
            let normalized = normalize_locale_tag(generated::DEFAULT_LOCALE);
            locales.insert(generated::DEFAULT_LOCALE, HashMap::new());
            language_lookup
                .entry(language_of(&normalized))
                .or_insert(generated::DEFAULT_LOCALE);
            normalized_locale_lookup.insert(normalized, generated::DEFAULT_LOCALE);
        }

        Self {
            default_locale: generated::DEFAULT_LOCALE,
            locales,
            normalized_locale_lookup,
            language_lookup,
        }
    }

    fn resolve_locale(&self, requested: Option<&str>) -> &'static str {
        let Some(requested) = requested else {
            return self.default_locale;
        };

        let normalized = normalize_locale_tag(requested);
        if let Some(locale) = self.normalized_locale_lookup.get(&normalized) {
            return locale;
        }

        if let Some(locale) = self.language_lookup.get(&language_of(&normalized)) {
            return locale;
        }

        self.default_locale
    }

    fn lookup(&self, locale: &'static str, key: &str) -> Option<&'static str> {
        self.locales
            .get(locale)
            .and_then(|entries| entries.get(key).copied())
            .or_else(|| {
                self.locales
                    .get(self.default_locale)
                    .and_then(|entries| entries.get(key).copied())
            })
    }
}

fn language_of(normalized: &str) -> String {
    normalized.split('-').next().unwrap_or_default().to_string()
}

fn normalize_locale_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    let without_encoding = trimmed.split('.').next().unwrap_or(trimmed);
    let without_variant = without_encoding
        .split('@')
        .next()
        .unwrap_or(without_encoding);
    without_variant
        .replace('_', "-")
        .split('-')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

fn format_template(template: &str, params: &[(&str, &str)]) -> String {
    let values = params.iter().copied().collect::<HashMap<&str, &str>>();
    let mut output = String::with_capacity(template.len());
    let mut cursor = 0;

    while cursor < template.len() {
        let tail = &template[cursor..];
        let Some(open_rel) = tail.find('{') else {
            output.push_str(tail);
            break;
        };

        let open = cursor + open_rel;
        output.push_str(&template[cursor..open]);

        let token_start = open + 1;
        let Some(close_rel) = template[token_start..].find('}') else {
            output.push_str(&template[open..]);
            break;
        };
        let close = token_start + close_rel;
        let token = &template[token_start..close];

        if let Some(value) = values.get(token) {
            output.push_str(value);
        } else {
            output.push_str(&template[open..=close]);
        }

        cursor = close + 1;
    }

    output
}
