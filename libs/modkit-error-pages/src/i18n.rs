//! Locale resolution and message bundles for human-readable error copy.

use std::collections::HashMap;

use crate::request::ErrorRequest;

/// Picks the locale of a request.
pub trait LocaleResolver: Send + Sync {
    /// Locale tag for the request, or `None` when it cannot be determined.
    fn resolve(&self, request: &ErrorRequest) -> Option<String>;

    fn default_locale(&self) -> &str;

    fn resolve_or_default(&self, request: &ErrorRequest) -> String {
        self.resolve(request)
            .unwrap_or_else(|| self.default_locale().to_owned())
    }
}

/// Uses the highest-weighted `Accept-Language` entry.
#[derive(Debug, Clone)]
pub struct AcceptLanguageLocaleResolver {
    default_locale: String,
}

impl AcceptLanguageLocaleResolver {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
        }
    }
}

impl LocaleResolver for AcceptLanguageLocaleResolver {
    fn resolve(&self, request: &ErrorRequest) -> Option<String> {
        let mut best: Option<(&str, f32)> = None;
        for value in request.accept_language_values() {
            let mut parts = value.split(';').map(str::trim);
            let tag = parts.next().unwrap_or_default();
            if tag.is_empty() || tag == "*" || !is_language_tag(tag) {
                continue;
            }
            let weight = parts
                .find_map(|p| p.strip_prefix("q="))
                .map_or(Some(1.0), |q| q.parse::<f32>().ok());
            let Some(weight) = weight else {
                continue;
            };
            if weight > 0.0 && best.is_none_or(|(_, w)| weight > w) {
                best = Some((tag, weight));
            }
        }
        best.map(|(tag, _)| tag.to_ascii_lowercase())
    }

    fn default_locale(&self) -> &str {
        &self.default_locale
    }
}

fn is_language_tag(tag: &str) -> bool {
    tag.split('-')
        .all(|sub| !sub.is_empty() && sub.len() <= 8 && sub.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// Always answers the same locale.
#[derive(Debug, Clone)]
pub struct FixedLocaleResolver {
    locale: String,
}

impl FixedLocaleResolver {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }
}

impl LocaleResolver for FixedLocaleResolver {
    fn resolve(&self, _request: &ErrorRequest) -> Option<String> {
        Some(self.locale.clone())
    }

    fn default_locale(&self) -> &str {
        &self.locale
    }
}

/// Read-only lookup of localized messages by code.
pub trait MessageSource: Send + Sync {
    fn message(&self, code: &str, locale: &str) -> Option<String>;

    fn message_or(&self, code: &str, default: &str, locale: &str) -> String {
        self.message(code, locale)
            .unwrap_or_else(|| default.to_owned())
    }
}

/// Message bundles keyed by locale tag.
///
/// Lookup order: exact tag, then its primary language (`pt-br` -> `pt`), then
/// the default locale.
#[derive(Debug, Clone, Default)]
pub struct BundleMessageSource {
    bundles: HashMap<String, HashMap<String, String>>,
    default_locale: String,
}

impl BundleMessageSource {
    pub fn new(
        bundles: HashMap<String, HashMap<String, String>>,
        default_locale: impl Into<String>,
    ) -> Self {
        let bundles = bundles
            .into_iter()
            .map(|(locale, messages)| (locale.to_ascii_lowercase(), messages))
            .collect();
        Self {
            bundles,
            default_locale: default_locale.into().to_ascii_lowercase(),
        }
    }

    fn lookup(&self, locale: &str, code: &str) -> Option<String> {
        self.bundles.get(locale)?.get(code).cloned()
    }
}

impl MessageSource for BundleMessageSource {
    fn message(&self, code: &str, locale: &str) -> Option<String> {
        let locale = locale.to_ascii_lowercase();
        self.lookup(&locale, code)
            .or_else(|| {
                let (language, _) = locale.split_once('-')?;
                self.lookup(language, code)
            })
            .or_else(|| self.lookup(&self.default_locale, code))
    }
}
