//! Cache key of rendered HTML error pages.

/// Everything a rendered page depends on.
///
/// Two equal keys always render byte-identical pages, so the key is the only
/// input of the page renderer. All text fields are already HTML-escaped,
/// except `diagnostics`, which is escaped while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HtmlRenderKey {
    pub locale: String,
    pub status_code: u16,
    pub status_reason: String,
    /// Body copy, from `{code}.error` or the built-in defaults.
    pub error: Option<String>,
    /// Bold lead-in copy, from `{code}.error.bold` or the built-in defaults.
    pub error_bold: Option<String>,
    pub messages: Vec<String>,
    /// `None` in production.
    pub diagnostics: Option<Diagnostics>,
}

/// Request and stack details shown outside production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostics {
    pub method: String,
    pub uri: String,
    /// Header name/value pairs in request order, sensitive values masked.
    pub headers: Vec<(String, String)>,
    /// Printed stack trace lines that survived filtering.
    pub trace: Vec<String>,
}
