//! Human-readable error pages.
//!
//! Every page is a pure function of its [`HtmlRenderKey`], so rendered pages
//! are cached per key. Identical errors after the first one cost a key
//! derivation and a cache lookup.

mod key;
mod page;

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

pub use key::{Diagnostics, HtmlRenderKey};

use crate::config::{Environment, ErrorPagesConfig};
use crate::context::ErrorContext;
use crate::dispatch::ErrorBodyProvider;
use crate::error::RenderError;
use crate::fault::printed_stack_trace;
use crate::i18n::{AcceptLanguageLocaleResolver, BundleMessageSource, LocaleResolver, MessageSource};
use crate::reason_phrase;
use crate::sanitize::escape_html;
use crate::snippet::{CodeSnippet, SnippetExtractor, SourceLocator};
use crate::stack::{StackFrame, StackTraceFilter};

/// Content type of HTML error bodies.
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Capacity of the page cache; least recently used pages are evicted first.
pub const MAX_CACHED_PAGES: usize = 1024;

const REDACTED: &str = "******";

fn default_error_bold(status: u16) -> Option<&'static str> {
    match status {
        404 => Some("the page is not available"),
        413 => Some("The file or data you are trying to upload exceeds the allowed size"),
        _ => None,
    }
}

fn default_error(status: u16) -> Option<&'static str> {
    match status {
        404 => Some("You may have mistyped the address or the page may have moved"),
        413 => Some("Please try again with a smaller file"),
        _ => None,
    }
}

/// Renders and caches HTML error pages.
pub struct HtmlErrorBodyRenderer {
    environment: Environment,
    filter: StackTraceFilter,
    snippets: SnippetExtractor,
    locale_resolver: Arc<dyn LocaleResolver>,
    messages: Arc<dyn MessageSource>,
    redacted_headers: Vec<String>,
    cache: Cache<HtmlRenderKey, Arc<str>>,
}

impl HtmlErrorBodyRenderer {
    pub fn new(
        environment: Environment,
        filter: StackTraceFilter,
        snippets: SnippetExtractor,
        locale_resolver: Arc<dyn LocaleResolver>,
        messages: Arc<dyn MessageSource>,
    ) -> Self {
        Self {
            environment,
            filter,
            snippets,
            locale_resolver,
            messages,
            redacted_headers: Vec::new(),
            cache: Cache::builder()
                .max_capacity(MAX_CACHED_PAGES as u64)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
        }
    }

    /// Renderer with `Accept-Language` resolution and the configured bundles.
    pub fn from_config(config: &ErrorPagesConfig) -> Self {
        Self::new(
            config.environment.clone(),
            StackTraceFilter::from_config(&config.filter),
            SnippetExtractor::from_config(&config.source),
            Arc::new(AcceptLanguageLocaleResolver::new(&config.default_locale)),
            Arc::new(BundleMessageSource::new(
                config.messages.clone(),
                &config.default_locale,
            )),
        )
        .with_redacted_headers(config.redacted_headers.iter().map(String::as_str))
    }

    /// Header names whose values are masked in the request block.
    #[must_use]
    pub fn with_redacted_headers<'a, I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.redacted_headers = names.into_iter().map(str::to_ascii_lowercase).collect();
        self
    }

    #[must_use]
    pub fn with_source_locator(mut self, locator: Box<dyn SourceLocator>, context_lines: usize) -> Self {
        self.snippets = SnippetExtractor::new(locator, context_lines);
        self
    }

    /// Number of cached pages.
    #[must_use]
    pub fn cached_pages(&self) -> usize {
        self.cache.run_pending_tasks();
        usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX)
    }

    /// Rendered page for `ctx` answered with `status`, from cache when possible.
    ///
    /// # Errors
    /// Returns [`RenderError`] when the page cannot be assembled.
    pub fn page(&self, ctx: &ErrorContext, status: StatusCode) -> Result<Arc<str>, RenderError> {
        let key = self.render_key(ctx, status);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(status = key.status_code, "error page served from cache");
            return Ok(hit);
        }

        // Concurrent misses of one key wait for a single render.
        self.cache
            .try_get_with_by_ref(&key, || self.render(&key).map(Arc::from))
            .map_err(|e| RenderError::Format(*e))
    }

    /// Derive the cache key. Performs locale and message lookups only.
    #[must_use]
    pub fn render_key(&self, ctx: &ErrorContext, status: StatusCode) -> HtmlRenderKey {
        let code = status.as_u16();
        let locale = self.locale_resolver.resolve_or_default(ctx.request());
        let status_reason = escape_html(reason_phrase(status));

        let error_bold = self.localized(&format!("{code}.error.bold"), default_error_bold(code), &locale);
        let error = self.localized(&format!("{code}.error"), default_error(code), &locale);

        let messages = ctx
            .errors()
            .iter()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case(&status_reason))
            .map(escape_html)
            .collect();

        let diagnostics = (!self.environment.is_production()).then(|| self.diagnostics(ctx));

        HtmlRenderKey {
            locale,
            status_code: code,
            status_reason,
            error,
            error_bold,
            messages,
            diagnostics,
        }
    }

    fn localized(&self, code: &str, default: Option<&str>, locale: &str) -> Option<String> {
        let text = match default {
            Some(default) => Some(self.messages.message_or(code, default, locale)),
            None => self.messages.message(code, locale),
        };
        text.map(|t| escape_html(&t))
    }

    fn diagnostics(&self, ctx: &ErrorContext) -> Diagnostics {
        let request = ctx.request();
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                let name = name.as_str();
                let value = if self.redacted_headers.iter().any(|r| r == name) {
                    REDACTED.to_owned()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                };
                (name.to_owned(), value)
            })
            .collect();

        let trace = ctx
            .root_cause()
            .map(|cause| {
                let printed = printed_stack_trace(cause);
                self.filter.apply(printed.lines().map(str::trim_end))
            })
            .unwrap_or_default();

        Diagnostics {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            headers,
            trace,
        }
    }

    fn render(&self, key: &HtmlRenderKey) -> Result<String, fmt::Error> {
        tracing::debug!(status = key.status_code, locale = %key.locale, "rendering error page");
        let title = self
            .messages
            .message(&format!("{}.error.title", key.status_code), &key.locale)
            .map_or_else(|| key.status_reason.clone(), |t| escape_html(&t));
        let snippets = key
            .diagnostics
            .as_ref()
            .map(|d| self.collect_snippets(&d.trace))
            .unwrap_or_default();

        let mut html = String::with_capacity(4096);
        page::write_document(&mut html, key, &title, &snippets)?;
        Ok(html)
    }

    fn collect_snippets(&self, trace: &[String]) -> Vec<CodeSnippet> {
        trace
            .iter()
            .filter_map(|line| StackFrame::parse(line.trim()))
            .filter_map(|frame| self.snippets.extract(&frame))
            .collect()
    }
}

impl ErrorBodyProvider for HtmlErrorBodyRenderer {
    fn content_type(&self) -> &'static str {
        TEXT_HTML
    }

    fn body(&self, ctx: &ErrorContext, status: StatusCode) -> Result<String, RenderError> {
        self.page(ctx, status).map(|page| page.to_string())
    }
}
