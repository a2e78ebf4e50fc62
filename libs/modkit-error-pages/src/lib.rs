//! Error response rendering for modkit services
//!
//! Given a failed request and the response about to be sent, this crate
//! attaches a body the client can use:
//! - JSON documents (`message`, `_links`, `status`, sub-errors and, in
//!   development, exception details with a filtered stack trace)
//! - HTML pages for browsers, localized and cached per render key, with request
//!   details and source snippets outside production
//!
//! [`ErrorResponseDispatcher`] picks the representation from the `Accept`
//! header. With the `axum` feature, [`middleware::render_error_pages`] wires
//! the dispatcher into a router.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fault;
pub mod html;
pub mod i18n;
pub mod json;
#[cfg(feature = "axum")]
pub mod middleware;
pub mod request;
pub mod sanitize;
pub mod snippet;
pub mod stack;

pub use config::{Environment, ErrorPagesConfig, FilterConfig, SourceConfig};
pub use context::{ErrorContext, ErrorContextBuilder, SubError};
pub use dispatch::{ErrorBodyProvider, ErrorResponseDispatcher, Representation, negotiate};
pub use error::RenderError;
pub use fault::{Fault, Throwable};
pub use html::{HtmlErrorBodyRenderer, HtmlRenderKey, TEXT_HTML};
pub use json::{APPLICATION_JSON, JsonErrorBodyRenderer, JsonErrorDocument};
#[cfg(feature = "axum")]
pub use middleware::{HandlerError, render_error_pages};
pub use request::ErrorRequest;

/// Reason phrase of `status`, `"Unknown"` for unregistered codes.
pub(crate) fn reason_phrase(status: http::StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}
