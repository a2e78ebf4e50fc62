//! Snapshot of the request that failed.

use http::header::{ACCEPT, ACCEPT_LANGUAGE};
use http::{HeaderMap, Method, Uri};

/// The parts of a failed request that error rendering needs.
///
/// Bodies are never captured: by the time an error is rendered the body has
/// usually been consumed, and it must not leak into diagnostic pages anyway.
#[derive(Debug, Clone)]
pub struct ErrorRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl ErrorRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Capture method, URI and headers from request parts.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
        )
    }

    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        Self::new(
            request.method().clone(),
            request.uri().clone(),
            request.headers().clone(),
        )
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Path component of the request URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw `Accept` values, one entry per comma separated element.
    pub fn accept_values(&self) -> impl Iterator<Item = &str> {
        self.header_elements(ACCEPT)
    }

    /// Raw `Accept-Language` values, one entry per comma separated element.
    pub fn accept_language_values(&self) -> impl Iterator<Item = &str> {
        self.header_elements(ACCEPT_LANGUAGE)
    }

    fn header_elements(&self, name: http::HeaderName) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(name)
            .into_iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}
