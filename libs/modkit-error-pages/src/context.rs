//! Everything an error renderer needs to know about one failed request.

use std::sync::Arc;

use crate::fault::Throwable;
use crate::request::ErrorRequest;

/// One user-facing error, e.g. a single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubError {
    pub message: String,
    /// Field or JSON path the error refers to.
    pub path: Option<String>,
}

impl SubError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl From<String> for SubError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SubError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Immutable snapshot of request, root cause and sub-errors.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    request: ErrorRequest,
    root_cause: Option<Arc<dyn Throwable>>,
    errors: Vec<SubError>,
}

impl ErrorContext {
    pub fn builder(request: ErrorRequest) -> ErrorContextBuilder {
        ErrorContextBuilder {
            request,
            root_cause: None,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn request(&self) -> &ErrorRequest {
        &self.request
    }

    #[must_use]
    pub fn root_cause(&self) -> Option<&dyn Throwable> {
        self.root_cause.as_deref()
    }

    #[must_use]
    pub fn errors(&self) -> &[SubError] {
        &self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Accumulates the root cause and sub-errors of an [`ErrorContext`].
#[derive(Debug)]
#[must_use]
pub struct ErrorContextBuilder {
    request: ErrorRequest,
    root_cause: Option<Arc<dyn Throwable>>,
    errors: Vec<SubError>,
}

impl ErrorContextBuilder {
    /// Set or replace the root cause.
    pub fn cause(mut self, cause: Option<Arc<dyn Throwable>>) -> Self {
        self.root_cause = cause;
        self
    }

    /// Shorthand for `cause(Some(Arc::new(fault)))`.
    pub fn fault<T: Throwable + 'static>(self, fault: T) -> Self {
        self.cause(Some(Arc::new(fault)))
    }

    pub fn error(mut self, error: SubError) -> Self {
        self.errors.push(error);
        self
    }

    /// Append a message without a path.
    pub fn error_message(self, message: impl Into<String>) -> Self {
        self.error(SubError::new(message))
    }

    pub fn errors<I>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = SubError>,
    {
        self.errors.extend(errors);
        self
    }

    pub fn error_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors.extend(messages.into_iter().map(SubError::new));
        self
    }

    pub fn build(self) -> ErrorContext {
        ErrorContext {
            request: self.request,
            root_cause: self.root_cause,
            errors: self.errors,
        }
    }
}
