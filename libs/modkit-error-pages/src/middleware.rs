//! Axum integration: handlers raise [`HandlerError`]s, the
//! [`render_error_pages`] middleware turns every bodiless error response into
//! a negotiated error body.

use std::sync::Arc;

use axum::body::{Body, HttpBody};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::context::{ErrorContext, SubError};
use crate::dispatch::ErrorResponseDispatcher;
use crate::fault::{Fault, Throwable};
use crate::request::ErrorRequest;

/// Response extension left behind by a [`HandlerError`].
#[derive(Debug, Clone)]
pub struct RaisedFault {
    pub cause: Option<Arc<dyn Throwable>>,
    pub errors: Vec<SubError>,
}

/// Error returned by handlers; rendered later by [`render_error_pages`].
#[derive(Debug, Clone)]
#[must_use]
pub struct HandlerError {
    status: StatusCode,
    cause: Option<Arc<dyn Throwable>>,
    errors: Vec<SubError>,
}

impl HandlerError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            cause: None,
            errors: Vec::new(),
        }
    }

    /// 500 caused by `fault`, whose message becomes the only sub-error.
    pub fn internal<T: Throwable + 'static>(fault: T) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_fault(fault)
    }

    /// Attach `fault` as root cause; its message, if any, is added as a sub-error.
    pub fn with_fault<T: Throwable + 'static>(mut self, fault: T) -> Self {
        if let Some(message) = fault.message() {
            self.errors.push(SubError::new(message));
        }
        self.cause = Some(Arc::new(fault));
        self
    }

    pub fn with_error(mut self, error: SubError) -> Self {
        self.errors.push(error);
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + 'static,
{
    fn from(error: E) -> Self {
        Self::internal(Fault::from_error(&error).with_captured_backtrace())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        response.extensions_mut().insert(RaisedFault {
            cause: self.cause,
            errors: self.errors,
        });
        response
    }
}

/// Middleware rendering error bodies through `dispatcher`.
///
/// Error responses that carry a [`RaisedFault`], or that have no body (router
/// 404/405 and bare status codes), are rebuilt. Error responses with a body of
/// their own pass through untouched.
pub async fn render_error_pages(
    State(dispatcher): State<Arc<ErrorResponseDispatcher>>,
    request: Request,
    next: Next,
) -> Response {
    let snapshot = ErrorRequest::from_request(&request);
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let raised = response.extensions().get::<RaisedFault>().cloned();
    if raised.is_none() && response.body().size_hint().exact() != Some(0) {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.extensions.remove::<RaisedFault>();

    let builder = ErrorContext::builder(snapshot);
    let ctx = match raised {
        Some(raised) => builder.cause(raised.cause).errors(raised.errors),
        None => builder,
    }
    .build();

    match dispatcher.process(&ctx, Response::from_parts(parts, String::new())) {
        Ok(rendered) => rendered.map(Body::from),
        Err(e) => {
            tracing::error!(
                error = %e,
                status = status.as_u16(),
                path = %ctx.request().path(),
                "failed to render error response"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
