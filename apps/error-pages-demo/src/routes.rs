//! Demo endpoints exercising the error pipeline.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use modkit_error_pages::{
    ErrorPagesConfig, ErrorResponseDispatcher, Fault, HandlerError, SubError, render_error_pages,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("Something went wrong!")]
    SomethingWentWrong,
}

#[derive(Debug, Default, Deserialize)]
struct ContactForm {
    name: Option<String>,
    email: Option<String>,
}

/// Router with the demo routes, error pages and request tracing.
pub fn build_router(config: &ErrorPagesConfig) -> Router {
    let dispatcher = Arc::new(ErrorResponseDispatcher::from_config(config));

    Router::new()
        .route("/error", get(fail))
        .route("/create", post(create))
        .route("/validate", post(validate))
        .layer(from_fn_with_state(dispatcher, render_error_pages))
        .layer(TraceLayer::new_for_http())
}

#[allow(clippy::unused_async)]
async fn fail() -> Result<Json<Value>, HandlerError> {
    Err(DemoError::SomethingWentWrong.into())
}

#[allow(clippy::unused_async)]
async fn create() -> Json<Value> {
    Json(json!({ "created": true }))
}

#[allow(clippy::unused_async)]
async fn validate(body: Bytes) -> Result<Json<Value>, HandlerError> {
    let form: ContactForm = if body.is_empty() {
        ContactForm::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            HandlerError::new(StatusCode::BAD_REQUEST).with_fault(Fault::from_error(&e))
        })?
    };

    let mut error = HandlerError::new(StatusCode::UNPROCESSABLE_ENTITY);
    let mut invalid = false;
    for (field, value) in [("name", &form.name), ("email", &form.email)] {
        if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            error = error.with_error(
                SubError::new(format!("{field} is required")).with_path(format!("/{field}")),
            );
            invalid = true;
        }
    }
    if invalid {
        return Err(error);
    }

    Ok(Json(json!({ "valid": true })))
}
