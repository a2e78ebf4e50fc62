#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Router-level behavior of `render_error_pages`.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use modkit_error_pages::{
    Environment, ErrorPagesConfig, ErrorResponseDispatcher, Fault, HandlerError, SubError,
    render_error_pages,
};
use tower::ServiceExt;

async fn boom() -> Result<&'static str, HandlerError> {
    Err(HandlerError::internal(
        Fault::new("shop.orders.Checkout")
            .with_message("Something went wrong!")
            .with_frame("shop.orders.Checkout.run(Checkout.rs:42)"),
    ))
}

async fn invalid() -> HandlerError {
    HandlerError::new(StatusCode::UNPROCESSABLE_ENTITY)
        .with_error(SubError::new("must not be blank").with_path("/name"))
}

async fn teapot() -> Response {
    (StatusCode::IM_A_TEAPOT, "short and stout").into_response()
}

async fn io_failure() -> Result<&'static str, HandlerError> {
    std::fs::read_to_string("/definitely/not/here")?;
    Ok("unreachable")
}

fn app(environment: Environment) -> Router {
    let dispatcher = Arc::new(ErrorResponseDispatcher::from_config(&ErrorPagesConfig {
        environment,
        ..ErrorPagesConfig::default()
    }));
    Router::new()
        .route("/boom", get(boom))
        .route("/invalid", get(invalid).post(invalid))
        .route("/teapot", get(teapot))
        .route("/io", get(io_failure))
        .layer(from_fn_with_state(dispatcher, render_error_pages))
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    accept: Option<&str>,
) -> (StatusCode, Option<String>, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    let res = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_owned());
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn raised_fault_becomes_json_document() {
    let (status, content_type, body) = send(
        app(Environment::Production),
        Method::GET,
        "/boom",
        Some("application/json"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["message"], "Something went wrong!");
    assert_eq!(doc["error"], "Internal Server Error");
    assert_eq!(doc["status"], 500);
    assert_eq!(doc["path"], "/boom");
    assert_eq!(doc["_links"]["self"]["href"], "/boom");
    assert!(doc.get("exception").is_none());
}

#[tokio::test]
async fn development_json_carries_exception() {
    let (_, _, body) = send(app(Environment::Development), Method::GET, "/boom", None).await;

    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["exception"]["type"], "shop.orders.Checkout");
    assert_eq!(doc["exception"]["message"], "Something went wrong!");
    assert_eq!(
        doc["exception"]["stackTrace"][0],
        "shop.orders.Checkout.run(Checkout.rs:42)"
    );
}

#[tokio::test]
async fn unknown_route_gets_html_for_browsers() {
    let (status, content_type, body) = send(
        app(Environment::Production),
        Method::GET,
        "/missing",
        Some("text/html,application/xhtml+xml,*/*;q=0.8"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert!(body.contains("<h2>404</h2>"));
    assert!(body.contains("the page is not available"));
}

#[tokio::test]
async fn method_not_allowed_is_rendered() {
    let (status, content_type, body) =
        send(app(Environment::Production), Method::POST, "/boom", None).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["message"], "Method Not Allowed");
}

#[tokio::test]
async fn sub_errors_keep_their_paths() {
    let (status, _, body) =
        send(app(Environment::Production), Method::GET, "/invalid", None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["message"], "must not be blank");
    assert_eq!(doc["path"], "/name");
}

#[tokio::test]
async fn head_requests_stay_bodiless() {
    let (status, content_type, body) = send(
        app(Environment::Development),
        Method::HEAD,
        "/missing",
        Some("text/html"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(content_type.is_none());
    assert!(body.is_empty());
}

#[tokio::test]
async fn handler_bodies_pass_through() {
    let (status, _, body) = send(
        app(Environment::Production),
        Method::GET,
        "/teapot",
        Some("text/html"),
    )
    .await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, "short and stout");
}

#[tokio::test]
async fn question_mark_converts_std_errors() {
    let (status, _, body) = send(
        app(Environment::Development),
        Method::GET,
        "/io",
        Some("application/json"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(doc["exception"]["type"].is_string());
    assert!(doc["message"].as_str().unwrap().contains("No such file"));
}
