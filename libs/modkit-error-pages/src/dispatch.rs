//! Content negotiation between JSON and HTML error bodies.

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Response, StatusCode};

use crate::config::ErrorPagesConfig;
use crate::context::ErrorContext;
use crate::error::RenderError;
use crate::html::HtmlErrorBodyRenderer;
use crate::json::JsonErrorBodyRenderer;
use crate::request::ErrorRequest;

/// Produces an error body of one content type.
pub trait ErrorBodyProvider: Send + Sync {
    /// Value of the `Content-Type` header for bodies of this provider.
    fn content_type(&self) -> &'static str;

    /// Render the body for `ctx` answered with `status`.
    ///
    /// # Errors
    /// Returns [`RenderError`] when the body cannot be produced.
    fn body(&self, ctx: &ErrorContext, status: StatusCode) -> Result<String, RenderError>;
}

/// Which representation an error response gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Json,
    Html,
}

/// Decide the representation for a request answered with `status`.
///
/// HTML requires an error status and an `Accept` list naming `text/html`
/// without any JSON-compatible alternative; everything else gets JSON.
#[must_use]
pub fn negotiate(request: &ErrorRequest, status: StatusCode) -> Representation {
    let is_error = status.as_u16() >= 400;
    if !is_error {
        return Representation::Json;
    }

    let mut wants_html = false;
    for value in request.accept_values() {
        let media: mime::Mime = match value.parse() {
            Ok(media) => media,
            Err(e) => {
                tracing::warn!(accept = %value, error = %e, "ignoring unparsable Accept entry");
                continue;
            }
        };
        if is_refused(&media) {
            continue;
        }
        if is_json_compatible(&media) {
            return Representation::Json;
        }
        wants_html |= media.type_() == mime::TEXT && media.subtype() == mime::HTML;
    }

    if wants_html {
        Representation::Html
    } else {
        Representation::Json
    }
}

/// `q=0` marks a type as not acceptable.
fn is_refused(media: &mime::Mime) -> bool {
    media
        .get_param("q")
        .and_then(|q| q.as_str().trim().parse::<f32>().ok())
        .is_some_and(|q| q <= 0.0)
}

fn is_json_compatible(media: &mime::Mime) -> bool {
    media.subtype() == mime::JSON || media.suffix() == Some(mime::JSON)
}

/// Attaches negotiated error bodies to responses.
#[derive(Clone)]
pub struct ErrorResponseDispatcher {
    json: Arc<dyn ErrorBodyProvider>,
    html: Arc<dyn ErrorBodyProvider>,
}

impl ErrorResponseDispatcher {
    pub fn new(json: Arc<dyn ErrorBodyProvider>, html: Arc<dyn ErrorBodyProvider>) -> Self {
        Self { json, html }
    }

    /// Dispatcher with the built-in JSON and HTML renderers.
    pub fn from_config(config: &ErrorPagesConfig) -> Self {
        Self::new(
            Arc::new(JsonErrorBodyRenderer::from_config(config)),
            Arc::new(HtmlErrorBodyRenderer::from_config(config)),
        )
    }

    /// Fill `response` with the error body for `ctx`.
    ///
    /// HEAD requests get the response back untouched.
    ///
    /// # Errors
    /// Returns [`RenderError`] when the selected renderer fails; the caller
    /// must answer with a server error instead of `response`.
    pub fn process(
        &self,
        ctx: &ErrorContext,
        mut response: Response<String>,
    ) -> Result<Response<String>, RenderError> {
        let request = ctx.request();
        if *request.method() == Method::HEAD {
            return Ok(response);
        }

        let status = response.status();
        let provider = match negotiate(request, status) {
            Representation::Html => &self.html,
            Representation::Json => &self.json,
        };

        *response.body_mut() = provider.body(ctx, status)?;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static(provider.content_type()),
        );
        Ok(response)
    }
}

impl std::fmt::Debug for ErrorResponseDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorResponseDispatcher")
            .field("json", &self.json.content_type())
            .field("html", &self.html.content_type())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::fault::Fault;
    use http::header::ACCEPT;

    struct Failing;

    impl ErrorBodyProvider for Failing {
        fn content_type(&self) -> &'static str {
            "text/html"
        }

        fn body(&self, _ctx: &ErrorContext, _status: StatusCode) -> Result<String, RenderError> {
            Err(RenderError::Format(std::fmt::Error))
        }
    }

    fn request(method: Method, accept: Option<&str>) -> ErrorRequest {
        let mut builder = http::Request::builder().method(method).uri("/error");
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }
        ErrorRequest::from_request(&builder.body(()).unwrap())
    }

    fn response(status: StatusCode) -> Response<String> {
        Response::builder()
            .status(status)
            .body(String::new())
            .unwrap()
    }

    fn dispatcher(environment: Environment) -> ErrorResponseDispatcher {
        ErrorResponseDispatcher::from_config(&ErrorPagesConfig {
            environment,
            ..ErrorPagesConfig::default()
        })
    }

    #[test]
    fn html_only_when_unambiguous() {
        let cases = [
            (None, Representation::Json),
            (Some("text/html"), Representation::Html),
            (Some("text/html,application/xhtml+xml,*/*;q=0.8"), Representation::Html),
            (Some("text/html, application/json"), Representation::Json),
            (Some("application/problem+json, text/html"), Representation::Json),
            (Some("application/json"), Representation::Json),
            (Some("*/*"), Representation::Json),
            (Some("text/plain"), Representation::Json),
            (Some("text/html;q=0"), Representation::Json),
            (Some("text/html;q=0.0, text/plain"), Representation::Json),
            (Some("application/json;q=0, text/html"), Representation::Html),
            (Some("text/html;q=0.5"), Representation::Html),
        ];
        for (accept, expected) in cases {
            let req = request(Method::GET, accept);
            assert_eq!(
                negotiate(&req, StatusCode::NOT_FOUND),
                expected,
                "{accept:?}"
            );
        }
    }

    #[test]
    fn non_error_status_gets_json() {
        let req = request(Method::GET, Some("text/html"));
        assert_eq!(negotiate(&req, StatusCode::OK), Representation::Json);
    }

    #[test]
    fn unparsable_accept_entries_are_ignored() {
        let req = request(Method::GET, Some("not a media type, text/html"));
        assert_eq!(negotiate(&req, StatusCode::NOT_FOUND), Representation::Html);
    }

    #[test]
    fn head_requests_are_left_untouched() {
        let dispatcher = dispatcher(Environment::Development);
        for accept in [None, Some("text/html"), Some("application/json")] {
            for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
                let ctx = ErrorContext::builder(request(Method::HEAD, accept))
                    .fault(Fault::new("demo.Boom"))
                    .build();
                let out = dispatcher.process(&ctx, response(status)).unwrap();
                assert!(out.body().is_empty());
                assert!(out.headers().get(CONTENT_TYPE).is_none());
                assert_eq!(out.status(), status);
            }
        }
    }

    #[test]
    fn browser_gets_html_page() {
        let ctx = ErrorContext::builder(request(Method::GET, Some("text/html"))).build();
        let out = dispatcher(Environment::Production)
            .process(&ctx, response(StatusCode::NOT_FOUND))
            .unwrap();

        assert_eq!(out.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(out.body().starts_with("<!doctype html>"));
    }

    #[test]
    fn api_client_gets_json_document() {
        let ctx = ErrorContext::builder(request(Method::GET, Some("application/json")))
            .error_message("Something went wrong!")
            .build();
        let out = dispatcher(Environment::Production)
            .process(&ctx, response(StatusCode::INTERNAL_SERVER_ERROR))
            .unwrap();

        assert_eq!(out.headers()[CONTENT_TYPE], "application/json");
        let value: serde_json::Value = serde_json::from_str(out.body()).unwrap();
        assert_eq!(value["message"], "Something went wrong!");
        assert_eq!(value["status"], 500);
    }

    #[test]
    fn render_failures_propagate() {
        let dispatcher = ErrorResponseDispatcher::new(
            Arc::new(JsonErrorBodyRenderer::from_config(&ErrorPagesConfig::default())),
            Arc::new(Failing),
        );
        let ctx = ErrorContext::builder(request(Method::GET, Some("text/html"))).build();
        let res = dispatcher.process(&ctx, response(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(matches!(res, Err(RenderError::Format(_))));
    }
}
