//! Machine-readable error bodies.

use chrono::{SecondsFormat, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::{Environment, ErrorPagesConfig};
use crate::context::ErrorContext;
use crate::dispatch::ErrorBodyProvider;
use crate::error::RenderError;
use crate::fault::{Throwable, cause_chain};
use crate::reason_phrase;
use crate::stack::StackTraceFilter;

/// Content type of JSON error bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// JSON error document returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonErrorDocument {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "_links")]
    pub links: Links,
    pub timestamp: String,
    pub status: u16,
    /// Reason phrase of `status`.
    pub error: String,
    /// Present only when the context carries more than one sub-error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<JsonSubError>>,
    /// Present only in development, when a root cause exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSubError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub stack_trace: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<CauseDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseDetails {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Renders [`JsonErrorDocument`]s.
#[derive(Debug, Clone)]
pub struct JsonErrorBodyRenderer {
    environment: Environment,
    filter: StackTraceFilter,
}

impl JsonErrorBodyRenderer {
    pub fn new(environment: Environment, filter: StackTraceFilter) -> Self {
        Self {
            environment,
            filter,
        }
    }

    pub fn from_config(config: &ErrorPagesConfig) -> Self {
        Self::new(
            config.environment.clone(),
            StackTraceFilter::from_config(&config.filter),
        )
    }

    /// Build the document for `ctx` answered with `status`.
    #[must_use]
    pub fn document(&self, ctx: &ErrorContext, status: StatusCode) -> JsonErrorDocument {
        let reason = reason_phrase(status);

        let (message, path, errors) = match ctx.errors() {
            [] => (reason.to_owned(), None, None),
            [single] => (single.message.clone(), single.path.clone(), None),
            many => {
                let errors = many
                    .iter()
                    .map(|e| JsonSubError {
                        message: e.message.clone(),
                        path: e.path.clone(),
                    })
                    .collect();
                (reason.to_owned(), None, Some(errors))
            }
        };

        let request = ctx.request();
        let path = path.unwrap_or_else(|| request.path().to_owned());

        let exception = if self.environment.is_development() {
            ctx.root_cause().map(|cause| self.exception_details(cause))
        } else {
            None
        };

        JsonErrorDocument {
            message,
            path: Some(path),
            links: Links {
                self_link: Link {
                    href: request.uri().to_string(),
                },
            },
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: status.as_u16(),
            error: reason.to_owned(),
            errors,
            exception,
        }
    }

    fn exception_details(&self, cause: &dyn Throwable) -> ExceptionDetails {
        ExceptionDetails {
            type_name: cause.type_name().to_owned(),
            message: cause.message().map(str::to_owned),
            stack_trace: self
                .filter
                .apply(cause.stack_trace().iter().map(String::as_str)),
            causes: cause_chain(cause)
                .into_iter()
                .map(|c| CauseDetails {
                    type_name: c.type_name,
                    message: c.message,
                })
                .collect(),
        }
    }
}

impl ErrorBodyProvider for JsonErrorBodyRenderer {
    fn content_type(&self) -> &'static str {
        APPLICATION_JSON
    }

    fn body(&self, ctx: &ErrorContext, status: StatusCode) -> Result<String, RenderError> {
        Ok(serde_json::to_string(&self.document(ctx, status))?)
    }
}
