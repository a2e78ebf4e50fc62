use thiserror::Error;

/// Failure to produce an error body.
///
/// Unlike missing source snippets or message lookups, these are never
/// swallowed: the caller must answer with a server error instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RenderError {
    /// Writing into the page buffer failed
    #[error("failed to format error page: {0}")]
    Format(#[from] std::fmt::Error),

    /// JSON serialization of the error document failed
    #[error("failed to serialize error document: {0}")]
    Json(#[from] serde_json::Error),
}
