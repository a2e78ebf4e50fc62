//! Error page configuration.
//!
//! Every field has a default so an empty configuration section is valid.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Deployment environment, which decides how much diagnostic detail is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Other(String),
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Environment {
    fn from(name: &str) -> Self {
        match name {
            "development" => Self::Development,
            "production" => Self::Production,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for Environment {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_owned()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_framework_prefix() -> String {
    "axum".to_owned()
}

fn default_transport_prefix() -> String {
    "hyper".to_owned()
}

fn default_unknown_source() -> String {
    crate::fault::UNKNOWN_SOURCE.to_owned()
}

/// Substrings that remove a frame from every rendered stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default = "default_framework_prefix")]
    pub framework_prefix: String,
    #[serde(default = "default_transport_prefix")]
    pub transport_prefix: String,
    #[serde(default = "default_unknown_source")]
    pub unknown_source: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            framework_prefix: default_framework_prefix(),
            transport_prefix: default_transport_prefix(),
            unknown_source: default_unknown_source(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_source_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_extension() -> String {
    "rs".to_owned()
}

fn default_context_lines() -> usize {
    3
}

/// Where source snippets are looked up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// When false, no snippet is ever rendered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_source_root")]
    pub root: PathBuf,
    /// File suffix appended to the type path, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Lines shown on each side of the failing line.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: default_source_root(),
            extension: default_extension(),
            context_lines: default_context_lines(),
        }
    }
}

fn default_locale() -> String {
    "en".to_owned()
}

fn default_redacted_headers() -> Vec<String> {
    ["authorization", "cookie", "proxy-authorization", "set-cookie"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Configuration of the whole error rendering pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorPagesConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub source: SourceConfig,
    /// Locale used when none can be resolved from the request.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Message bundles: locale tag -> message code -> text.
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
    /// Header names (case-insensitive) whose values are masked on diagnostic pages.
    #[serde(default = "default_redacted_headers")]
    pub redacted_headers: Vec<String>,
}

impl Default for ErrorPagesConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            filter: FilterConfig::default(),
            source: SourceConfig::default(),
            default_locale: default_locale(),
            messages: HashMap::new(),
            redacted_headers: default_redacted_headers(),
        }
    }
}
