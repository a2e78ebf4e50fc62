//! Demo server for the modkit error pages pipeline.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod logging;
pub mod routes;

pub use config::{AppConfig, ConfigError};
pub use routes::build_router;
