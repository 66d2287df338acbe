//! Builders
//!
//! Fluent builder patterns for OAuth2 and query configuration.

pub mod config;

pub use config::{
    oauth2_config, query_config, OAuth2ConfigBuilder, QueryConfigBuilder, DEFAULT_DAYS,
    DEFAULT_METRIC, DEFAULT_OUTPUT_FILE,
};
