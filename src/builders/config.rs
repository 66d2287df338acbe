//! Configuration Builder
//!
//! Fluent builders for OAuth2 and query configuration.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{AnalyticsError, ConfigurationError};
use crate::types::{
    with_namespace, GrantType, OAuth2Config, PollPolicy, QueryConfig,
    DEFAULT_DEVICE_AUTHORIZATION_ENDPOINT, DEFAULT_SCOPE, DEFAULT_TIMEOUT_MS,
    DEFAULT_TOKEN_ENDPOINT,
};

/// Metric queried when none is given.
pub const DEFAULT_METRIC: &str = "ga:sessions";
/// Date window length when none is given.
pub const DEFAULT_DAYS: u32 = 30;
/// Report file when none is given.
pub const DEFAULT_OUTPUT_FILE: &str = "browsers.json";

fn validate_endpoint(url: &str) -> Result<(), AnalyticsError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AnalyticsError::Configuration(ConfigurationError::InvalidEndpoint {
            url: url.to_string(),
        })),
    }
}

fn invalid(message: impl Into<String>) -> AnalyticsError {
    AnalyticsError::Configuration(ConfigurationError::InvalidConfig {
        message: message.into(),
    })
}

/// OAuth2 configuration builder.
pub struct OAuth2ConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    device_authorization_endpoint: String,
    token_endpoint: String,
    scope: String,
    device_grant_type: GrantType,
    timeout: Duration,
    poll_policy: PollPolicy,
}

impl Default for OAuth2ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuth2ConfigBuilder {
    /// Create new configuration builder with Google endpoints.
    pub fn new() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            device_authorization_endpoint: DEFAULT_DEVICE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            device_grant_type: GrantType::DeviceCode,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_policy: PollPolicy::default(),
        }
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set device authorization endpoint.
    pub fn device_authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.device_authorization_endpoint = endpoint.into();
        self
    }

    /// Set token endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Use the pre-RFC 8628 device grant type.
    pub fn legacy_device_grant(mut self) -> Self {
        self.device_grant_type = GrantType::LegacyDeviceCode;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    /// Build the OAuth2 configuration.
    pub fn build(self) -> Result<OAuth2Config, AnalyticsError> {
        let client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AnalyticsError::Configuration(ConfigurationError::MissingRequired {
                    field: "client_id".to_string(),
                })
            })?;

        validate_endpoint(&self.device_authorization_endpoint)?;
        validate_endpoint(&self.token_endpoint)?;

        if self.scope.trim().is_empty() {
            return Err(invalid("scope must not be empty"));
        }

        Ok(OAuth2Config {
            client_id,
            client_secret: self.client_secret,
            device_authorization_endpoint: self.device_authorization_endpoint,
            token_endpoint: self.token_endpoint,
            scope: self.scope,
            device_grant_type: self.device_grant_type,
            timeout: self.timeout,
            poll_policy: self.poll_policy,
        })
    }
}

/// Create a new OAuth2 configuration builder.
pub fn oauth2_config() -> OAuth2ConfigBuilder {
    OAuth2ConfigBuilder::new()
}

/// Query configuration builder.
pub struct QueryConfigBuilder {
    view_id: Option<String>,
    metric: String,
    days: u32,
    threshold: f64,
    output_file: PathBuf,
}

impl Default for QueryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryConfigBuilder {
    pub fn new() -> Self {
        Self {
            view_id: None,
            metric: DEFAULT_METRIC.to_string(),
            days: DEFAULT_DAYS,
            threshold: 0.0,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }

    /// Set the view id, with or without the `ga:` prefix.
    pub fn view_id(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    /// Set the metric, with or without the `ga:` prefix.
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Minimum percent-of-total (exclusive) for an entry to be reported.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn output_file(mut self, output_file: impl Into<PathBuf>) -> Self {
        self.output_file = output_file.into();
        self
    }

    /// Build the query configuration.
    pub fn build(self) -> Result<QueryConfig, AnalyticsError> {
        let view_id = self
            .view_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && id != "ga:")
            .ok_or_else(|| {
                AnalyticsError::Configuration(ConfigurationError::MissingRequired {
                    field: "view_id".to_string(),
                })
            })?;

        let metric = self.metric.trim();
        if metric.is_empty() || metric == "ga:" {
            return Err(AnalyticsError::Configuration(ConfigurationError::MissingRequired {
                field: "metric".to_string(),
            }));
        }

        if self.days == 0 {
            return Err(invalid("days must be at least 1"));
        }

        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(invalid(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }

        if self.output_file.as_os_str().is_empty() {
            return Err(AnalyticsError::Configuration(ConfigurationError::MissingRequired {
                field: "output_file".to_string(),
            }));
        }

        Ok(QueryConfig {
            view_id: with_namespace(&view_id),
            metric: with_namespace(metric),
            days: self.days,
            threshold: self.threshold,
            output_file: self.output_file,
        })
    }
}

/// Create a new query configuration builder.
pub fn query_config() -> QueryConfigBuilder {
    QueryConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth2_builder_defaults() {
        let config = oauth2_config()
            .client_id("test-client")
            .client_secret("test-secret")
            .build()
            .unwrap();

        assert_eq!(config.client_id, "test-client");
        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.device_grant_type, GrantType::DeviceCode);
    }

    #[test]
    fn test_oauth2_builder_missing_client_id() {
        let result = oauth2_config().client_secret("test-secret").build();

        assert!(matches!(
            result,
            Err(AnalyticsError::Configuration(ConfigurationError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_oauth2_builder_rejects_bad_endpoint() {
        let result = oauth2_config()
            .client_id("test-client")
            .token_endpoint("not a url")
            .build();

        assert!(matches!(
            result,
            Err(AnalyticsError::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_oauth2_builder_legacy_grant() {
        let config = oauth2_config()
            .client_id("test-client")
            .legacy_device_grant()
            .build()
            .unwrap();

        assert_eq!(config.device_grant_type, GrantType::LegacyDeviceCode);
    }

    #[test]
    fn test_query_builder_normalizes_prefix() {
        let config = query_config()
            .view_id("42124519")
            .metric("users")
            .days(7)
            .threshold(0.5)
            .output_file("out/report.json")
            .build()
            .unwrap();

        assert_eq!(config.view_id, "ga:42124519");
        assert_eq!(config.metric, "ga:users");
        assert_eq!(config.days, 7);
        assert_eq!(config.output_file, PathBuf::from("out/report.json"));
    }

    #[test]
    fn test_query_builder_defaults() {
        let config = query_config().view_id("ga:1").build().unwrap();

        assert_eq!(config.metric, DEFAULT_METRIC);
        assert_eq!(config.days, DEFAULT_DAYS);
        assert_eq!(config.threshold, 0.0);
        assert_eq!(config.output_file, PathBuf::from(DEFAULT_OUTPUT_FILE));
    }

    #[test]
    fn test_query_builder_validation() {
        assert!(query_config().build().is_err());
        assert!(query_config().view_id("  ").build().is_err());
        assert!(query_config().view_id("1").days(0).build().is_err());
        assert!(query_config().view_id("1").threshold(-0.1).build().is_err());
        assert!(query_config().view_id("1").threshold(f64::NAN).build().is_err());
        assert!(query_config().view_id("1").metric("").build().is_err());
    }
}
