//! Configuration Types
//!
//! OAuth2 client, polling, reporting endpoint and query configuration.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Google device authorization endpoint.
pub const DEFAULT_DEVICE_AUTHORIZATION_ENDPOINT: &str = "https://oauth2.googleapis.com/device/code";
/// Google token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Core Reporting API v3 data endpoint.
pub const DEFAULT_REPORTING_ENDPOINT: &str = "https://www.googleapis.com/analytics/v3/data/ga";
/// Read-only analytics scope.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
/// Namespace prefix used by the reporting API for view ids and metrics.
pub const API_NAMESPACE_PREFIX: &str = "ga:";

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// OAuth2 client configuration.
#[derive(Clone)]
pub struct OAuth2Config {
    /// Client identifier.
    pub client_id: String,
    /// Client secret (installed applications still send one).
    pub client_secret: Option<SecretString>,
    /// Device authorization endpoint URL.
    pub device_authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// Scope requested with the device code.
    pub scope: String,
    /// Grant type sent when exchanging a device code.
    pub device_grant_type: GrantType,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Device-code polling policy.
    pub poll_policy: PollPolicy,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            device_authorization_endpoint: DEFAULT_DEVICE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            device_grant_type: GrantType::DeviceCode,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_policy: PollPolicy::default(),
        }
    }
}

impl std::fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("device_authorization_endpoint", &self.device_authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("scope", &self.scope)
            .field("device_grant_type", &self.device_grant_type)
            .field("timeout", &self.timeout)
            .field("poll_policy", &self.poll_policy)
            .finish()
    }
}

/// Bounds applied while polling the token endpoint with a device code.
#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    /// Upper bound on total polling time, regardless of the code lifetime.
    pub max_elapsed: Duration,
    /// Interval increase applied on `slow_down`.
    pub slow_down_increment: Duration,
    /// Consecutive transient failures tolerated before giving up.
    pub max_consecutive_errors: u32,
    /// First backoff delay after a transient failure.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(30 * 60),
            slow_down_increment: Duration::from_secs(5),
            max_consecutive_errors: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
    RefreshToken,
    DeviceCode,
    /// Pre-RFC 8628 device grant still accepted by some providers.
    LegacyDeviceCode,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            Self::LegacyDeviceCode => "http://oauth.net/grant_type/device/1.0",
        }
    }
}

/// Reporting API client configuration.
#[derive(Clone, Debug)]
pub struct AnalyticsClientConfig {
    /// Data endpoint URL.
    pub reporting_endpoint: String,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl Default for AnalyticsClientConfig {
    fn default() -> Self {
        Self {
            reporting_endpoint: DEFAULT_REPORTING_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Parameters of one report run. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryConfig {
    /// View id, stored with the `ga:` prefix.
    pub view_id: String,
    /// Metric, stored with the `ga:` prefix.
    pub metric: String,
    /// Length of the date window ending yesterday.
    pub days: u32,
    /// Minimum percent-of-total an entry must exceed.
    pub threshold: f64,
    /// Where the finished report is written.
    pub output_file: PathBuf,
}

impl QueryConfig {
    /// View id without the API namespace prefix.
    pub fn bare_view_id(&self) -> &str {
        strip_namespace(&self.view_id)
    }

    /// Metric without the API namespace prefix.
    pub fn bare_metric(&self) -> &str {
        strip_namespace(&self.metric)
    }

    /// Human-readable date range.
    pub fn date_range(&self) -> String {
        format!("Last {} days", self.days)
    }
}

/// Ensure a value carries the `ga:` prefix.
pub fn with_namespace(value: &str) -> String {
    if value.starts_with(API_NAMESPACE_PREFIX) {
        value.to_string()
    } else {
        format!("{}{}", API_NAMESPACE_PREFIX, value)
    }
}

/// Remove the `ga:` prefix if present.
pub fn strip_namespace(value: &str) -> &str {
    value.strip_prefix(API_NAMESPACE_PREFIX).unwrap_or(value)
}
