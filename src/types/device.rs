//! Device Authorization Types
//!
//! Types for the OAuth2 Device Authorization Grant (RFC 8628).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TokenResponse;
use crate::error::AnalyticsError;

/// Device authorization response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// Device verification code (not shown to user).
    pub device_code: String,
    /// User code to display.
    pub user_code: String,
    /// URL for the user to visit. Google names it `verification_url`.
    #[serde(alias = "verification_uri")]
    pub verification_url: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Minimum polling interval in seconds.
    #[serde(default)]
    pub interval: Option<u64>,
}

impl DeviceAuthorizationResponse {
    /// Get polling interval (default 5 seconds per RFC 8628).
    pub fn polling_interval(&self) -> u64 {
        self.interval.unwrap_or(5)
    }
}

/// State of one device authorization attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub poll_interval: Duration,
    pub expires_in: Option<Duration>,
}

impl From<DeviceAuthorizationResponse> for DeviceSession {
    fn from(response: DeviceAuthorizationResponse) -> Self {
        Self {
            poll_interval: Duration::from_secs(response.polling_interval()),
            expires_in: response.expires_in.map(Duration::from_secs),
            device_code: response.device_code,
            user_code: response.user_code,
            verification_url: response.verification_url,
        }
    }
}

/// Result of a single device token poll.
#[derive(Debug)]
pub enum DeviceTokenResult {
    /// Token received successfully.
    Success(TokenResponse),
    /// Authorization still pending (user hasn't completed yet).
    Pending,
    /// Slow down - increase polling interval.
    SlowDown,
    /// Device code expired.
    Expired,
    /// Access denied by user.
    AccessDenied { error_description: Option<String> },
    /// Anything else the provider or transport reported.
    Error(AnalyticsError),
}
