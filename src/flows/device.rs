//! Device Authorization Flow
//!
//! RFC 8628 - OAuth 2.0 Device Authorization Grant.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{
    create_error_from_response, invalid_json, parse_error_response, AnalyticsError,
    DeviceFlowError,
};
use crate::resilience::Backoff;
use crate::telemetry::{AuthEvent, EventSink};
use crate::types::{
    DeviceAuthorizationResponse, DeviceSession, DeviceTokenResult, GrantType, OAuth2Config,
    TokenResponse,
};

/// Device Authorization Flow interface.
#[async_trait]
pub trait DeviceAuthorizationFlow: Send + Sync {
    /// Request device and user codes.
    async fn request_device_code(&self) -> Result<DeviceSession, AnalyticsError>;

    /// Poll the token endpoint once.
    async fn poll_for_token(&self, device_code: &str) -> DeviceTokenResult;

    /// Poll on the session's interval until a token is issued or polling must stop.
    async fn poll_until_complete(
        &self,
        session: &DeviceSession,
        events: &dyn EventSink,
    ) -> Result<TokenResponse, AnalyticsError>;
}

/// Device Authorization Flow implementation.
pub struct DeviceAuthorizationFlowImpl<T: HttpTransport> {
    config: OAuth2Config,
    transport: Arc<T>,
}

impl<T: HttpTransport> DeviceAuthorizationFlowImpl<T> {
    /// Create new Device Authorization Flow.
    pub fn new(config: OAuth2Config, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    fn build_token_request(&self, device_code: &str) -> Result<HttpRequest, AnalyticsError> {
        use secrecy::ExposeSecret;

        let code_param = match self.config.device_grant_type {
            GrantType::LegacyDeviceCode => "code",
            _ => "device_code",
        };

        let mut params = vec![
            ("grant_type", self.config.device_grant_type.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.expose_secret().as_str()));
        }
        params.push((code_param, device_code));

        HttpRequest::form_post(&self.config.token_endpoint, &params, self.config.timeout)
    }

    fn parse_poll_error(status: u16, body: &str) -> DeviceTokenResult {
        match parse_error_response(body) {
            Some(error_resp) => match error_resp.error.as_str() {
                "authorization_pending" => DeviceTokenResult::Pending,
                "slow_down" => DeviceTokenResult::SlowDown,
                "access_denied" => DeviceTokenResult::AccessDenied {
                    error_description: error_resp.error_description,
                },
                "expired_token" => DeviceTokenResult::Expired,
                _ => DeviceTokenResult::Error(create_error_from_response(status, body, "token")),
            },
            None => DeviceTokenResult::Error(create_error_from_response(status, body, "token")),
        }
    }

    /// Overall polling budget for a session.
    fn deadline(&self, session: &DeviceSession) -> Duration {
        let max_elapsed = self.config.poll_policy.max_elapsed;
        session
            .expires_in
            .map_or(max_elapsed, |expires_in| expires_in.min(max_elapsed))
    }
}

#[async_trait]
impl<T: HttpTransport> DeviceAuthorizationFlow for DeviceAuthorizationFlowImpl<T> {
    async fn request_device_code(&self) -> Result<DeviceSession, AnalyticsError> {
        let request = HttpRequest::form_post(
            &self.config.device_authorization_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scope.as_str()),
            ],
            self.config.timeout,
        )?;

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(
                response.status,
                &response.body,
                "device_code",
            ));
        }

        let device_response: DeviceAuthorizationResponse =
            serde_json::from_str(&response.body).map_err(invalid_json)?;

        Ok(DeviceSession::from(device_response))
    }

    async fn poll_for_token(&self, device_code: &str) -> DeviceTokenResult {
        let request = match self.build_token_request(device_code) {
            Ok(request) => request,
            Err(e) => return DeviceTokenResult::Error(e),
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => return DeviceTokenResult::Error(e),
        };

        if response.is_success() {
            return match serde_json::from_str::<TokenResponse>(&response.body) {
                Ok(token) => DeviceTokenResult::Success(token),
                Err(e) => DeviceTokenResult::Error(invalid_json(e)),
            };
        }

        Self::parse_poll_error(response.status, &response.body)
    }

    async fn poll_until_complete(
        &self,
        session: &DeviceSession,
        events: &dyn EventSink,
    ) -> Result<TokenResponse, AnalyticsError> {
        let policy = &self.config.poll_policy;
        let backoff = Backoff::from_policy(policy);
        let deadline = self.deadline(session);
        let start = Instant::now();

        let mut interval = session.poll_interval;
        let mut delay = interval;
        let mut pending_polls = 0u32;
        let mut consecutive_errors = 0u32;

        loop {
            tokio::time::sleep(delay).await;

            let elapsed = start.elapsed();
            if elapsed > deadline {
                return Err(DeviceFlowError::PollingTimeout { elapsed }.into());
            }

            match self.poll_for_token(&session.device_code).await {
                DeviceTokenResult::Success(token) => return Ok(token),
                DeviceTokenResult::Pending => {
                    consecutive_errors = 0;
                    pending_polls += 1;
                    events.record(&AuthEvent::AuthorizationPending {
                        attempt: pending_polls,
                    });
                    delay = interval;
                }
                DeviceTokenResult::SlowDown => {
                    consecutive_errors = 0;
                    interval += policy.slow_down_increment;
                    events.record(&AuthEvent::SlowDown { interval });
                    delay = interval;
                }
                DeviceTokenResult::AccessDenied { error_description } => {
                    return Err(DeviceFlowError::AccessDenied { error_description }.into());
                }
                DeviceTokenResult::Expired => {
                    return Err(DeviceFlowError::ExpiredToken.into());
                }
                DeviceTokenResult::Error(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    consecutive_errors += 1;
                    if consecutive_errors > policy.max_consecutive_errors {
                        return Err(e);
                    }
                    delay = interval.max(backoff.delay(consecutive_errors - 1));
                    debug!(error_code = e.error_code(), "Transient device poll failure");
                    events.record(&AuthEvent::PollRetry {
                        attempt: consecutive_errors,
                        delay,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
