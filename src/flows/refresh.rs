//! Refresh Token Flow
//!
//! RFC 6749 Section 6 - Refreshing an Access Token.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{invalid_json, parse_error_response, AnalyticsError};
use crate::types::{GrantType, OAuth2Config, TokenResponse};

/// Outcome of a refresh attempt that reached the token endpoint.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New access token issued.
    Refreshed(TokenResponse),
    /// The provider refused the refresh token.
    Rejected {
        status: u16,
        error: Option<String>,
    },
}

/// Refresh Token Flow interface.
#[async_trait]
pub trait RefreshTokenFlow: Send + Sync {
    /// Exchange a refresh token for a new access token.
    ///
    /// Transport failures are errors; any non-200 answer is a rejection.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AnalyticsError>;
}

/// Refresh Token Flow implementation.
pub struct RefreshTokenFlowImpl<T: HttpTransport> {
    config: OAuth2Config,
    transport: Arc<T>,
}

impl<T: HttpTransport> RefreshTokenFlowImpl<T> {
    pub fn new(config: OAuth2Config, transport: Arc<T>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl<T: HttpTransport> RefreshTokenFlow for RefreshTokenFlowImpl<T> {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AnalyticsError> {
        use secrecy::ExposeSecret;

        let mut params = vec![
            ("grant_type", GrantType::RefreshToken.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            params.push(("client_secret", secret.expose_secret().as_str()));
        }
        params.push(("refresh_token", refresh_token));

        let request =
            HttpRequest::form_post(&self.config.token_endpoint, &params, self.config.timeout)?;
        let response = self.transport.send(request).await?;

        if response.status != 200 {
            let error = parse_error_response(&response.body).map(|e| e.error);
            debug!(status = response.status, error = ?error, "Refresh rejected");
            return Ok(RefreshOutcome::Rejected {
                status: response.status,
                error,
            });
        }

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(invalid_json)?;
        Ok(RefreshOutcome::Refreshed(token))
    }
}
