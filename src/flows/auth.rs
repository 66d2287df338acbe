//! Authorization State Machine
//!
//! Owns the token pair for a run: loads it, obtains it through the device
//! flow, refreshes it, and restarts authorization when the refresh token is
//! refused.

use std::sync::Arc;
use tracing::info;

use super::device::{DeviceAuthorizationFlow, DeviceAuthorizationFlowImpl};
use super::refresh::{RefreshOutcome, RefreshTokenFlow, RefreshTokenFlowImpl};
use crate::core::HttpTransport;
use crate::error::{AnalyticsError, ProtocolError};
use crate::telemetry::{AuthEvent, EventSink, TracingEventSink};
use crate::token::TokenStore;
use crate::types::{DeviceSession, OAuth2Config, Tokens};

/// Authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    AwaitingDeviceCode,
    Polling,
    Authenticated,
    Refreshing,
}

/// Authorization flow over a transport and a token store.
pub struct AuthFlow<T: HttpTransport, S: TokenStore> {
    device: DeviceAuthorizationFlowImpl<T>,
    refresh: RefreshTokenFlowImpl<T>,
    store: Arc<S>,
    events: Arc<dyn EventSink>,
    state: AuthState,
}

impl<T: HttpTransport, S: TokenStore> AuthFlow<T, S> {
    pub fn new(config: OAuth2Config, transport: Arc<T>, store: Arc<S>) -> Self {
        Self {
            device: DeviceAuthorizationFlowImpl::new(config.clone(), Arc::clone(&transport)),
            refresh: RefreshTokenFlowImpl::new(config, transport),
            store,
            events: Arc::new(TracingEventSink),
            state: AuthState::Unauthenticated,
        }
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Return stored tokens, or run the device flow if none are stored.
    pub async fn authorize(&mut self) -> Result<Tokens, AnalyticsError> {
        if let Some(tokens) = self.store.load().await? {
            self.events.record(&AuthEvent::TokensLoaded);
            self.state = AuthState::Authenticated;
            return Ok(tokens);
        }
        self.run_device_flow().await
    }

    /// Request a device code and announce it to the user.
    pub async fn request_device_code(&mut self) -> Result<DeviceSession, AnalyticsError> {
        self.state = AuthState::AwaitingDeviceCode;
        let session = match self.device.request_device_code().await {
            Ok(session) => session,
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };

        self.events.record(&AuthEvent::DeviceCodeIssued {
            user_code: session.user_code.clone(),
            verification_url: session.verification_url.clone(),
        });
        Ok(session)
    }

    /// Poll until the user completes authorization, then save the pair.
    pub async fn poll_for_token(&mut self, session: &DeviceSession) -> Result<Tokens, AnalyticsError> {
        self.state = AuthState::Polling;
        let result = self
            .device
            .poll_until_complete(session, self.events.as_ref())
            .await
            .and_then(Tokens::from_grant);

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };

        self.store.save(&tokens).await?;
        self.state = AuthState::Authenticated;
        self.events.record(&AuthEvent::Authorized);
        Ok(tokens)
    }

    /// Full device authorization: code request followed by polling.
    pub async fn run_device_flow(&mut self) -> Result<Tokens, AnalyticsError> {
        let session = self.request_device_code().await?;
        self.poll_for_token(&session).await
    }

    /// Discard the current pair and authorize from scratch.
    pub async fn reauthorize(&mut self, reason: impl Into<String>) -> Result<Tokens, AnalyticsError> {
        self.events.record(&AuthEvent::Reauthorizing {
            reason: reason.into(),
        });
        self.state = AuthState::Unauthenticated;
        self.run_device_flow().await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// A rejected refresh token sends the flow back through device
    /// authorization; transport failures are returned as-is.
    pub async fn refresh_access_token(
        &mut self,
        refresh_token: &str,
    ) -> Result<Tokens, AnalyticsError> {
        let previous = self.state;
        self.state = AuthState::Refreshing;

        let outcome = match self.refresh.refresh(refresh_token).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = previous;
                return Err(e);
            }
        };

        match outcome {
            RefreshOutcome::Refreshed(response) => {
                let saved = match Tokens::new(response.access_token, refresh_token) {
                    Some(tokens) => self.store.save(&tokens).await.map(|()| tokens),
                    None => Err(AnalyticsError::Protocol(ProtocolError::MissingField {
                        field: "access_token".to_string(),
                    })),
                };
                match saved {
                    Ok(tokens) => {
                        self.state = AuthState::Authenticated;
                        self.events.record(&AuthEvent::Refreshed);
                        Ok(tokens)
                    }
                    Err(e) => {
                        self.state = previous;
                        Err(e)
                    }
                }
            }
            RefreshOutcome::Rejected { status, error } => {
                info!(status, error = ?error, "Refresh token refused, restarting authorization");
                self.events.record(&AuthEvent::RefreshRejected { status });
                self.state = AuthState::Unauthenticated;
                self.run_device_flow().await
            }
        }
    }
}
