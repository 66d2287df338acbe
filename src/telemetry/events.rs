//! Auth Events
//!
//! Structured events for every authorization transition, including the silent
//! recovery paths (refresh rejection, re-authorization after a protocol error).

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, warn};

/// Authorization lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A complete token pair was found in the store.
    TokensLoaded,
    /// A device code was issued; the user must visit the URL and enter the code.
    DeviceCodeIssued {
        user_code: String,
        verification_url: String,
    },
    /// The provider reported `authorization_pending`.
    AuthorizationPending { attempt: u32 },
    /// The provider asked to poll less often.
    SlowDown { interval: Duration },
    /// A transient polling failure will be retried after `delay`.
    PollRetry {
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// The device grant succeeded and the tokens were saved.
    Authorized,
    /// The access token was refreshed and saved.
    Refreshed,
    /// The refresh token was rejected; authorization restarts.
    RefreshRejected { status: u16 },
    /// The reporting endpoint rejected the access token.
    AccessTokenExpired,
    /// The reporting API answered with an unexpected status; authorization restarts.
    Reauthorizing { reason: String },
}

/// Receiver of auth events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &AuthEvent);
}

/// Sink that writes events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &AuthEvent) {
        match event {
            AuthEvent::TokensLoaded => debug!("Loaded stored tokens"),
            AuthEvent::DeviceCodeIssued {
                user_code,
                verification_url,
            } => info!(
                user_code = %user_code,
                verification_url = %verification_url,
                "Device authorization required"
            ),
            AuthEvent::AuthorizationPending { attempt } => {
                debug!(attempt, "Authorization pending")
            }
            AuthEvent::SlowDown { interval } => {
                debug!(interval_secs = interval.as_secs(), "Provider requested slower polling")
            }
            AuthEvent::PollRetry {
                attempt,
                delay,
                error,
            } => warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Device token poll failed, retrying"
            ),
            AuthEvent::Authorized => info!("Device authorization complete"),
            AuthEvent::Refreshed => debug!("Access token refreshed"),
            AuthEvent::RefreshRejected { status } => warn!(
                status,
                "Refresh token rejected, restarting device authorization"
            ),
            AuthEvent::AccessTokenExpired => {
                info!("Access token rejected by reporting API, refreshing")
            }
            AuthEvent::Reauthorizing { reason } => warn!(
                reason = %reason,
                "Restarting device authorization"
            ),
        }
    }
}

/// Sink that discards events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn record(&self, _event: &AuthEvent) {}
}

/// Sink that keeps events in memory for assertions.
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<AuthEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events.
    pub fn events(&self) -> Vec<AuthEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Count events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&AuthEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| predicate(e))
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: &AuthEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn record(&self, event: &AuthEvent) {
        (**self).record(event);
    }
}
