//! Token Types
//!
//! Token endpoint responses and the persisted credential pair.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AnalyticsError, ProtocolError};

/// Token response from the authorization server.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token. Omitted on refresh grants.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Access/refresh token pair.
///
/// Persisted as a JSON object with exactly `access_token` and `refresh_token`.
/// A pair is only ever constructed complete; [`Tokens::from_grant`] and
/// [`Tokens::new`] reject empty halves.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl Tokens {
    /// Build a pair, returning `None` if either half is empty.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Option<Self> {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        if access_token.is_empty() || refresh_token.is_empty() {
            return None;
        }
        Some(Self {
            access_token,
            refresh_token,
        })
    }

    /// Build a pair from a device grant, which must carry both tokens.
    pub fn from_grant(response: TokenResponse) -> Result<Self, AnalyticsError> {
        let refresh_token = response.refresh_token.unwrap_or_default();
        if response.access_token.is_empty() {
            return Err(AnalyticsError::Protocol(ProtocolError::MissingField {
                field: "access_token".to_string(),
            }));
        }
        if refresh_token.is_empty() {
            return Err(AnalyticsError::Protocol(ProtocolError::MissingField {
                field: "refresh_token".to_string(),
            }));
        }
        Ok(Self {
            access_token: response.access_token,
            refresh_token,
        })
    }
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}
