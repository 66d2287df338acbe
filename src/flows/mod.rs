//! OAuth2 Flows
//!
//! - **Device Authorization Flow** (RFC 8628): obtaining the first token pair
//! - **Refresh Token Flow** (RFC 6749 Section 6): renewing the access token
//! - **AuthFlow**: the state machine combining both with a token store

pub mod auth;
pub mod device;
pub mod refresh;

pub use auth::{AuthFlow, AuthState};
pub use device::{DeviceAuthorizationFlow, DeviceAuthorizationFlowImpl};
pub use refresh::{RefreshOutcome, RefreshTokenFlow, RefreshTokenFlowImpl};
