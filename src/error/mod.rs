//! Error Types
//!
//! Error hierarchy for authorization, reporting queries and report persistence.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the browser report pipeline.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Device flow error: {0}")]
    DeviceFlow(#[from] DeviceFlowError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Well-formed error payload returned by the reporting API.
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// The reporting endpoint rejected the access token.
    #[error("Access token expired or revoked")]
    AuthExpired,
}

impl AnalyticsError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "REPORT_CONFIG",
            Self::DeviceFlow(_) => "REPORT_DEVICE",
            Self::Network(_) => "REPORT_NETWORK",
            Self::Protocol(_) => "REPORT_PROTOCOL",
            Self::Provider(_) => "REPORT_PROVIDER",
            Self::Storage(_) => "REPORT_STORAGE",
            Self::Api { .. } => "REPORT_API",
            Self::AuthExpired => "REPORT_AUTH_EXPIRED",
        }
    }

    /// Check if error is transient while polling for a device token.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::DeviceFlow(DeviceFlowError::AuthorizationPending) => true,
            Self::DeviceFlow(DeviceFlowError::SlowDown { .. }) => true,
            Self::Provider(ProviderError::ServerError { .. }) => true,
            Self::Provider(ProviderError::TemporarilyUnavailable) => true,
            Self::Provider(ProviderError::Unrecognized { .. }) => true,
            Self::Protocol(ProtocolError::InvalidJson { .. }) => true,
            _ => false,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Device flow error.
#[derive(Error, Debug)]
pub enum DeviceFlowError {
    #[error("Authorization pending - user has not yet completed authorization")]
    AuthorizationPending,

    #[error("Slow down - increase polling interval to {interval} seconds")]
    SlowDown { interval: u64 },

    #[error("Access denied by user")]
    AccessDenied { error_description: Option<String> },

    #[error("Device code expired")]
    ExpiredToken,

    #[error("Polling timeout after {elapsed:?}")]
    PollingTimeout { elapsed: Duration },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("TLS error: {message}")]
    TlsError { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::TlsError { .. })
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected status {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Provider (OAuth2 server) error.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid client credentials")]
    InvalidClient { error_description: Option<String> },

    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid scope: {scope}")]
    InvalidScope { scope: String },

    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable,

    #[error("Unrecognized provider error: {error}")]
    Unrecognized { error: String },
}

/// Result type for report operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// OAuth2 error response from provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Map token endpoint error response to error type.
pub fn map_token_error(response: &OAuth2ErrorResponse) -> ProviderError {
    let description = || {
        response
            .error_description
            .clone()
            .unwrap_or_else(|| response.error.clone())
    };

    match response.error.as_str() {
        "invalid_client" => ProviderError::InvalidClient {
            error_description: response.error_description.clone(),
        },
        "invalid_grant" => ProviderError::InvalidGrant {
            message: description(),
        },
        "invalid_request" => ProviderError::InvalidRequest {
            message: description(),
        },
        "invalid_scope" => ProviderError::InvalidScope {
            scope: response.error_description.clone().unwrap_or_default(),
        },
        "unsupported_grant_type" => ProviderError::UnsupportedGrantType {
            grant_type: response.error_description.clone().unwrap_or_default(),
        },
        "server_error" => ProviderError::ServerError {
            message: description(),
        },
        "temporarily_unavailable" => ProviderError::TemporarilyUnavailable,
        _ => ProviderError::Unrecognized {
            error: response.error.clone(),
        },
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from a non-success OAuth2 endpoint response.
pub fn create_error_from_response(status: u16, body: &str, endpoint: &str) -> AnalyticsError {
    if let Some(response) = parse_error_response(body) {
        return AnalyticsError::Provider(map_token_error(&response));
    }

    match status {
        500 | 502 | 503 | 504 => AnalyticsError::Provider(ProviderError::ServerError {
            message: format!("HTTP {}", status),
        }),
        _ => AnalyticsError::Protocol(ProtocolError::UnexpectedStatus {
            status,
            endpoint: endpoint.to_string(),
        }),
    }
}

/// Map a serde_json failure to a protocol error.
pub(crate) fn invalid_json(error: serde_json::Error) -> AnalyticsError {
    AnalyticsError::Protocol(ProtocolError::InvalidJson {
        message: error.to_string(),
    })
}

/// Get user-friendly error message.
pub fn get_user_message(error: &AnalyticsError) -> String {
    match error {
        AnalyticsError::DeviceFlow(DeviceFlowError::AccessDenied { .. }) => {
            "Access was denied. Run the command again and approve the request.".to_string()
        }
        AnalyticsError::DeviceFlow(DeviceFlowError::ExpiredToken)
        | AnalyticsError::DeviceFlow(DeviceFlowError::PollingTimeout { .. }) => {
            "The device code expired before authorization completed. Please try again."
                .to_string()
        }
        AnalyticsError::Api { code, message } => {
            format!("The reporting API rejected the query ({}): {}", code, message)
        }
        AnalyticsError::Network(_) => {
            "Could not reach the server. Please check your connection and try again.".to_string()
        }
        AnalyticsError::Configuration(e) => format!("Invalid configuration: {}", e),
        _ => format!("Report generation failed: {}", error),
    }
}
