//! Browser Usage Report
//!
//! Google Analytics browser usage reports with OAuth2 device authorization.
//!
//! # Features
//!
//! - Device Authorization Flow (RFC 8628) with bounded, backed-off polling
//! - Token Refresh (RFC 6749 Section 6) with fallback to re-authorization
//! - Persistent token pair storage with atomic replacement
//! - Core Reporting API browser/version query
//! - Report aggregation by normalized browser version, with thresholding
//!
//! # Example
//!
//! ```rust,ignore
//! use browser_report::{oauth2_config, query_config, AnalyticsClientConfig, BrowserReportClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let oauth = oauth2_config()
//!         .client_id("my-client-id.apps.googleusercontent.com")
//!         .client_secret("my-client-secret")
//!         .build()?;
//!
//!     let query = query_config()
//!         .view_id("42124519")
//!         .days(30)
//!         .threshold(0.5)
//!         .output_file("reports/browsers.json")
//!         .build()?;
//!
//!     let mut client = BrowserReportClient::new(oauth, AnalyticsClientConfig::default(), "tokens.json")?;
//!     let report = client.run(&query).await?;
//!
//!     println!("{} browsers above threshold", report.browsers.len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, wire and report data structures
//! - `error`: error hierarchy with provider error mapping
//! - `core`: HTTP transport
//! - `flows`: device authorization, refresh, and the auth state machine
//! - `token`: token pair persistence
//! - `reporting`: reporting API query
//! - `report`: version grouping, thresholding and report output
//! - `resilience`: polling backoff
//! - `telemetry`: auth events
//! - `builders`: fluent configuration builders
//! - `client`: high-level client running the whole pipeline

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod report;
pub mod reporting;
pub mod resilience;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::BrowserReportClient;

// Re-export builders
pub use builders::{oauth2_config, query_config, OAuth2ConfigBuilder, QueryConfigBuilder};

// Re-export errors
pub use error::{
    get_user_message, AnalyticsError, AnalyticsResult, ConfigurationError, DeviceFlowError,
    NetworkError, ProtocolError, ProviderError, StorageError,
};

// Re-export core
pub use crate::core::{HttpTransport, MockHttpTransport, ReqwestHttpTransport};

// Re-export flows
pub use flows::{AuthFlow, AuthState, DeviceAuthorizationFlow, RefreshTokenFlow};

// Re-export token storage
pub use token::{FileTokenStore, InMemoryTokenStore, MockTokenStore, TokenStore};

// Re-export reporting and report generation
pub use report::{parse_version, JsonFileReportWriter, ReportGenerator, ReportWriter};
pub use reporting::{AnalyticsDataFetcher, DataFetcher, MockDataFetcher};

// Re-export telemetry
pub use telemetry::{AuthEvent, EventSink, InMemoryEventSink, TracingEventSink};

// Re-export types
pub use types::{
    AnalyticsClientConfig, BrowserEntry, DeviceSession, GrantType, OAuth2Config, PollPolicy, QueryConfig,
    RawResult, RawRow, Report, Tokens, VersionEntry,
};
