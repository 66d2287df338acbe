//! Reporting Query
//!
//! Browser/version breakdown of one metric over the last N days, ending yesterday.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{invalid_json, AnalyticsError, ConfigurationError, ProtocolError};
use crate::types::{AnalyticsClientConfig, AnalyticsResponse, QueryConfig, RawResult};

/// Dimensions requested for every query.
pub const BROWSER_DIMENSIONS: &str = "ga:browser,ga:browserVersion";

/// Reporting data source.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Run the browser query with the given access token.
    ///
    /// `AuthExpired` signals a rejected token; any other status outside
    /// 200/401 is a protocol error.
    async fn query(&self, config: &QueryConfig, access_token: &str) -> Result<RawResult, AnalyticsError>;
}

/// Data fetcher backed by the Core Reporting API.
pub struct AnalyticsDataFetcher<T: HttpTransport> {
    config: AnalyticsClientConfig,
    transport: Arc<T>,
}

impl<T: HttpTransport> AnalyticsDataFetcher<T> {
    pub fn new(config: AnalyticsClientConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    /// Build the query URL, access token included.
    pub fn build_url(&self, config: &QueryConfig, access_token: &str) -> Result<Url, AnalyticsError> {
        let start_date = format!("{}daysAgo", config.days);
        let sort = format!("-{}", config.metric);

        Url::parse_with_params(
            &self.config.reporting_endpoint,
            &[
                ("ids", config.view_id.as_str()),
                ("metrics", config.metric.as_str()),
                ("dimensions", BROWSER_DIMENSIONS),
                ("start-date", start_date.as_str()),
                ("end-date", "yesterday"),
                ("sort", sort.as_str()),
                ("access_token", access_token),
            ],
        )
        .map_err(|_| {
            AnalyticsError::Configuration(ConfigurationError::InvalidEndpoint {
                url: self.config.reporting_endpoint.clone(),
            })
        })
    }
}

#[async_trait]
impl<T: HttpTransport> DataFetcher for AnalyticsDataFetcher<T> {
    async fn query(&self, config: &QueryConfig, access_token: &str) -> Result<RawResult, AnalyticsError> {
        let url = self.build_url(config, access_token)?;
        debug!(view_id = %config.view_id, metric = %config.metric, days = config.days, "Querying reporting API");

        let response = self
            .transport
            .send(HttpRequest::get(url.as_str(), self.config.timeout))
            .await?;

        match response.status {
            200 => {
                let mut body: AnalyticsResponse =
                    serde_json::from_str(&response.body).map_err(invalid_json)?;
                if let Some(error) = body.error.take() {
                    return Err(AnalyticsError::Api {
                        code: error.code,
                        message: error.message,
                    });
                }
                let result = RawResult::from_response(body, &config.metric)?;
                debug!(rows = result.rows.len(), total = result.total, "Reporting query complete");
                Ok(result)
            }
            401 => Err(AnalyticsError::AuthExpired),
            status => Err(AnalyticsError::Protocol(ProtocolError::UnexpectedStatus {
                status,
                endpoint: "reporting".to_string(),
            })),
        }
    }
}

/// Mock data fetcher for testing.
#[derive(Default)]
pub struct MockDataFetcher {
    results: Mutex<Vec<Result<RawResult, AnalyticsError>>>,
    tokens_seen: Mutex<Vec<String>>,
}

impl MockDataFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result; results are returned in queue order.
    pub fn queue_result(&self, result: Result<RawResult, AnalyticsError>) -> &Self {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result);
        self
    }

    /// Access tokens passed to `query`, in call order.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl DataFetcher for MockDataFetcher {
    async fn query(&self, _config: &QueryConfig, access_token: &str) -> Result<RawResult, AnalyticsError> {
        self.tokens_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(access_token.to_string());

        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        if results.is_empty() {
            return Err(AnalyticsError::Protocol(ProtocolError::InvalidResponse {
                message: "No mock result queued".to_string(),
            }));
        }
        results.remove(0)
    }
}
