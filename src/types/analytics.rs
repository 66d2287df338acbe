//! Reporting API Types
//!
//! Wire shapes of the Core Reporting API and the validated rows built from them.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{AnalyticsError, ProtocolError};

/// Error object embedded in a reporting response.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: String,
}

/// Raw reporting API response body.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    /// Rows of `[browser, version, count]`. Absent when the window has no data.
    #[serde(default)]
    pub rows: Option<Vec<Vec<String>>>,
    /// Grand totals keyed by metric name.
    #[serde(default)]
    pub totals_for_all_results: HashMap<String, String>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// One `(browser, version, count)` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRow {
    pub browser: String,
    pub version: String,
    pub count: String,
}

impl RawRow {
    pub fn new(
        browser: impl Into<String>,
        version: impl Into<String>,
        count: impl Into<String>,
    ) -> Self {
        Self {
            browser: browser.into(),
            version: version.into(),
            count: count.into(),
        }
    }

    /// Parse the count column.
    pub fn parse_count(&self) -> Result<u64, AnalyticsError> {
        self.count.trim().parse().map_err(|_| {
            AnalyticsError::Protocol(ProtocolError::InvalidResponse {
                message: format!(
                    "non-numeric count {:?} for {} {}",
                    self.count, self.browser, self.version
                ),
            })
        })
    }
}

/// Validated reporting result.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResult {
    pub rows: Vec<RawRow>,
    /// `totalsForAllResults[metric]`.
    pub total: u64,
}

impl RawResult {
    /// Convert a successful response body for `metric`.
    pub fn from_response(response: AnalyticsResponse, metric: &str) -> Result<Self, AnalyticsError> {
        let total = response
            .totals_for_all_results
            .get(metric)
            .ok_or_else(|| {
                AnalyticsError::Protocol(ProtocolError::MissingField {
                    field: format!("totalsForAllResults.{}", metric),
                })
            })?
            .trim()
            .parse::<u64>()
            .map_err(|e| {
                AnalyticsError::Protocol(ProtocolError::InvalidResponse {
                    message: format!("total for {}: {}", metric, e),
                })
            })?;

        let rows = response
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| match <[String; 3]>::try_from(row) {
                Ok([browser, version, count]) => Ok(RawRow {
                    browser,
                    version,
                    count,
                }),
                Err(row) => Err(AnalyticsError::Protocol(ProtocolError::InvalidResponse {
                    message: format!("expected 3 columns, got {}", row.len()),
                })),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows, total })
    }
}
