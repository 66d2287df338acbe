//! Report Types
//!
//! The serialized browser usage report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Browser line of the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserEntry {
    pub name: String,
    pub count: u64,
    pub percent_of_total: f64,
}

/// Browser version line of the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub name: String,
    pub version: String,
    pub count: u64,
    pub percent_of_total: f64,
    pub percent_of_browser: f64,
}

/// Grouped, thresholded and sorted browser usage report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub total: u64,
    pub metric: String,
    pub view_id: String,
    pub date_range: String,
    pub generated_on: DateTime<Utc>,
    pub browsers: Vec<BrowserEntry>,
    pub versions: Vec<VersionEntry>,
}
