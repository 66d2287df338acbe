//! Reporting API
//!
//! Query layer over the Core Reporting API data endpoint.

pub mod fetcher;

pub use fetcher::{AnalyticsDataFetcher, DataFetcher, MockDataFetcher, BROWSER_DIMENSIONS};
