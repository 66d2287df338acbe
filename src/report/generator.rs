//! Report Generation
//!
//! Groups raw rows by browser and normalized version, converts counts to
//! percentages of the grand total, drops entries at or below the threshold
//! and orders what is left by count.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

use super::version::parse_version;
use super::writer::ReportWriter;
use crate::error::{AnalyticsError, ProtocolError};
use crate::types::{BrowserEntry, QueryConfig, RawResult, RawRow, Report, VersionEntry};

/// Decimal places kept in percentages.
const PERCENT_PRECISION: i32 = 5;

/// Aggregated counts for one browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserGroup {
    pub count: u64,
    /// Count per normalized version label.
    pub versions: BTreeMap<String, u64>,
}

/// Browser groups keyed by browser name.
pub type BrowserGroups = BTreeMap<String, BrowserGroup>;

/// Aggregate rows by browser and normalized version.
pub fn group_rows(rows: &[RawRow]) -> Result<BrowserGroups, AnalyticsError> {
    let mut groups = BrowserGroups::new();
    for row in rows {
        let count = row.parse_count()?;
        let version = parse_version(&row.version, &row.browser);

        let group = groups.entry(row.browser.clone()).or_default();
        group.count = add_count(group.count, count, &row.browser)?;
        let version_count = group.versions.entry(version).or_insert(0);
        *version_count = add_count(*version_count, count, &row.browser)?;
    }
    Ok(groups)
}

fn add_count(current: u64, count: u64, browser: &str) -> Result<u64, AnalyticsError> {
    current.checked_add(count).ok_or_else(|| {
        AnalyticsError::Protocol(ProtocolError::InvalidResponse {
            message: format!("count for {browser} overflows u64"),
        })
    })
}

/// Convert a fraction to a percentage rounded to five decimal places.
pub fn convert_to_percentage(fraction: f64) -> f64 {
    let power = 10f64.powi(PERCENT_PRECISION);
    (fraction * 100.0 * power).round() / power
}

fn percent(count: u64, of: u64) -> f64 {
    convert_to_percentage(count as f64 / of as f64)
}

fn by_count_desc(a: u64, b: u64) -> Ordering {
    b.cmp(&a)
}

/// Browsers whose share of `total` exceeds `threshold`, largest first.
pub fn extract_browser_data(groups: &BrowserGroups, total: u64, threshold: f64) -> Vec<BrowserEntry> {
    if total == 0 {
        return Vec::new();
    }

    let mut browsers: Vec<BrowserEntry> = groups
        .iter()
        .map(|(name, group)| BrowserEntry {
            name: name.clone(),
            count: group.count,
            percent_of_total: percent(group.count, total),
        })
        .filter(|entry| entry.percent_of_total > threshold)
        .collect();

    browsers.sort_by(|a, b| by_count_desc(a.count, b.count).then_with(|| a.name.cmp(&b.name)));
    browsers
}

/// Browser versions whose share of `total` exceeds `threshold`, largest first.
pub fn extract_version_data(groups: &BrowserGroups, total: u64, threshold: f64) -> Vec<VersionEntry> {
    if total == 0 {
        return Vec::new();
    }

    let mut versions: Vec<VersionEntry> = groups
        .iter()
        .flat_map(|(name, group)| {
            group.versions.iter().map(move |(version, &count)| VersionEntry {
                name: name.clone(),
                version: version.clone(),
                count,
                percent_of_total: percent(count, total),
                percent_of_browser: if group.count == 0 {
                    0.0
                } else {
                    percent(count, group.count)
                },
            })
        })
        .filter(|entry| entry.percent_of_total > threshold)
        .collect();

    versions.sort_by(|a, b| {
        by_count_desc(a.count, b.count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.version.cmp(&b.version))
    });
    versions
}

/// Build a report from a query result.
pub fn build_report(
    config: &QueryConfig,
    result: &RawResult,
    generated_on: DateTime<Utc>,
) -> Result<Report, AnalyticsError> {
    let groups = group_rows(&result.rows)?;

    Ok(Report {
        total: result.total,
        metric: config.bare_metric().to_string(),
        view_id: config.bare_view_id().to_string(),
        date_range: config.date_range(),
        generated_on,
        browsers: extract_browser_data(&groups, result.total, config.threshold),
        versions: extract_version_data(&groups, result.total, config.threshold),
    })
}

/// Builds reports and hands them to a writer.
pub struct ReportGenerator<W: ReportWriter> {
    writer: W,
}

impl<W: ReportWriter> ReportGenerator<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Build the report, write it to `config.output_file` and return it.
    pub async fn generate(&self, config: &QueryConfig, result: &RawResult) -> Result<Report, AnalyticsError> {
        let report = build_report(config, result, Utc::now())?;
        self.writer.write(&report, &config.output_file).await?;
        info!(
            path = %config.output_file.display(),
            browsers = report.browsers.len(),
            versions = report.versions.len(),
            "Report saved"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::writer::InMemoryReportWriter;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn rows(data: &[(&str, &str, &str)]) -> Vec<RawRow> {
        data.iter()
            .map(|(b, v, c)| RawRow::new(*b, *v, *c))
            .collect()
    }

    fn query_config(threshold: f64) -> QueryConfig {
        QueryConfig {
            view_id: "ga:42124519".to_string(),
            metric: "ga:sessions".to_string(),
            days: 30,
            threshold,
            output_file: PathBuf::from("reports/browsers.json"),
        }
    }

    #[test]
    fn test_group_rows_merges_versions() {
        let groups = group_rows(&rows(&[
            ("Chrome", "50.0.2661.102", "10"),
            ("Chrome", "50.0.2661.94", "5"),
            ("Chrome", "49.0.1", "2"),
        ]))
        .unwrap();

        let chrome = &groups["Chrome"];
        assert_eq!(chrome.count, 17);
        assert_eq!(chrome.versions["50.0"], 15);
        assert_eq!(chrome.versions["49.0"], 2);
    }

    #[test]
    fn test_group_rows_rejects_bad_count() {
        let err = group_rows(&rows(&[("Chrome", "50.0", "many")])).unwrap_err();
        assert_eq!(err.error_code(), "REPORT_PROTOCOL");
    }

    #[test]
    fn test_group_rows_rejects_count_overflow() {
        let err = group_rows(&rows(&[
            ("Chrome", "50.0", "18446744073709551615"),
            ("Chrome", "50.1", "1"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            AnalyticsError::Protocol(ProtocolError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_convert_to_percentage() {
        assert_eq!(convert_to_percentage(1.0 / 3.0), 33.33333);
        assert_eq!(convert_to_percentage(0.5), 50.0);
        assert_eq!(convert_to_percentage(2.0 / 3.0), 66.66667);
        assert_eq!(convert_to_percentage(0.0), 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let groups = group_rows(&rows(&[
            ("Chrome", "50.0", "60"),
            ("Firefox", "46.0", "39"),
            ("Opera", "37.0", "1"),
        ]))
        .unwrap();

        let browsers = extract_browser_data(&groups, 100, 1.0);
        let names: Vec<&str> = browsers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Chrome", "Firefox"]);
    }

    #[test]
    fn test_sort_ties_by_name_then_version() {
        let groups = group_rows(&rows(&[
            ("Firefox", "46.0", "5"),
            ("Chrome", "51.0", "5"),
            ("Chrome", "50.0", "5"),
        ]))
        .unwrap();

        let browsers = extract_browser_data(&groups, 15, 0.0);
        assert_eq!(browsers[0].name, "Chrome");
        assert_eq!(browsers[1].name, "Firefox");

        let versions = extract_version_data(&groups, 15, 0.0);
        let labels: Vec<(&str, &str)> = versions
            .iter()
            .map(|v| (v.name.as_str(), v.version.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("Chrome", "50.0"), ("Chrome", "51.0"), ("Firefox", "46.0")]
        );
    }

    #[test]
    fn test_percent_of_browser() {
        let groups = group_rows(&rows(&[
            ("Safari", "9.1", "3"),
            ("Safari", "601.1.56", "1"),
        ]))
        .unwrap();

        let versions = extract_version_data(&groups, 8, 0.0);
        assert_eq!(versions[0].version, "9.1");
        assert_eq!(versions[0].percent_of_total, 37.5);
        assert_eq!(versions[0].percent_of_browser, 75.0);
        assert_eq!(versions[1].version, "(unknown)");
        assert_eq!(versions[1].percent_of_browser, 25.0);
    }

    #[test]
    fn test_zero_total_yields_empty_lists() {
        let config = query_config(0.0);
        let result = RawResult {
            rows: rows(&[("Chrome", "50.0", "0")]),
            total: 0,
        };

        let report = build_report(&config, &result, Utc::now()).unwrap();
        assert_eq!(report.total, 0);
        assert!(report.browsers.is_empty());
        assert!(report.versions.is_empty());
    }

    #[test]
    fn test_build_report_metadata() {
        let config = query_config(0.0);
        let result = RawResult {
            rows: rows(&[("Chrome", "50.0", "4")]),
            total: 4,
        };
        let generated_on = Utc::now();

        let report = build_report(&config, &result, generated_on).unwrap();
        assert_eq!(report.metric, "sessions");
        assert_eq!(report.view_id, "42124519");
        assert_eq!(report.date_range, "Last 30 days");
        assert_eq!(report.generated_on, generated_on);
        assert_eq!(report.browsers[0].percent_of_total, 100.0);
    }

    #[tokio::test]
    async fn test_generator_writes_to_output_file() {
        let generator = ReportGenerator::new(InMemoryReportWriter::new());
        let config = query_config(0.0);
        let result = RawResult {
            rows: rows(&[("Edge", "13.10586", "2")]),
            total: 2,
        };

        let report = generator.generate(&config, &result).await.unwrap();

        let written = generator.writer().written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("reports/browsers.json"));
        assert_eq!(written[0].1, report);
    }
}
