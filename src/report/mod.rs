//! Browser Usage Report
//!
//! Version normalization, aggregation and persistence of the report.

pub mod generator;
pub mod version;
pub mod writer;

pub use generator::{
    build_report, convert_to_percentage, extract_browser_data, extract_version_data, group_rows,
    BrowserGroup, BrowserGroups, ReportGenerator,
};
pub use version::{parse_version, UNKNOWN_VERSION};
pub use writer::{read_report, InMemoryReportWriter, JsonFileReportWriter, ReportWriter};
