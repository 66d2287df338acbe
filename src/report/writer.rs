//! Report Output

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{invalid_json, AnalyticsError, StorageError};
use crate::types::Report;

/// Report sink.
#[async_trait]
pub trait ReportWriter: Send + Sync {
    /// Write `report` to `path`, replacing any existing report.
    async fn write(&self, report: &Report, path: &Path) -> Result<(), AnalyticsError>;
}

/// Writes reports as pretty-printed JSON, creating parent directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileReportWriter;

impl JsonFileReportWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportWriter for JsonFileReportWriter {
    async fn write(&self, report: &Report, path: &Path) -> Result<(), AnalyticsError> {
        let write_failed = |e: std::io::Error| {
            AnalyticsError::Storage(StorageError::WriteFailed {
                message: format!("{}: {}", path.display(), e),
            })
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let json = serde_json::to_string_pretty(report).map_err(|e| {
            AnalyticsError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;
        tokio::fs::write(path, json).await.map_err(write_failed)?;

        debug!(path = %path.display(), "Wrote report");
        Ok(())
    }
}

/// Read a report previously written by [`JsonFileReportWriter`].
pub async fn read_report(path: &Path) -> Result<Report, AnalyticsError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        AnalyticsError::Storage(StorageError::ReadFailed {
            message: format!("{}: {}", path.display(), e),
        })
    })?;
    serde_json::from_str(&contents).map_err(invalid_json)
}

/// Keeps written reports in memory.
#[derive(Default)]
pub struct InMemoryReportWriter {
    written: Mutex<Vec<(PathBuf, Report)>>,
}

impl InMemoryReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports written so far, with their target paths.
    pub fn written(&self) -> Vec<(PathBuf, Report)> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReportWriter for InMemoryReportWriter {
    async fn write(&self, report: &Report, path: &Path) -> Result<(), AnalyticsError> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((path.to_path_buf(), report.clone()));
        Ok(())
    }
}
