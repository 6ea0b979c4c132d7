//! Append-only collection of result records for one run.

use serde::Serialize;
use std::fs;
use std::path::Path;

use super::types::{Outcome, ResultRecord, RunSummary};
use crate::capability::Capability;
use crate::error::{HarnessError, HarnessResult};

/// Results for one base platform (variants folded together)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResults {
    pub platform: String,
    pub results: Vec<PlatformEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEntry {
    pub task_id: String,
    /// Orientation or resolution the session ran with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub result: Outcome,
}

/// Collects records as work items settle.
///
/// Owned by the run loop; records are never modified after `record`.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    records: Vec<ResultRecord>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in &self.records {
            summary.add(record.outcome.kind());
        }
        summary
    }

    /// Records grouped by platform, platforms in first-seen order
    pub fn by_platform(&self) -> Vec<PlatformResults> {
        let mut groups: Vec<PlatformResults> = Vec::new();
        for record in &self.records {
            let key = platform_key(&record.capabilities);
            let entry = PlatformEntry {
                task_id: record.task_id.clone(),
                variant: variant_label(&record.capabilities),
                result: record.outcome.clone(),
            };
            match groups.iter_mut().find(|g| g.platform == key) {
                Some(group) => group.results.push(entry),
                None => groups.push(PlatformResults {
                    platform: key,
                    results: vec![entry],
                }),
            }
        }
        groups
    }

    /// Write all records as a pretty-printed JSON array
    pub fn persist(&self, path: &Path) -> HarnessResult<()> {
        write_pretty(path, &self.records)
    }

    /// Write the per-platform view as a pretty-printed JSON array
    pub fn persist_grouped(&self, path: &Path) -> HarnessResult<()> {
        write_pretty(path, &self.by_platform())
    }
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> HarnessResult<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text.as_bytes())
    };
    write().map_err(|source| HarnessError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

/// Platform identity without the per-session variant
pub fn platform_key(cap: &Capability) -> String {
    let host = match &cap.device {
        Some(device) => device.clone(),
        None => format!("{} {}", cap.options.os, cap.options.os_version),
    };
    format!(
        "{}-{}-{}",
        host,
        cap.browser_name,
        cap.browser_version.as_deref().unwrap_or("")
    )
}

fn variant_label(cap: &Capability) -> Option<String> {
    cap.device_orientation
        .map(|o| o.to_string())
        .or_else(|| cap.resolution.clone())
}
