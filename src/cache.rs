use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::model::AgreementReport;
use crate::util::{sha256_json, write_json_pretty};

/// Agreement reports keyed by the content hash of the row snapshot they were
/// computed from. Entries never expire on their own; they are replaced on
/// `--refresh` or dropped by `clear-cache`.
#[derive(Debug, Clone)]
pub struct ReportCache {
    root: PathBuf,
}

impl ReportCache {
    pub fn new(cache_root: &Path) -> Self {
        Self {
            root: cache_root.join("reports"),
        }
    }

    pub fn key<T: Serialize>(snapshot_hash: &str, request: &T) -> Result<String> {
        let request = serde_json::to_value(request).context("failed to serialize cache request")?;
        let digest = sha256_json(&[serde_json::Value::from(snapshot_hash), request])?;
        Ok(digest[..32].to_string())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("agreement-{key}.json"))
    }

    pub fn load(&self, key: &str) -> Result<Option<AgreementReport>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_slice::<AgreementReport>(&raw) {
            Ok(report) => Ok(Some(report)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable cached report");
                Ok(None)
            }
        }
    }

    pub fn store(&self, key: &str, report: &AgreementReport) -> Result<PathBuf> {
        let path = self.entry_path(key);
        write_json_pretty(&path, report)?;
        Ok(path)
    }

    /// Number of reports currently cached.
    pub fn cached_count(&self) -> Result<usize> {
        Ok(self.report_paths()?.len())
    }

    /// Removes every cached report, returning how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let paths = self.report_paths()?;
        for path in &paths {
            fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(paths.len())
    }

    fn report_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read {}", self.root.display()))?;
        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", self.root.display()))?;
            let path = entry.path();
            let is_report = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("agreement-") && name.ends_with(".json"));
            if is_report {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}
