use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("can't serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The persisted artifact of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub dataset: String,
    pub lines: usize,
    pub chunk_size: usize,
    pub tasks: usize,
    pub top: Vec<(String, u64)>,
    pub elapsed_s: f64,
    pub full_counts: BTreeMap<String, u64>,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `report` as pretty JSON.
///
/// The JSON goes to a sibling `.tmp` file first and is renamed over `path`,
/// so `path` either holds a complete report or is left untouched.
pub async fn write_report(path: &Path, report: &RunReport) -> Result<(), ReportError> {
    let mut json = serde_json::to_vec_pretty(report)?;
    json.push(b'\n');

    let tmp = temp_path(path);
    if let Err(err) = tokio::fs::write(&tmp, &json).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    Ok(())
}

pub async fn read_report(path: &Path) -> Result<RunReport, ReportError> {
    let json = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&json)?)
}
