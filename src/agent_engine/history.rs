use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::DroidClawResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub step: u32,
    pub role: String,
    pub content: Option<String>,
    pub action: Option<serde_json::Value>,
}

impl HistoryEntry {
    pub fn now(step: u32, role: &str, content: Option<String>, action: Option<serde_json::Value>) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            step,
            role: role.into(),
            content,
            action,
        }
    }
}

/// Append-only JSONL journal of one run.
pub struct SessionHistory {
    pub session_id: String,
    file_path: PathBuf,
    entries: usize,
}

impl SessionHistory {
    /// Journal in the per-user data directory.
    pub fn new() -> Self {
        Self::in_dir(&data_dir_or_cwd())
    }

    pub fn in_dir(dir: &Path) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            file_path,
            entries: 0,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Append one entry as a JSON line.
    pub fn append(&mut self, entry: &HistoryEntry) -> DroidClawResult<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        self.entries += 1;
        tracing::debug!(path = %self.file_path.display(), "history entry flushed");
        Ok(())
    }

    /// Like [`SessionHistory::append`] but only logs failures.
    pub fn record(&mut self, entry: HistoryEntry) {
        if let Err(e) = self.append(&entry) {
            tracing::warn!(error = %e, path = %self.file_path.display(), "journal write failed");
        }
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `<data_local_dir>/DroidClaw/sessions`, falling back to the working directory.
fn data_dir_or_cwd() -> PathBuf {
    if let Some(base) = dirs::data_local_dir() {
        let d = base.join("DroidClaw").join("sessions");
        if std::fs::create_dir_all(&d).is_ok() {
            return d;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
