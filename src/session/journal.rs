//! Session journal
//!
//! Appends one JSON line per finished session to `.cache/sessions.log`.

use crate::session::manager::SessionHook;
use crate::session::state::SessionReport;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File-based session journal that appends JSON lines
#[derive(Debug, Clone)]
pub struct SessionJournal {
    path: PathBuf,
}

impl SessionJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log a session report as a JSON line
    ///
    /// IO failures are logged and dropped; the journal never changes a
    /// session's result.
    pub fn log(&self, report: &SessionReport) {
        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": format!("session.{}", report.exit),
            "data": report,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize session report: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line) {
            warn!(
                "Failed to write session journal {}: {}",
                self.path.display(),
                e
            );
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl SessionHook for SessionJournal {
    fn on_exit(&self, report: &SessionReport) {
        self.log(report);
    }
}
