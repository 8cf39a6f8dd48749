//! Cache directory layout and activation state
//!
//! ```text
//! <root>/.cache/
//! ├── records.db     record store
//! ├── sessions.log   session journal (JSON lines)
//! └── state          "1" when the cache is activated
//! ```

use crate::error::{ProvcacheError, ProvcacheResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default cache directory name under the pipeline root
pub const CACHE_DIR_NAME: &str = ".cache";

/// Default record store file name
pub const STORE_FILE_NAME: &str = "records.db";

const STATE_FILE_NAME: &str = "state";
const JOURNAL_FILE_NAME: &str = "sessions.log";
const ACTIVATED: &str = "1";

/// Activation state read from the `state` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationState {
    Activated,
    /// Cache directory absent
    Missing,
    /// Directory present but state marker absent, unreadable or not `1`
    Inactive(String),
}

/// A pipeline's cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDir {
    dir: PathBuf,
    store_file: String,
}

impl CacheDir {
    /// Cache directory `<root>/.cache`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join(CACHE_DIR_NAME))
    }

    /// Cache directory at an explicit path
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            store_file: STORE_FILE_NAME.to_string(),
        }
    }

    pub fn with_store_file(mut self, file: impl Into<String>) -> Self {
        self.store_file = file.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join(&self.store_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE_NAME)
    }

    /// Read the activation marker
    pub fn activation_state(&self) -> ActivationState {
        if !self.dir.is_dir() {
            return ActivationState::Missing;
        }

        match fs::read_to_string(self.state_path()) {
            Ok(content) if content.trim() == ACTIVATED => ActivationState::Activated,
            Ok(content) => {
                ActivationState::Inactive(format!("state is '{}', expected '1'", content.trim()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                ActivationState::Inactive("state file missing".to_string())
            }
            Err(e) => ActivationState::Inactive(format!("state file unreadable: {e}")),
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activation_state() == ActivationState::Activated
    }

    /// Fail with `CacheNotActivated` unless the marker reads `1`
    pub fn require_activated(&self) -> ProvcacheResult<()> {
        let reason = match self.activation_state() {
            ActivationState::Activated => return Ok(()),
            ActivationState::Missing => "cache directory does not exist".to_string(),
            ActivationState::Inactive(reason) => reason,
        };
        debug!("Cache at {} not activated: {}", self.dir.display(), reason);
        Err(ProvcacheError::CacheNotActivated {
            path: self.dir.clone(),
            reason,
        })
    }

    /// Create the directory and mark it activated
    pub fn activate(&self) -> ProvcacheResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ProvcacheError::io(format!("creating directory {}", self.dir.display()), e)
        })?;

        let state = self.state_path();
        fs::write(&state, ACTIVATED)
            .map_err(|e| ProvcacheError::io(format!("writing {}", state.display()), e))?;

        info!("Activated cache at {}", self.dir.display());
        Ok(())
    }
}
