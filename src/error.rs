//! Error types for provcache
//!
//! All modules use `ProvcacheResult<T>` as their return type.

use crate::environment::ComponentDrift;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for provcache operations
pub type ProvcacheResult<T> = Result<T, ProvcacheError>;

/// All errors that can occur in provcache
#[derive(Error, Debug)]
pub enum ProvcacheError {
    // Activation errors
    #[error("Cache not activated at {path}: {reason}")]
    CacheNotActivated { path: PathBuf, reason: String },

    // Store errors
    #[error("Record store unavailable at {path}: {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    #[error("A record already exists for identifier {0}")]
    DuplicateFingerprint(String),

    #[error("Corrupt record {identifier}: {reason}")]
    CorruptRecord { identifier: String, reason: String },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    // Cache errors
    #[error(
        "Stale cache entry for action '{name}' ({fingerprint}): {}",
        describe_drift(.drift)
    )]
    StaleCacheEntry {
        name: String,
        fingerprint: String,
        drift: Vec<ComponentDrift>,
    },

    #[error("Cannot canonically encode {field}: {reason}")]
    Encoding { field: String, reason: String },

    #[error("Invalid action descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Action '{name}' failed: {reason}")]
    ActionFailed { name: String, reason: String },

    #[error("Artifacts differ: {origin} vs {current}")]
    ContentDiffers { origin: PathBuf, current: PathBuf },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn describe_drift(drift: &[ComponentDrift]) -> String {
    drift
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ProvcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an encoding error for a descriptor field
    pub fn encoding(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a store-unavailable error for a store path
    pub fn store_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// A duplicate fingerprint is an insert-race loss; the caller recovers by
    /// looking the record up instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::DuplicateFingerprint(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheNotActivated { .. } => Some("Run: provcache init"),
            Self::StoreUnavailable { .. } => {
                Some("Check that the .cache directory exists and is writable, then retry")
            }
            Self::StaleCacheEntry { .. } => {
                Some("Re-run in a matching environment or set cache.strict = false")
            }
            Self::RecordNotFound(_) => Some("Run: provcache list"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DriftSeverity;

    #[test]
    fn error_display() {
        let err = ProvcacheError::CacheNotActivated {
            path: PathBuf::from("/data/.cache"),
            reason: "state file missing".to_string(),
        };
        assert!(err.to_string().contains("Cache not activated"));
        assert!(err.to_string().contains("/data/.cache"));
    }

    #[test]
    fn error_hint() {
        let err = ProvcacheError::CacheNotActivated {
            path: PathBuf::from(".cache"),
            reason: String::new(),
        };
        assert_eq!(err.hint(), Some("Run: provcache init"));
        assert_eq!(ProvcacheError::encoding("parameters", "x").hint(), None);
    }

    #[test]
    fn error_retryable() {
        assert!(ProvcacheError::store_unavailable("db", "locked").is_retryable());
        assert!(ProvcacheError::DuplicateFingerprint("abc".to_string()).is_retryable());
        assert!(!ProvcacheError::encoding("parameters", "too deep").is_retryable());
    }

    #[test]
    fn stale_entry_lists_drift() {
        let err = ProvcacheError::StaleCacheEntry {
            name: "a2".to_string(),
            fingerprint: "ff00".to_string(),
            drift: vec![ComponentDrift {
                component: "q2-types".to_string(),
                recorded: Some("1.0.0".to_string()),
                current: Some("1.1.0".to_string()),
                severity: DriftSeverity::Advisory,
            }],
        };
        let message = err.to_string();
        assert!(message.contains("a2"));
        assert!(message.contains("q2-types"));
        assert!(message.contains("1.1.0"));
    }
}
