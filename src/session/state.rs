//! Session reports

use crate::cache::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a cache session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionExit {
    /// Cache check and action body both succeeded
    Completed,
    /// The cache check itself failed; the body never ran
    CacheFailed { message: String },
    /// The action body returned an error
    ActionFailed { message: String },
    /// The action body panicked
    Panicked,
    /// The session was dropped before it ran
    Abandoned,
}

impl SessionExit {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for SessionExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::CacheFailed { .. } => write!(f, "cache_failed"),
            Self::ActionFailed { .. } => write!(f, "action_failed"),
            Self::Panicked => write!(f, "panicked"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Summary handed to exit hooks, exactly once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,

    /// Pipeline run the session belongs to
    pub execution_id: Uuid,

    /// Action name from the descriptor
    pub action: String,

    /// Record identifier, once the cache check succeeded
    pub identifier: Option<String>,

    pub outcome: Option<Outcome>,

    #[serde(flatten)]
    pub exit: SessionExit,

    pub started_at: DateTime<Utc>,

    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_exit_inline() {
        let report = SessionReport {
            session_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
            action: "a2".to_string(),
            identifier: Some("abc".to_string()),
            outcome: Some(Outcome::Hit),
            exit: SessionExit::ActionFailed {
                message: "boom".to_string(),
            },
            started_at: Utc::now(),
            elapsed_ms: 12,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "action_failed");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["outcome"], "hit");

        let parsed: SessionReport = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn exit_display() {
        assert_eq!(SessionExit::Completed.to_string(), "completed");
        assert_eq!(SessionExit::Panicked.to_string(), "panicked");
        assert!(SessionExit::Completed.is_success());
        assert!(!SessionExit::Abandoned.is_success());
    }
}
