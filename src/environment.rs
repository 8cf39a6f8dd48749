//! Execution environment snapshots and compatibility checking
//!
//! A snapshot records the core pipeline version plus auxiliary component
//! versions (plugins, runtimes) active when an action was recorded.
//!
//! | Difference | Severity | Lenient | Strict |
//! |------------|----------|---------|--------|
//! | none | - | hit | hit |
//! | auxiliary component | advisory | hit + warning | stale |
//! | core name or version | blocking | stale | stale |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named, versioned component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub version: String,
}

/// Versions of the components active when an action runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Core pipeline component; must match exactly for a cache hit
    pub core: Component,

    /// Auxiliary components by name
    #[serde(default)]
    pub components: BTreeMap<String, String>,
}

impl EnvironmentSnapshot {
    pub fn new(core: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            core: Component {
                name: core.into(),
                version: version.into(),
            },
            components: BTreeMap::new(),
        }
    }

    /// Snapshot of this build of provcache with no auxiliary components
    pub fn current() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    pub fn with_component(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.components.insert(name.into(), version.into());
        self
    }
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self::current()
    }
}

/// How much a version difference matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftSeverity {
    Blocking,
    Advisory,
}

/// One component whose version differs between recording and now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDrift {
    pub component: String,
    /// Version at record time (`None` if the component was absent)
    pub recorded: Option<String>,
    /// Version now (`None` if the component is absent)
    pub current: Option<String>,
    pub severity: DriftSeverity,
}

impl fmt::Display for ComponentDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.component,
            self.recorded.as_deref().unwrap_or("<absent>"),
            self.current.as_deref().unwrap_or("<absent>")
        )
    }
}

/// Result of comparing a stored snapshot with the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// Only auxiliary components differ
    Advisory(Vec<ComponentDrift>),
    /// The core component differs (auxiliary drift included)
    Incompatible(Vec<ComponentDrift>),
}

impl Compatibility {
    pub fn drift(&self) -> &[ComponentDrift] {
        match self {
            Self::Compatible => &[],
            Self::Advisory(drift) | Self::Incompatible(drift) => drift,
        }
    }
}

/// Strict or lenient treatment of auxiliary version drift
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompatibilityPolicy {
    pub strict: bool,
}

impl CompatibilityPolicy {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Compare a recorded environment against the current one, field by field
    pub fn check(&self, stored: &EnvironmentSnapshot, current: &EnvironmentSnapshot) -> Compatibility {
        let mut drift = Vec::new();

        if stored.core != current.core {
            let label = |c: &Component| format!("{}@{}", c.name, c.version);
            drift.push(ComponentDrift {
                component: "core".to_string(),
                recorded: Some(label(&stored.core)),
                current: Some(label(&current.core)),
                severity: DriftSeverity::Blocking,
            });
        }

        let names = stored
            .components
            .keys()
            .chain(current.components.keys())
            .collect::<std::collections::BTreeSet<_>>();
        for name in names {
            let recorded = stored.components.get(name);
            let now = current.components.get(name);
            if recorded != now {
                drift.push(ComponentDrift {
                    component: name.clone(),
                    recorded: recorded.cloned(),
                    current: now.cloned(),
                    severity: DriftSeverity::Advisory,
                });
            }
        }

        if drift.is_empty() {
            Compatibility::Compatible
        } else if drift.iter().any(|d| d.severity == DriftSeverity::Blocking) {
            Compatibility::Incompatible(drift)
        } else {
            Compatibility::Advisory(drift)
        }
    }

    /// Whether a hit recorded under `stored` may be reused now
    pub fn is_compatible(&self, stored: &EnvironmentSnapshot, current: &EnvironmentSnapshot) -> bool {
        match self.check(stored, current) {
            Compatibility::Compatible => true,
            Compatibility::Advisory(_) => !self.strict,
            Compatibility::Incompatible(_) => false,
        }
    }
}
