//! Action cache
//!
//! Decides, for one action descriptor, whether a compatible record already
//! exists (hit) or a new record must be inserted.
//!
//! # Decision flow
//!
//! | Situation | Store access | Outcome |
//! |-----------|--------------|---------|
//! | Schema freshly created | insert | `SchemaInitialized` |
//! | Import action | insert (fresh identifier) | `Inserted` |
//! | Fingerprint found, compatible env | lookup | `Hit` |
//! | Fingerprint found, env drift | lookup | `Hit` + drift, or `StaleCacheEntry` |
//! | Fingerprint absent | lookup, insert | `Inserted` |
//! | Insert race lost | insert, lookup | resolved as a found fingerprint |

mod record;

pub use record::CacheRecord;

use crate::descriptor::ActionDescriptor;
use crate::environment::{Compatibility, CompatibilityPolicy, ComponentDrift, EnvironmentSnapshot};
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::fingerprint::{self, Fingerprint};
use crate::store::{RecordStore, SchemaStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the cache did for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A compatible prior record exists; the action can be skipped
    Hit,
    /// A new record was inserted
    Inserted,
    /// The store was created by this call and the record inserted
    SchemaInitialized,
}

impl Outcome {
    /// Whether the caller still has to run the action
    pub fn needs_execution(&self) -> bool {
        !matches!(self, Self::Hit)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Inserted => write!(f, "inserted"),
            Self::SchemaInitialized => write!(f, "schema-initialized"),
        }
    }
}

/// Result of [`ActionCache::check_or_record`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheDecision {
    pub record: CacheRecord,
    pub outcome: Outcome,
    /// Advisory environment drift tolerated on a lenient hit
    pub drift: Vec<ComponentDrift>,
}

/// Lookup-or-insert orchestration over a [`RecordStore`]
///
/// One instance corresponds to one pipeline run: every record it inserts
/// carries the same execution id.
#[derive(Debug)]
pub struct ActionCache<S> {
    store: S,
    environment: EnvironmentSnapshot,
    policy: CompatibilityPolicy,
    execution_id: Uuid,
}

impl<S> ActionCache<S> {
    /// Create a cache with a lenient compatibility policy
    pub fn new(store: S, environment: EnvironmentSnapshot) -> Self {
        Self {
            store,
            environment,
            policy: CompatibilityPolicy::default(),
            execution_id: Uuid::new_v4(),
        }
    }

    pub fn with_policy(mut self, policy: CompatibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn environment(&self) -> &EnvironmentSnapshot {
        &self.environment
    }

    pub fn policy(&self) -> CompatibilityPolicy {
        self.policy
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }
}

impl<S: RecordStore> ActionCache<S> {
    /// Return the prior record for this action, or record it now
    pub fn check_or_record(&self, descriptor: &ActionDescriptor) -> ProvcacheResult<CacheDecision> {
        let fingerprint = fingerprint::encode(descriptor)?.fingerprint();
        debug!(
            "Checking action {} ({}) fingerprint {}",
            descriptor.name(),
            descriptor.action_type(),
            fingerprint.short()
        );

        if self.store.ensure_schema()? == SchemaStatus::Created {
            info!("Initialized record store for action {}", descriptor.name());
            return self.insert_or_resolve(descriptor, fingerprint, Outcome::SchemaInitialized);
        }

        if descriptor.action_type().is_import() {
            return self.insert_or_resolve(descriptor, fingerprint, Outcome::Inserted);
        }

        match self.store.lookup(fingerprint.as_str())? {
            Some(existing) => self.resolve_existing(existing, &fingerprint),
            None => self.insert_or_resolve(descriptor, fingerprint, Outcome::Inserted),
        }
    }

    fn insert_or_resolve(
        &self,
        descriptor: &ActionDescriptor,
        fingerprint: Fingerprint,
        fresh: Outcome,
    ) -> ProvcacheResult<CacheDecision> {
        let record = CacheRecord::new(
            descriptor,
            fingerprint.clone(),
            self.environment.clone(),
            self.execution_id,
        );

        match self.store.insert(&record) {
            Ok(()) => {
                info!(
                    "Recorded action {} as {} ({})",
                    record.name, record.identifier, fresh
                );
                Ok(CacheDecision {
                    record,
                    outcome: fresh,
                    drift: vec![],
                })
            }
            Err(ProvcacheError::DuplicateFingerprint(identifier))
                if !descriptor.action_type().is_import() =>
            {
                debug!("Lost insert race for {}, resolving by lookup", identifier);
                match self.store.lookup(&identifier)? {
                    Some(existing) => self.resolve_existing(existing, &fingerprint),
                    None => Err(ProvcacheError::DuplicateFingerprint(identifier)),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_existing(
        &self,
        existing: CacheRecord,
        fingerprint: &Fingerprint,
    ) -> ProvcacheResult<CacheDecision> {
        if existing.fingerprint != *fingerprint {
            return Err(ProvcacheError::CorruptRecord {
                identifier: existing.identifier,
                reason: format!(
                    "stored fingerprint {} does not match {}",
                    existing.fingerprint, fingerprint
                ),
            });
        }

        match self.policy.check(&existing.environment, &self.environment) {
            Compatibility::Compatible => {
                info!("Cache hit for action {}", existing.name);
                Ok(CacheDecision {
                    record: existing,
                    outcome: Outcome::Hit,
                    drift: vec![],
                })
            }
            Compatibility::Advisory(drift) if !self.policy.strict => {
                warn!(
                    "Cache hit for action {} recorded under different component versions: {}",
                    existing.name,
                    drift
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                Ok(CacheDecision {
                    record: existing,
                    outcome: Outcome::Hit,
                    drift,
                })
            }
            Compatibility::Advisory(drift) | Compatibility::Incompatible(drift) => {
                Err(ProvcacheError::StaleCacheEntry {
                    name: existing.name,
                    fingerprint: fingerprint.to_string(),
                    drift,
                })
            }
        }
    }
}
