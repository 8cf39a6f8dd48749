//! Persisted cache records

use crate::descriptor::{ActionDescriptor, ActionType, ArtifactRef};
use crate::environment::EnvironmentSnapshot;
use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// One executed action, as stored in the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Primary key, derived from the fingerprint
    pub identifier: String,

    /// Content identity of the action
    pub fingerprint: Fingerprint,

    pub name: String,

    pub action: String,

    pub action_type: ActionType,

    pub description: String,

    pub inputs: BTreeMap<String, ArtifactRef>,

    pub parameters: BTreeMap<String, serde_json::Value>,

    /// Working directory at invocation (provenance only)
    pub working_dir: PathBuf,

    /// Component versions active when the record was made
    pub environment: EnvironmentSnapshot,

    /// Pipeline run that inserted the record
    pub execution_id: Uuid,

    pub created_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Build the record for a descriptor about to be inserted
    ///
    /// Imports get a fresh identifier per execution: each import originates
    /// new data, so identical import descriptors never share a row.
    pub fn new(
        descriptor: &ActionDescriptor,
        fingerprint: Fingerprint,
        environment: EnvironmentSnapshot,
        execution_id: Uuid,
    ) -> Self {
        let identifier = if descriptor.action_type().is_import() {
            format!("{}-{}", fingerprint, Uuid::new_v4().simple())
        } else {
            fingerprint.as_str().to_string()
        };

        Self {
            identifier,
            fingerprint,
            name: descriptor.name().to_string(),
            action: descriptor.action().to_string(),
            action_type: descriptor.action_type(),
            description: descriptor.description().to_string(),
            inputs: descriptor.inputs().clone(),
            parameters: descriptor.parameters().clone(),
            working_dir: descriptor.working_dir().to_path_buf(),
            environment,
            execution_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(action_type: ActionType) -> ActionDescriptor {
        ActionDescriptor::builder("a1", action_type)
            .working_dir("/work")
            .input("art", "a0")
            .build()
            .unwrap()
    }

    #[test]
    fn transform_identifier_is_fingerprint() {
        let fp = Fingerprint::from_hex("ab".repeat(32));
        let record = CacheRecord::new(
            &descriptor(ActionType::Transform),
            fp.clone(),
            EnvironmentSnapshot::current(),
            Uuid::new_v4(),
        );
        assert_eq!(record.identifier, fp.as_str());
        assert_eq!(record.inputs["art"], "a0");
        assert_eq!(record.working_dir, PathBuf::from("/work"));
    }

    #[test]
    fn import_identifiers_are_unique_per_record() {
        let fp = Fingerprint::from_hex("cd".repeat(32));
        let run = Uuid::new_v4();
        let first = CacheRecord::new(
            &descriptor(ActionType::Import),
            fp.clone(),
            EnvironmentSnapshot::current(),
            run,
        );
        let second = CacheRecord::new(
            &descriptor(ActionType::Import),
            fp.clone(),
            EnvironmentSnapshot::current(),
            run,
        );

        assert_ne!(first.identifier, second.identifier);
        assert!(first.identifier.starts_with(fp.as_str()));
        assert_eq!(first.fingerprint, second.fingerprint);
    }
}
