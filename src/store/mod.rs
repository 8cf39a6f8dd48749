//! Persistent record store
//!
//! The store holds one row per executed action and is the only
//! cross-process coordination point: uniqueness of the record identifier is
//! enforced here, not by callers.

mod sqlite;

pub use sqlite::{SqliteStore, DEFAULT_BUSY_TIMEOUT_MS};

use crate::cache::CacheRecord;
use crate::error::ProvcacheResult;

/// Whether `ensure_schema` created the schema or found it in place
///
/// Both variants mean the schema now exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    Created,
    Existing,
}

/// Storage backend for cache records
///
/// Implementations acquire their handles per call and release them on every
/// exit path.
pub trait RecordStore: Send + Sync {
    /// Create the schema if absent; idempotent and safe under concurrent callers
    fn ensure_schema(&self) -> ProvcacheResult<SchemaStatus>;

    /// Exact-match lookup by identifier
    fn lookup(&self, identifier: &str) -> ProvcacheResult<Option<CacheRecord>>;

    /// Insert a new record
    ///
    /// Fails with `DuplicateFingerprint` if the identifier is taken and
    /// `StoreUnavailable` if the backing storage cannot be reached.
    fn insert(&self, record: &CacheRecord) -> ProvcacheResult<()>;

    /// All records in insertion order (empty if no schema yet)
    fn records(&self) -> ProvcacheResult<Vec<CacheRecord>>;
}

impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    fn ensure_schema(&self) -> ProvcacheResult<SchemaStatus> {
        (**self).ensure_schema()
    }

    fn lookup(&self, identifier: &str) -> ProvcacheResult<Option<CacheRecord>> {
        (**self).lookup(identifier)
    }

    fn insert(&self, record: &CacheRecord) -> ProvcacheResult<()> {
        (**self).insert(record)
    }

    fn records(&self) -> ProvcacheResult<Vec<CacheRecord>> {
        (**self).records()
    }
}
