//! provcache - action cache for data pipelines
//!
//! Fingerprints each pipeline action from its name, type, inputs and
//! parameters, records it in a per-pipeline SQLite store, and tells the
//! caller whether an identical, environment-compatible action already ran.

pub mod cache;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod session;
pub mod store;
pub mod ui;

pub use cache::{ActionCache, CacheDecision, CacheRecord, Outcome};
pub use descriptor::{ActionDescriptor, ActionType, ProvenanceDescriptor};
pub use environment::{CompatibilityPolicy, EnvironmentSnapshot};
pub use error::{ProvcacheError, ProvcacheResult};
pub use fingerprint::Fingerprint;
pub use graph::{build_graph, ProvenanceGraph};
pub use session::{CacheContext, CacheDir, CacheSession};
pub use store::{RecordStore, SqliteStore};
