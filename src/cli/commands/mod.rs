//! CLI command implementations

pub mod compare;
pub mod config;
pub mod graph;
pub mod init;
pub mod lineage;
pub mod list;
pub mod record;
pub mod show;
pub mod status;

pub use compare::execute as compare;
pub use config::execute as config;
pub use graph::execute as graph;
pub use init::execute as init;
pub use lineage::execute as lineage;
pub use list::execute as list;
pub use record::execute as record;
pub use show::execute as show;
pub use status::execute as status;

use crate::config::Config;
use crate::error::ProvcacheResult;
use crate::graph::{build_graph, ProvenanceGraph};
use crate::store::SqliteStore;
use std::path::Path;
use std::time::Duration;

/// Load the provenance graph of an activated cache
pub(crate) fn load_graph(root: &Path, config: &Config) -> ProvcacheResult<ProvenanceGraph> {
    let dir = config.cache.cache_dir(root);
    dir.require_activated()?;
    let store = SqliteStore::new(dir.store_path())
        .with_busy_timeout(Duration::from_millis(config.cache.busy_timeout_ms));
    build_graph(&store)
}
