//! Configuration schema for provcache
//!
//! Global configuration lives at `~/.config/provcache/config.toml`; a
//! project-local `.provcache.toml` in the pipeline root overrides it.

use crate::environment::EnvironmentSnapshot;
use crate::session::activation::{CacheDir, CACHE_DIR_NAME, STORE_FILE_NAME};
use crate::store::DEFAULT_BUSY_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache and record store settings
    pub cache: CacheConfig,

    /// Environment recorded with each action
    pub environment: EnvironmentConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append session reports to the cache's sessions.log
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory, relative to the pipeline root unless absolute
    pub dir: PathBuf,

    /// Record store file name inside the cache directory
    pub store_file: String,

    /// How long to wait on a locked store before failing (milliseconds)
    pub busy_timeout_ms: u64,

    /// Treat auxiliary component drift as a stale entry instead of a warning
    pub strict: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(CACHE_DIR_NAME),
            store_file: STORE_FILE_NAME.to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            strict: false,
        }
    }
}

impl CacheConfig {
    /// Resolve the cache directory for a pipeline root
    pub fn cache_dir(&self, root: &Path) -> CacheDir {
        let dir = if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            root.join(&self.dir)
        };
        CacheDir::at(dir).with_store_file(self.store_file.clone())
    }
}

/// Environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Core pipeline component name
    pub core: String,

    /// Core version (defaults to this provcache version)
    pub core_version: Option<String>,

    /// Auxiliary component versions (plugins, runtimes)
    pub components: BTreeMap<String, String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            core: env!("CARGO_PKG_NAME").to_string(),
            core_version: None,
            components: BTreeMap::new(),
        }
    }
}

impl EnvironmentConfig {
    /// The environment snapshot recorded for new actions
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        let version = self
            .core_version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let mut snapshot = EnvironmentSnapshot::new(self.core.clone(), version);
        snapshot.components = self.components.clone();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.busy_timeout_ms, 5_000);
        assert!(!config.cache.strict);
        assert!(config.general.journal);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            strict = true

            [environment]
            core = "qiime2"
            core_version = "2024.5.0"

            [environment.components]
            q2-types = "2024.5.0"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.cache.strict);
        assert_eq!(config.cache.store_file, "records.db"); // default preserved

        let snapshot = config.environment.snapshot();
        assert_eq!(snapshot.core.name, "qiime2");
        assert_eq!(snapshot.core.version, "2024.5.0");
        assert_eq!(snapshot.components["q2-types"], "2024.5.0");
    }

    #[test]
    fn snapshot_defaults_to_crate_version() {
        let snapshot = EnvironmentConfig::default().snapshot();
        assert_eq!(snapshot, EnvironmentSnapshot::current());
    }

    #[test]
    fn cache_dir_resolves_against_root() {
        let config = CacheConfig::default();
        let dir = config.cache_dir(Path::new("/pipeline"));
        assert_eq!(dir.path(), Path::new("/pipeline/.cache"));

        let absolute = CacheConfig {
            dir: PathBuf::from("/var/cache/pipeline"),
            store_file: "actions.sqlite".to_string(),
            ..CacheConfig::default()
        };
        let dir = absolute.cache_dir(Path::new("/pipeline"));
        assert_eq!(
            dir.store_path(),
            PathBuf::from("/var/cache/pipeline/actions.sqlite")
        );
    }
}
