//! Init command - activate the cache directory and write .provcache.toml

use crate::cli::args::InitArgs;
use crate::config::{Config, LOCAL_CONFIG_NAME};
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::store::{RecordStore, SchemaStatus, SqliteStore};
use crate::ui::{self, UiContext};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Template for project-local config
const INIT_TEMPLATE: &str = r#"# provcache project configuration
# Settings here override your global config (~/.config/provcache/config.toml)

[general]
# log_format = "text"       # text, json
# journal = true            # append session reports to .cache/sessions.log

[cache]
# dir = ".cache"
# store_file = "records.db"
# busy_timeout_ms = 5000
# strict = false            # treat plugin version drift as a stale entry

[environment]
# core = "qiime2"
# core_version = "2024.5.0"

# [environment.components]
# q2-types = "2024.5.0"
"#;

/// Execute the init command
pub async fn execute(args: InitArgs, root: &Path, config: &Config) -> ProvcacheResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "provcache init");

    let dir = config.cache.cache_dir(root);
    dir.activate()?;
    ui::step_ok_detail(&ctx, "Cache activated", &dir.path().display().to_string());

    let store = SqliteStore::new(dir.store_path())
        .with_busy_timeout(Duration::from_millis(config.cache.busy_timeout_ms));
    match store.ensure_schema()? {
        SchemaStatus::Created => ui::step_ok(&ctx, "Record store created"),
        SchemaStatus::Existing => ui::step_info(&ctx, "Record store already present"),
    }

    let config_path = root.join(LOCAL_CONFIG_NAME);
    if config_path.exists() && !args.force {
        ui::step_warn_hint(
            &ctx,
            &format!("{} already exists", config_path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| ProvcacheError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created project config",
        &config_path.display().to_string(),
    );

    Ok(())
}
