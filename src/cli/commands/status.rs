//! Status command - cache activation, store and environment

use crate::config::Config;
use crate::error::ProvcacheResult;
use crate::session::ActivationState;
use crate::store::{RecordStore, SqliteStore};
use crate::ui::{self, UiContext};
use std::path::Path;
use std::time::Duration;

/// Execute the status command
pub async fn execute(root: &Path, config: &Config) -> ProvcacheResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "provcache status");

    let dir = config.cache.cache_dir(root);

    ui::section(&ctx, "Cache:");
    ui::key_value(&ctx, "root", &root.display().to_string());
    ui::key_value(&ctx, "directory", &dir.path().display().to_string());

    let activated = match dir.activation_state() {
        ActivationState::Activated => {
            ui::key_value_status(&ctx, "state", "activated", true);
            true
        }
        ActivationState::Missing => {
            ui::key_value_status(&ctx, "state", "missing", false);
            false
        }
        ActivationState::Inactive(reason) => {
            ui::key_value_status(&ctx, "state", &format!("inactive ({reason})"), false);
            false
        }
    };

    ui::section(&ctx, "Store:");
    ui::key_value(&ctx, "path", &dir.store_path().display().to_string());
    if activated {
        let store = SqliteStore::new(dir.store_path())
            .with_busy_timeout(Duration::from_millis(config.cache.busy_timeout_ms));
        match store.records() {
            Ok(records) => ui::key_value_status(&ctx, "records", &records.len().to_string(), true),
            Err(e) => ui::key_value_status(&ctx, "records", &e.to_string(), false),
        }
    }
    let policy = if config.cache.strict { "strict" } else { "lenient" };
    ui::key_value(&ctx, "policy", policy);

    ui::section(&ctx, "Environment:");
    let snapshot = config.environment.snapshot();
    ui::key_value(&ctx, &snapshot.core.name, &snapshot.core.version);
    for (name, version) in &snapshot.components {
        ui::key_value(&ctx, name, version);
    }

    if activated {
        ui::outro_success(&ctx, "Cache ready");
    } else {
        ui::outro_warn(&ctx, "Cache not activated - Run: provcache init");
    }

    Ok(())
}
