//! Record command - run an action file through the cache

use crate::cache::{CacheDecision, Outcome};
use crate::cli::args::{OutputFormat, RecordArgs};
use crate::config::Config;
use crate::descriptor::{ActionDescriptor, ProvenanceDescriptor};
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::session::CacheContext;
use crate::ui::{self, UiContext};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// JSON action file accepted by `provcache record`
#[derive(Debug, Deserialize)]
pub struct ActionFile {
    pub name: String,

    /// Callable that runs; defaults to `name`
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub provenance: ProvenanceDescriptor,

    /// Defaults to the pipeline root
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl ActionFile {
    pub async fn read(path: &Path) -> ProvcacheResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ProvcacheError::io(format!("reading {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| {
            ProvcacheError::InvalidDescriptor(format!("{}: {}", path.display(), e))
        })
    }

    pub fn into_descriptor(self, root: &Path) -> ProvcacheResult<ActionDescriptor> {
        let action = self.action.unwrap_or_else(|| self.name.clone());
        let working_dir = self.working_dir.unwrap_or_else(|| root.to_path_buf());
        ActionDescriptor::from_provenance(
            self.name,
            action,
            self.description,
            &self.provenance,
            working_dir,
        )
    }
}

/// Execute the record command
pub async fn execute(args: RecordArgs, root: &Path, config: &Config) -> ProvcacheResult<()> {
    let descriptor = ActionFile::read(&args.file).await?.into_descriptor(root)?;

    let context = CacheContext::from_config(root, config);
    let decision = context.begin(descriptor)?.decide()?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decision)?),
        OutputFormat::Plain => println!("{} {}", decision.outcome, decision.record.identifier),
        OutputFormat::Table => print_decision(&UiContext::detect(), &decision),
    }

    Ok(())
}

fn print_decision(ctx: &UiContext, decision: &CacheDecision) {
    let record = &decision.record;
    let fingerprint = record.fingerprint.short();

    match decision.outcome {
        Outcome::Hit => {
            ui::step_ok_detail(ctx, &format!("Cache hit for {}", record.name), fingerprint);
            for drift in &decision.drift {
                ui::step_warn(ctx, &format!("environment drift: {drift}"));
            }
            ui::remark(ctx, "Action can be skipped");
        }
        Outcome::Inserted | Outcome::SchemaInitialized => {
            ui::step_ok_detail(ctx, &format!("Recorded {}", record.name), fingerprint);
            if decision.outcome == Outcome::SchemaInitialized {
                ui::step_info(ctx, "Record store initialized");
            }
            ui::remark(ctx, "Action must be executed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ActionType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn action_file_parses_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a2.json");
        std::fs::write(
            &path,
            r#"{
                "name": "a2",
                "action_type": "method",
                "inputs": {"table": "a1"},
                "parameters": {"min_frequency": 10}
            }"#,
        )
        .unwrap();

        let descriptor = ActionFile::read(&path)
            .await
            .unwrap()
            .into_descriptor(temp.path())
            .unwrap();

        assert_eq!(descriptor.name(), "a2");
        assert_eq!(descriptor.action(), "a2");
        assert_eq!(descriptor.action_type(), ActionType::Transform);
        assert_eq!(descriptor.inputs()["table"], "a1");
        assert_eq!(descriptor.working_dir(), temp.path());
    }

    #[tokio::test]
    async fn invalid_action_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, r#"{"action_type": "import"}"#).unwrap();

        let err = ActionFile::read(&path).await.unwrap_err();
        assert!(matches!(err, ProvcacheError::InvalidDescriptor(_)));
    }

    #[tokio::test]
    async fn record_requires_activation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a1.json");
        std::fs::write(&path, r#"{"name": "a1", "action_type": "import"}"#).unwrap();

        let args = RecordArgs {
            file: path,
            format: OutputFormat::Plain,
        };
        let err = execute(args, temp.path(), &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvcacheError::CacheNotActivated { .. }));
    }
}
