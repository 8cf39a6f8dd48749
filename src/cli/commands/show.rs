//! Show command - display a single record

use crate::cache::CacheRecord;
use crate::cli::args::{OutputFormat, ShowArgs};
use crate::config::Config;
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::ui::{self, UiContext};
use std::path::Path;

use super::load_graph;

/// Execute the show command
pub async fn execute(args: ShowArgs, root: &Path, config: &Config) -> ProvcacheResult<()> {
    let graph = load_graph(root, config)?;
    let record = graph
        .get(&args.record)
        .ok_or_else(|| ProvcacheError::RecordNotFound(args.record.clone()))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Plain => println!("{}", record.identifier),
        OutputFormat::Table => print_details(&UiContext::detect(), record)?,
    }

    Ok(())
}

pub(crate) fn print_details(ctx: &UiContext, record: &CacheRecord) -> ProvcacheResult<()> {
    ui::intro(ctx, &record.name);

    ui::key_value(ctx, "identifier", &record.identifier);
    ui::key_value(ctx, "action", &record.action);
    ui::key_value(ctx, "type", record.action_type.as_str());
    if !record.description.is_empty() {
        ui::key_value(ctx, "description", &record.description);
    }
    ui::key_value(ctx, "working dir", &record.working_dir.display().to_string());
    ui::key_value(ctx, "created", &record.created_at.to_rfc3339());
    ui::key_value(ctx, "execution", &record.execution_id.to_string());

    if !record.inputs.is_empty() {
        ui::section(ctx, "Inputs:");
        for (param, reference) in &record.inputs {
            ui::key_value(ctx, param, reference);
        }
    }

    if !record.parameters.is_empty() {
        ui::section(ctx, "Parameters:");
        for (param, value) in &record.parameters {
            ui::key_value(ctx, param, &serde_json::to_string(value)?);
        }
    }

    ui::section(ctx, "Environment:");
    let env = &record.environment;
    ui::key_value(ctx, &env.core.name, &env.core.version);
    for (name, version) in &env.components {
        ui::key_value(ctx, name, version);
    }

    Ok(())
}
