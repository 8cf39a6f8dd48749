//! List command - show recorded actions

use crate::cache::CacheRecord;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::descriptor::ActionType;
use crate::error::ProvcacheResult;
use crate::ui::{self, UiContext};
use console::style;
use std::path::Path;

use super::load_graph;

/// Execute the list command
pub async fn execute(args: ListArgs, root: &Path, config: &Config) -> ProvcacheResult<()> {
    let filter: Option<ActionType> = args.action_type.as_deref().map(str::parse).transpose()?;

    let graph = load_graph(root, config)?;
    let records: Vec<&CacheRecord> = graph
        .topological_order()?
        .into_iter()
        .filter(|r| filter.map_or(true, |t| r.action_type == t))
        .collect();

    if records.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No recorded actions");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, "Recorded actions");
            print_table(&records);
        }
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Plain => print_plain(&records),
    }

    Ok(())
}

pub(crate) fn print_table(records: &[&CacheRecord]) {
    println!(
        "{:<14} {:<20} {:<11} {:<17} {:<30}",
        style("FINGERPRINT").bold(),
        style("NAME").bold(),
        style("TYPE").bold(),
        style("CREATED").bold(),
        style("ACTION").bold()
    );
    println!("{}", "-".repeat(92));

    for record in records {
        let type_styled = match record.action_type {
            ActionType::Import => style(record.action_type.as_str()).cyan(),
            ActionType::Transform => style(record.action_type.as_str()).green(),
            ActionType::Visualize => style(record.action_type.as_str()).magenta(),
            ActionType::Pipeline => style(record.action_type.as_str()).yellow(),
        };

        println!(
            "{:<14} {:<20} {:<11} {:<17} {:<30}",
            record.fingerprint.short(),
            record.name,
            type_styled,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.action
        );
    }

    println!();
    println!("{} record(s)", records.len());
}

pub(crate) fn print_json(records: &[&CacheRecord]) -> ProvcacheResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    println!("{}", json);
    Ok(())
}

pub(crate) fn print_plain(records: &[&CacheRecord]) {
    for record in records {
        println!("{}", record.identifier);
    }
}
