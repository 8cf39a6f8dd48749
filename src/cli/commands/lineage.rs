//! Lineage command - ancestors or descendants of a record

use crate::cli::args::{LineageArgs, OutputFormat};
use crate::config::Config;
use crate::error::ProvcacheResult;
use crate::ui::{self, UiContext};
use std::path::Path;

use super::list::{print_json, print_plain, print_table};
use super::load_graph;

/// Execute the lineage command
pub async fn execute(args: LineageArgs, root: &Path, config: &Config) -> ProvcacheResult<()> {
    let graph = load_graph(root, config)?;

    let records = if args.downstream {
        graph.downstream(&args.record)?
    } else {
        graph.lineage(&args.record)?
    };

    match args.format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Plain => print_plain(&records),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            let title = if args.downstream {
                format!("Downstream of {}", args.record)
            } else {
                format!("Lineage of {}", args.record)
            };
            ui::intro(&ctx, &title);
            print_table(&records);
        }
    }

    Ok(())
}
