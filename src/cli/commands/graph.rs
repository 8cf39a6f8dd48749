//! Graph command - provenance nodes, edges and unresolved inputs

use crate::cli::args::{GraphArgs, OutputFormat};
use crate::config::Config;
use crate::error::ProvcacheResult;
use crate::ui::{self, UiContext};
use console::style;
use std::path::Path;

use super::load_graph;

/// Execute the graph command
pub async fn execute(args: GraphArgs, root: &Path, config: &Config) -> ProvcacheResult<()> {
    let graph = load_graph(root, config)?;

    match args.format {
        OutputFormat::Json => {
            let nodes: Vec<_> = graph
                .topological_order()?
                .into_iter()
                .map(|r| {
                    serde_json::json!({
                        "identifier": r.identifier,
                        "name": r.name,
                        "action_type": r.action_type,
                    })
                })
                .collect();
            let edges: Vec<_> = graph
                .edges()
                .into_iter()
                .map(|(producer, consumer, parameter)| {
                    serde_json::json!({
                        "producer": producer,
                        "consumer": consumer,
                        "parameter": parameter,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "nodes": nodes,
                "edges": edges,
                "unresolved": graph.unresolved(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for (producer, consumer, parameter) in graph.edges() {
                println!("{producer} {consumer} {parameter}");
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, "Provenance graph");

            let name_of = |identifier: &str| {
                graph
                    .get(identifier)
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| identifier.to_string())
            };

            for (producer, consumer, parameter) in graph.edges() {
                println!(
                    "  {} {} {} {}",
                    name_of(producer),
                    style("->").dim(),
                    name_of(consumer),
                    style(format!("({parameter})")).dim()
                );
            }

            let roots: Vec<_> = graph.roots().into_iter().map(|r| r.name.as_str()).collect();
            ui::section(&ctx, "Roots:");
            ui::remark(&ctx, &roots.join(", "));

            if !graph.unresolved().is_empty() {
                ui::section(&ctx, "Unresolved inputs:");
                for input in graph.unresolved() {
                    ui::step_warn(
                        &ctx,
                        &format!(
                            "{} {}={}",
                            name_of(&input.consumer),
                            input.parameter,
                            input.reference
                        ),
                    );
                }
            }

            println!();
            println!(
                "{} record(s), {} edge(s)",
                graph.node_count(),
                graph.edge_count()
            );
        }
    }

    Ok(())
}
