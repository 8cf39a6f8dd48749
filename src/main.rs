//! provcache - action cache for data pipelines
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use provcache::cli::{commands, Cli, Commands};
use provcache::config::ConfigManager;
use provcache::error::{ProvcacheError, ProvcacheResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ProvcacheResult<()> {
    let cli = Cli::parse();

    let root = match cli.root {
        Some(ref root) => root.clone(),
        None => std::env::current_dir()
            .map_err(|e| ProvcacheError::io("getting current directory", e))?,
    };

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let local_config_path = if cli.no_local {
        None
    } else {
        ConfigManager::find_local_config(&root)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("provcache=warn"),
        1 => EnvFilter::new("provcache=info"),
        _ => EnvFilter::new("provcache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    if let Some(ref path) = local_config_path {
        debug!("Loaded local config: {}", path.display());
    }
    debug!("Pipeline root: {}", root.display());

    match cli.command {
        Commands::Init(args) => commands::init(args, &root, &config).await,
        Commands::Status => commands::status(&root, &config).await,
        Commands::List(args) => commands::list(args, &root, &config).await,
        Commands::Show(args) => commands::show(args, &root, &config).await,
        Commands::Graph(args) => commands::graph(args, &root, &config).await,
        Commands::Lineage(args) => commands::lineage(args, &root, &config).await,
        Commands::Record(args) => commands::record(args, &root, &config).await,
        Commands::Compare(args) => commands::compare(args).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}
