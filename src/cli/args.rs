//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// provcache - action cache for data pipelines
///
/// Records every executed pipeline action under a content fingerprint so
/// identical actions can be skipped and their provenance reused.
#[derive(Parser, Debug)]
#[command(name = "provcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PROVCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .provcache.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Pipeline root directory (defaults to current directory)
    #[arg(short, long, global = true, env = "PROVCACHE_ROOT")]
    pub root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activate the cache directory and write a project config
    Init(InitArgs),

    /// Show cache activation, store and environment status
    Status,

    /// List recorded actions
    List(ListArgs),

    /// Show a single record
    Show(ShowArgs),

    /// Show the provenance graph
    Graph(GraphArgs),

    /// Show the upstream or downstream lineage of a record
    Lineage(LineageArgs),

    /// Check an action described in a JSON file against the cache
    Record(RecordArgs),

    /// Compare two artifact files by content digest
    Compare(CompareArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing .provcache.toml
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show actions of this type (import, transform, visualize, pipeline)
    #[arg(short = 't', long = "type")]
    pub action_type: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Record identifier (fingerprint) or action name
    pub record: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the graph command
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the lineage command
#[derive(Parser, Debug)]
pub struct LineageArgs {
    /// Record identifier (fingerprint) or action name
    pub record: String,

    /// Follow consumers instead of producers
    #[arg(short, long)]
    pub downstream: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the record command
#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// JSON action file (name, action, action_type, inputs, parameters)
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the compare command
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// Artifact as originally recorded
    pub origin: PathBuf,

    /// Artifact to compare against it
    pub current: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default global configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
