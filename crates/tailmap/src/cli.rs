//! Clap derive structures for the `tailmap` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tailmap -- private device network topology from the command line
#[derive(Debug, Parser)]
#[command(
    name = "tailmap",
    version,
    about = "Inspect and follow your private network topology",
    long_about = "Pulls the device roster from the directory API or a manual\n\
        device file, reconciles it into a live topology, and renders it as\n\
        tables, JSON, a metrics projection, or a followed event stream.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Tailnet name (overrides the config file)
    #[arg(long, short = 't', env = "TAILMAP_TAILNET", global = true)]
    pub tailnet: Option<String>,

    /// Directory API key
    #[arg(long, env = "TAILMAP_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Manual device file (JSON), used when the directory is unreachable
    #[arg(long, short = 'f', env = "TAILMAP_DEVICE_FILE", global = true)]
    pub device_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TAILMAP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current topology
    #[command(alias = "s")]
    Show(ShowArgs),

    /// Re-pull from the source chain and show the result
    #[command(alias = "r")]
    Refresh,

    /// Follow topology change events as they happen
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Print the metrics projection in Prometheus exposition format
    Metrics,

    /// Write the current devices out as a manual device file
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// What part of the topology to show
    #[arg(value_enum, default_value = "devices")]
    pub what: ShowTarget,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ShowTarget {
    /// Device table
    Devices,
    /// Connection edges
    Connections,
    /// Aggregate status counts
    Stats,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds while watching (0 uses the config value)
    #[arg(long, short = 'i', default_value = "0")]
    pub interval: u64,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Destination path for the device file
    pub path: PathBuf,
}
