mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tailmap_core::{Reconciler, TopologyStore};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;

    // `watch --interval` overrides the configured refresh cadence.
    if let Command::Watch(args) = &cli.command {
        if args.interval > 0 {
            cfg.core.refresh_interval_secs = args.interval;
        }
    }

    let sources = config::build_sources(&cfg, &cli.global)?;
    if sources.is_empty() && matches!(cli.command, Command::Refresh) {
        // An explicit refresh with nothing to pull from can only fail;
        // report the configuration gap instead.
        return Err(CliError::NoSources {
            config_path: config::config_path().display().to_string(),
        });
    }

    let store = Arc::new(TopologyStore::new());
    let reconciler = Arc::new(Reconciler::new(store, sources, cfg.core));

    // `refresh` does its own pull and should surface source exhaustion;
    // every other command starts from a best-effort boot sync.
    if !matches!(cli.command, Command::Refresh) {
        reconciler.sync_at_boot().await;
    }

    commands::dispatch(cli.command, &reconciler, &cli.global).await
}
