//! Command dispatch: bridges CLI args -> core operations -> output.

pub mod export;
pub mod metrics;
pub mod show;
pub mod watch;

use std::sync::Arc;

use tailmap_core::Reconciler;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    reconciler: &Arc<Reconciler>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Show(args) => show::handle(reconciler, &args, global),
        Command::Refresh => {
            reconciler.refresh().await?;
            show::handle(
                reconciler,
                &crate::cli::ShowArgs {
                    what: crate::cli::ShowTarget::Stats,
                },
                global,
            )
        }
        Command::Watch(args) => watch::handle(reconciler, &args, global).await,
        Command::Metrics => metrics::handle(reconciler, global),
        Command::Export(args) => export::handle(reconciler, &args, global).await,
    }
}
