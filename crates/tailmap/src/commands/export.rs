//! `export` handler: write the current devices as a manual device file.

use std::sync::Arc;

use tailmap_core::{FileSource, Reconciler};
use tracing::info;

use crate::cli::{ExportArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    reconciler: &Arc<Reconciler>,
    args: &ExportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let devices = reconciler.store().devices();
    FileSource::new(&args.path).export(&devices).await?;
    info!(path = %args.path.display(), count = devices.len(), "device file written");

    output::print_output(
        &format!("wrote {} devices to {}", devices.len(), args.path.display()),
        global.quiet,
    );
    Ok(())
}
