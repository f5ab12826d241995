//! `watch` handler: follow topology change events until interrupted.
//!
//! Subscribes before starting the periodic refresh task, so the first
//! line is always the current full snapshot.

use std::sync::Arc;

use chrono::Utc;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use tailmap_core::{Reconciler, TopologyEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    reconciler: &Arc<Reconciler>,
    _args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut stream = reconciler.store().subscribe();
    let cancel = CancellationToken::new();
    let periodic = reconciler.spawn_periodic(cancel.clone());
    let color = output::should_color(&global.color);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            event = stream.recv() => {
                let Some(event) = event else { break };
                let line = match global.output {
                    OutputFormat::Json | OutputFormat::JsonCompact => {
                        serde_json::to_string(&event).unwrap_or_default()
                    }
                    _ => describe(&event, color),
                };
                output::print_output(&line, global.quiet);
            }
        }
    }

    cancel.cancel();
    if let Some(handle) = periodic {
        let _ = handle.await;
    }
    Ok(())
}

fn describe(event: &TopologyEvent, color: bool) -> String {
    let ts = Utc::now().format("%H:%M:%S");
    let body = match event {
        TopologyEvent::DeviceAdded(d) => {
            format!(
                "device added     {} ({})",
                d.name,
                output::status_cell(d.status, color)
            )
        }
        TopologyEvent::DeviceRemoved(d) => format!("device removed   {}", d.name),
        TopologyEvent::DeviceStatusChanged { device, previous } => format!(
            "status changed   {} {} -> {}",
            device.name,
            output::status_cell(*previous, color),
            output::status_cell(device.status, color)
        ),
        TopologyEvent::StatsUpdated(stats) => format!(
            "stats            {}/{} online, {} unstable",
            stats.online, stats.total, stats.unstable
        ),
        TopologyEvent::FullTopologyReplaced(snap) => format!(
            "topology         {} devices, {} connections",
            snap.devices.len(),
            snap.connections.len()
        ),
    };
    if color {
        format!("{} {body}", ts.dimmed())
    } else {
        format!("{ts} {body}")
    }
}
