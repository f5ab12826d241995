//! `metrics` handler: Prometheus exposition text for the topology.

use std::fmt::Write as _;
use std::sync::Arc;

use tailmap_core::{Reconciler, StatusCounts, TopologySnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub fn handle(reconciler: &Arc<Reconciler>, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = reconciler.store().snapshot();
    output::print_output(&render(&snapshot), global.quiet);
    Ok(())
}

fn render(snapshot: &TopologySnapshot) -> String {
    let stats = &snapshot.stats;
    let counts = StatusCounts::from_stats(stats);

    let mut out = String::new();
    gauge(
        &mut out,
        "tailmap_total_devices",
        "Total number of devices in the network",
        stats.total,
    );
    gauge(
        &mut out,
        "tailmap_online_devices",
        "Number of online devices",
        stats.online,
    );
    gauge(
        &mut out,
        "tailmap_offline_devices",
        "Number of offline devices",
        stats.offline,
    );
    gauge(
        &mut out,
        "tailmap_unstable_devices",
        "Number of unstable devices",
        stats.unstable,
    );

    let _ = writeln!(out, "# HELP tailmap_devices_by_status Number of devices by status");
    let _ = writeln!(out, "# TYPE tailmap_devices_by_status gauge");
    let _ = writeln!(
        out,
        "tailmap_devices_by_status{{status=\"connected\"}} {}",
        counts.connected
    );
    let _ = writeln!(
        out,
        "tailmap_devices_by_status{{status=\"disconnected\"}} {}",
        counts.disconnected
    );
    let _ = writeln!(
        out,
        "tailmap_devices_by_status{{status=\"unstable\"}} {}",
        counts.unstable
    );
    out.push('\n');

    let _ = writeln!(out, "# HELP tailmap_device_info Device information");
    let _ = writeln!(out, "# TYPE tailmap_device_info gauge");
    for d in &snapshot.devices {
        let _ = writeln!(
            out,
            "tailmap_device_info{{name=\"{}\",hostname=\"{}\",class=\"{}\",os=\"{}\",status=\"{}\"}} 1",
            d.name, d.hostname, d.class, d.os, d.status
        );
    }
    out
}

fn gauge(out: &mut String, name: &str, help: &str, value: usize) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {value}");
    out.push('\n');
}
