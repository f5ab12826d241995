//! `show` handlers: device table, connection edges, aggregate stats.

use std::sync::Arc;

use chrono::Utc;
use tabled::Tabled;

use tailmap_core::{Connection, Device, NetworkStats, Reconciler};

use crate::cli::{GlobalOpts, ShowArgs, ShowTarget};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

#[derive(Tabled)]
struct ConnectionRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn device_row(d: &Arc<Device>, color: bool) -> DeviceRow {
    let name = if d.coordinator {
        format!("{} *", d.name)
    } else {
        d.name.clone()
    };
    DeviceRow {
        name,
        hostname: d.hostname.clone(),
        address: d.address.clone(),
        class: d.class.to_string(),
        os: d.os.clone(),
        status: output::status_cell(d.status, color),
        last_seen: humanize_age(d),
        tags: d.tags.join(", "),
    }
}

fn humanize_age(d: &Arc<Device>) -> String {
    let age = Utc::now().signed_duration_since(d.last_seen);
    let secs = age.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

fn stats_detail(stats: &NetworkStats) -> String {
    [
        format!("Total:     {}", stats.total),
        format!("Online:    {}", stats.online),
        format!("Unstable:  {}", stats.unstable),
        format!("Offline:   {}", stats.offline),
        format!("Computed:  {}", stats.last_updated.to_rfc3339()),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    reconciler: &Arc<Reconciler>,
    args: &ShowArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = reconciler.store();
    let color = output::should_color(&global.color);

    let rendered = match args.what {
        ShowTarget::Devices => {
            let devices = store.devices();
            output::render_list(
                &global.output,
                &devices,
                |d| device_row(d, color),
                |d| d.name.clone(),
            )
        }
        ShowTarget::Connections => {
            let snap = store.snapshot();
            output::render_list(
                &global.output,
                &snap.connections,
                |c| connection_row(c, &snap.devices),
                |c| format!("{}->{}", c.from.0, c.to.0),
            )
        }
        ShowTarget::Stats => {
            let stats = store.stats();
            output::render_single(&global.output, &stats, stats_detail, |s| {
                format!("{}/{}", s.online, s.total)
            })
        }
    };

    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn connection_row(c: &Arc<Connection>, devices: &[Arc<Device>]) -> ConnectionRow {
    let name_of = |id| {
        devices
            .iter()
            .find(|d| d.id == id)
            .map_or_else(|| format!("#{}", id.0), |d| d.name.clone())
    };
    ConnectionRow {
        from: name_of(c.from),
        to: name_of(c.to),
        status: c.status.to_string(),
    }
}
