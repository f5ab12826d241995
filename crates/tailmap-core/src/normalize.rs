// ── Source-record normalization ──
//
// Every source, whatever its wire shape, reduces to a `DeviceRecord`.
// The classification rules here are the single place where OS labels
// become device classes and {online, last-seen age} becomes a status.

use chrono::{DateTime, Utc};
use std::time::Duration;

use tailmap_api::{DirectoryDevice, ManualDevice};

use crate::model::{DeviceClass, DeviceDraft, DeviceStatus};

/// The tag that designates a device as the hub coordinator.
pub const COORDINATOR_TAG: &str = "coordinator";

/// A source record after shape normalization, before status
/// classification (which needs "now" and the staleness threshold).
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub external_id: String,
    pub name: String,
    pub hostname: String,
    pub address: String,
    pub os: String,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub coordinator: bool,
    /// Class the source stated outright; `None` means classify from the OS.
    pub class_hint: Option<DeviceClass>,
}

impl DeviceRecord {
    /// Classify and convert into a store draft.
    pub fn into_draft(self, now: DateTime<Utc>, staleness: Duration) -> DeviceDraft {
        let class = self.class_hint.unwrap_or_else(|| classify_os(&self.os));
        let status = classify_status(self.online, self.last_seen, now, staleness);
        DeviceDraft {
            external_id: self.external_id,
            name: self.name,
            hostname: self.hostname,
            address: self.address,
            class,
            os: self.os,
            status,
            tags: self.tags,
            coordinator: self.coordinator,
            last_seen: self.last_seen,
        }
    }
}

/// Map an OS label to a device class.
///
/// ios/android → mobile; linux/ubuntu/debian → server; anything else
/// (macOS, Windows, unknown) → desktop.
pub fn classify_os(os: &str) -> DeviceClass {
    let os = os.to_lowercase();
    if os.contains("ios") || os.contains("android") {
        DeviceClass::Mobile
    } else if os.contains("linux") || os.contains("ubuntu") || os.contains("debian") {
        DeviceClass::Server
    } else {
        DeviceClass::Desktop
    }
}

/// Map {online flag, last-seen age} to a status.
///
/// Offline is disconnected regardless of last-seen. An online device
/// whose age is less than or equal to the staleness threshold is
/// connected; strictly greater is unstable. A missing last-seen on an
/// online device counts as just seen.
pub fn classify_status(
    online: bool,
    last_seen: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    staleness: Duration,
) -> DeviceStatus {
    if !online {
        return DeviceStatus::Disconnected;
    }
    let Some(last_seen) = last_seen else {
        return DeviceStatus::Connected;
    };
    let age = (now - last_seen).to_std().unwrap_or(Duration::ZERO);
    if age > staleness {
        DeviceStatus::Unstable
    } else {
        DeviceStatus::Connected
    }
}

/// Fallback class guess from a device name, for manual entries that
/// state neither an OS nor a device type.
pub fn guess_class_from_name(name: &str) -> DeviceClass {
    let name = name.to_lowercase();
    if name.contains("server") {
        DeviceClass::Server
    } else if name.contains("phone") || name.contains("mobile") {
        DeviceClass::Mobile
    } else if name.contains("laptop") || name.contains("macbook") {
        DeviceClass::Desktop
    } else {
        DeviceClass::Other
    }
}

impl From<DirectoryDevice> for DeviceRecord {
    fn from(d: DirectoryDevice) -> Self {
        let coordinator = d.tags.iter().any(|t| t == COORDINATOR_TAG);
        let address = d
            .addresses
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_owned());
        Self {
            external_id: d.id,
            name: d.name,
            hostname: d.hostname,
            address,
            os: d.os,
            online: d.online,
            last_seen: d.last_seen,
            tags: d.tags,
            coordinator,
            class_hint: None,
        }
    }
}

/// Convert a manual file entry. External ids are synthesized from the
/// position in the document; the first entry is the coordinator.
pub fn record_from_manual(entry: ManualDevice, index: usize) -> DeviceRecord {
    let class_hint = entry
        .device_type
        .as_deref()
        .and_then(|t| t.parse::<DeviceClass>().ok())
        .or_else(|| {
            entry
                .os
                .is_none()
                .then(|| guess_class_from_name(&entry.name))
        });
    DeviceRecord {
        external_id: format!("manual-{}", index + 1),
        name: entry.name,
        hostname: entry.hostname,
        address: entry.ip_address,
        os: entry.os.unwrap_or_else(|| "Unknown".to_owned()),
        online: entry.online.unwrap_or(false),
        last_seen: None,
        tags: entry.tags,
        coordinator: index == 0,
        class_hint,
    }
}
