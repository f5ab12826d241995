// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-generated device id. Opaque, and NOT stable across a full
/// resync — identity continuity across reconciliations is only
/// guaranteed through the external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse device class, normalized from the source OS label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Server,
    Other,
}

/// Connectivity status derived from the online flag and last-seen age.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    Connected,
    Unstable,
    Disconnected,
}

impl DeviceStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// 2-D presentation coordinates. Owned exclusively by the layout
/// engine; every other component treats this as opaque state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A device in the topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Source-provided id, unique among live devices.
    pub external_id: String,
    pub name: String,
    pub hostname: String,
    pub address: String,
    pub class: DeviceClass,
    pub os: String,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
    pub tags: Vec<String>,
    pub coordinator: bool,
    pub position: Position,
}

/// Input for device creation. The store assigns the id, a placeholder
/// position, and `last_seen` (now, unless the draft carries one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDraft {
    pub external_id: String,
    pub name: String,
    pub hostname: String,
    pub address: String,
    pub class: DeviceClass,
    pub os: String,
    pub status: DeviceStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub coordinator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Partial device update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<bool>,
}

impl DevicePatch {
    /// A patch that only changes the status.
    pub fn status(status: DeviceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
