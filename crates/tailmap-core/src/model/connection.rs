// ── Connection domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::device::DeviceId;

/// Store-generated connection id. Same stability caveats as
/// [`DeviceId`](super::device::DeviceId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

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
pub enum ConnectionStatus {
    Active,
    Inactive,
}

/// A pairwise link between two devices. Both endpoints must reference
/// devices currently in the store; deleting a device cascades to every
/// connection touching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: DeviceId,
    pub to: DeviceId,
    pub status: ConnectionStatus,
    pub last_updated: DateTime<Utc>,
}

impl Connection {
    /// Whether either endpoint is the given device.
    pub fn touches(&self, device: DeviceId) -> bool {
        self.from == device || self.to == device
    }
}

/// Input for connection creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDraft {
    pub from: DeviceId,
    pub to: DeviceId,
    pub status: ConnectionStatus,
}

/// Partial connection update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,
}
