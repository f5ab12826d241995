//! Canonical domain types for the topology layer.

pub mod connection;
pub mod device;
pub mod stats;

pub use connection::{Connection, ConnectionDraft, ConnectionId, ConnectionPatch, ConnectionStatus};
pub use device::{Device, DeviceClass, DeviceDraft, DeviceId, DevicePatch, DeviceStatus, Position};
pub use stats::{NetworkStats, StatusCounts};

use serde::Serialize;
use std::sync::Arc;

/// Atomic read of the whole topology: devices, connections, and stats
/// observed together under one lock acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub devices: Vec<Arc<Device>>,
    pub connections: Vec<Arc<Connection>>,
    pub stats: NetworkStats,
}
