// ── Aggregate health counts ──
//
// NetworkStats is a pure projection of the current device set,
// recomputed synchronously on every device-set mutation. It is never
// cached stale and never independently mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::device::{Device, DeviceStatus};

/// Aggregate device counts. Invariant: `total == online + offline + unstable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub unstable: usize,
    pub last_updated: DateTime<Utc>,
}

impl NetworkStats {
    pub fn empty() -> Self {
        Self {
            total: 0,
            online: 0,
            offline: 0,
            unstable: 0,
            last_updated: Utc::now(),
        }
    }

    /// Recompute from the current device set.
    pub fn compute<'a>(devices: impl Iterator<Item = &'a Arc<Device>>) -> Self {
        let mut stats = Self::empty();
        for device in devices {
            stats.total += 1;
            match device.status {
                DeviceStatus::Connected => stats.online += 1,
                DeviceStatus::Disconnected => stats.offline += 1,
                DeviceStatus::Unstable => stats.unstable += 1,
            }
        }
        stats
    }
}

/// Read-only metrics projection of [`NetworkStats`] — counts keyed by
/// status label, for whatever text format the presentation layer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub connected: usize,
    pub unstable: usize,
    pub disconnected: usize,
}

impl StatusCounts {
    pub fn from_stats(stats: &NetworkStats) -> Self {
        Self {
            connected: stats.online,
            unstable: stats.unstable,
            disconnected: stats.offline,
        }
    }
}
