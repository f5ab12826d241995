// ── Core configuration types ──
//
// Plain serde structs with defaults. File/env merging happens in the
// composition root (the CLI), not here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How connection edges are generated after a full replace.
///
/// An explicit configuration choice — never hardwired to a particular
/// source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyPolicy {
    /// One coordinator device linked to every other device.
    #[default]
    Hub,
    /// Every pair of currently-connected devices linked.
    Mesh,
    /// The first record becomes the coordinator, then hub edges.
    ImportedStar,
}

/// What happens to a device present in the store but absent from the
/// latest external snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsentDevicePolicy {
    /// Drop it, full-replace style.
    #[default]
    Remove,
    /// Keep it, forced to disconnected.
    RetainDisconnected,
}

/// Canvas geometry for the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            margin: 50.0,
        }
    }
}

impl Canvas {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Spring-embedder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub iterations: u32,
    pub damping: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            damping: 0.9,
        }
    }
}

/// Settings consumed by the store, reconciler, and layout engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Maximum last-seen age (seconds) under which an online device is
    /// still classified connected. Strictly greater than this means
    /// unstable.
    pub staleness_threshold_secs: u64,
    /// Periodic reconciliation interval (seconds); 0 disables the timer.
    pub refresh_interval_secs: u64,
    /// Per-source fetch deadline (seconds).
    pub source_timeout_secs: u64,
    pub topology: TopologyPolicy,
    pub absent_devices: AbsentDevicePolicy,
    pub canvas: Canvas,
    pub layout: LayoutConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: 300,
            refresh_interval_secs: 60,
            source_timeout_secs: 10,
            topology: TopologyPolicy::default(),
            absent_devices: AbsentDevicePolicy::default(),
            canvas: Canvas::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_threshold_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}
