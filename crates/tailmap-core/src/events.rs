// ── Change-event fan-out ──
//
// Best-effort, at-most-once-per-publish delivery over a bounded
// `tokio::sync::broadcast` ring. No persistence, no replay: a
// subscriber that is absent (or too slow) permanently misses events.
// The ring semantics guarantee the publisher never blocks — a lagged
// subscriber loses its oldest pending events instead.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::model::{Device, NetworkStats, TopologySnapshot};

pub(crate) const EVENT_CHANNEL_SIZE: usize = 256;

/// One state-change notification.
///
/// Per-subscriber delivery follows publish order; nothing is guaranteed
/// across different subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TopologyEvent {
    DeviceAdded(Arc<Device>),
    DeviceRemoved(Arc<Device>),
    DeviceStatusChanged {
        device: Arc<Device>,
        previous: crate::model::DeviceStatus,
    },
    StatsUpdated(NetworkStats),
    FullTopologyReplaced(Arc<TopologySnapshot>),
}

/// Subscription handle vended by [`TopologyStore::subscribe`](crate::store::TopologyStore::subscribe).
///
/// The first event yielded is always a `FullTopologyReplaced` snapshot
/// taken at subscription time, so a new subscriber cannot observe a
/// partial update it has no base state for. Dropping the stream
/// unsubscribes.
pub struct EventStream {
    initial: Option<TopologyEvent>,
    rx: broadcast::Receiver<TopologyEvent>,
}

impl EventStream {
    pub(crate) fn new(initial: TopologyEvent, rx: broadcast::Receiver<TopologyEvent>) -> Self {
        Self {
            initial: Some(initial),
            rx,
        }
    }

    /// Receive the next event, or `None` once the store is gone.
    ///
    /// A lag (this subscriber fell more than the channel capacity
    /// behind) is logged and skipped — delivery resumes at the oldest
    /// event still in the ring.
    pub async fn recv(&mut self) -> Option<TopologyEvent> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "subscriber lagged, dropping oldest events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant: the next event if one is already pending.
    pub fn try_recv(&mut self) -> Option<TopologyEvent> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "subscriber lagged, dropping oldest events");
                }
                Err(_) => return None,
            }
        }
    }
}
