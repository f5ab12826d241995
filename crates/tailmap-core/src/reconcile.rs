// ── Multi-source reconciliation ──
//
// Pulls one normalized device set out of the environment and installs
// it. Sources are tried in strict priority order; the first to succeed
// wins. Individual source failures never escape this module — they are
// logged and the next source is tried.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::layout::LayoutEngine;
use crate::normalize::DeviceRecord;
use crate::source::{SeedSource, Source};
use crate::store::TopologyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshPhase {
    Pending,
    Succeeded,
    Exhausted { attempted: usize },
}

/// Drives the store from the ordered source chain.
///
/// `sources` holds the configured external sources in priority order
/// (directory first, then the manual file). The built-in seed set is
/// not part of the chain: it is the boot-time fallback only, so an
/// explicit refresh can genuinely exhaust.
pub struct Reconciler {
    store: Arc<TopologyStore>,
    sources: Vec<Box<dyn Source>>,
    seed: Box<dyn Source>,
    config: CoreConfig,
    layout: LayoutEngine,
    /// Join-in-flight gate: a refresh arriving while one is running
    /// awaits the in-flight attempt's outcome instead of starting a
    /// duplicate.
    gate: Mutex<Option<watch::Receiver<RefreshPhase>>>,
}

impl Reconciler {
    pub fn new(store: Arc<TopologyStore>, sources: Vec<Box<dyn Source>>, config: CoreConfig) -> Self {
        let layout = LayoutEngine::new(config.canvas, config.layout);
        Self {
            store,
            sources,
            seed: Box::new(SeedSource),
            config,
            layout,
            gate: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<TopologyStore> {
        &self.store
    }

    /// Initial sync. Tries the chain; if everything fails (or nothing
    /// is configured), falls through to the seed set. Never an error.
    pub async fn sync_at_boot(&self) {
        match self.attempt_chain().await {
            Ok(source) => info!(source, "boot sync complete"),
            Err(attempted) => {
                warn!(attempted, "no source available at boot, loading seed data");
                if let Err(e) = self.install_from(self.seed.as_ref()).await {
                    warn!(error = %e, "seed install failed");
                }
            }
        }
    }

    /// Explicit, user-requested refresh.
    ///
    /// Exhausting every configured source is a reportable error; the
    /// store keeps its last-known-good state on that path. Concurrent
    /// callers (including the periodic timer) join the in-flight
    /// attempt.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let tx = {
            let mut gate = self.gate.lock().await;
            if let Some(rx) = gate.as_ref() {
                if *rx.borrow() == RefreshPhase::Pending {
                    let rx = rx.clone();
                    drop(gate);
                    return join_in_flight(rx).await;
                }
            }
            let (tx, rx) = watch::channel(RefreshPhase::Pending);
            *gate = Some(rx);
            tx
        };

        let outcome = self.attempt_chain().await;
        let (phase, result) = match outcome {
            Ok(source) => {
                info!(source, "refresh complete");
                (RefreshPhase::Succeeded, Ok(()))
            }
            Err(attempted) => (
                RefreshPhase::Exhausted { attempted },
                Err(CoreError::AllSourcesExhausted { attempted }),
            ),
        };
        let _ = tx.send(phase);
        result
    }

    /// Spawn the periodic reconciliation task, if an interval is
    /// configured. Runs until the token is cancelled.
    pub fn spawn_periodic(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let interval = self.config.refresh_interval()?;
        let reconciler = Arc::clone(self);
        Some(tokio::spawn(refresh_task(reconciler, interval, cancel)))
    }

    // ── Private helpers ──────────────────────────────────────────

    /// Try every configured source in order. Returns the winning
    /// source's name, or the number of sources attempted if all failed.
    async fn attempt_chain(&self) -> Result<&'static str, usize> {
        for source in &self.sources {
            match self.install_from(source.as_ref()).await {
                Ok(()) => return Ok(source.name()),
                Err(e) => {
                    warn!(source = source.name(), error = %e, "source failed, trying next");
                }
            }
        }
        Err(self.sources.len())
    }

    /// Fetch from one source (bounded by the configured deadline) and
    /// install the result as a full replace.
    async fn install_from(&self, source: &dyn Source) -> Result<(), CoreError> {
        let records = match tokio::time::timeout(self.config.source_timeout(), source.fetch()).await
        {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                return Err(CoreError::SourceUnavailable {
                    name: source.name(),
                    reason: e.to_string(),
                });
            }
            // The fetch future is dropped here: an over-deadline fetch
            // is cancelled, not left pending.
            Err(_) => {
                return Err(CoreError::SourceUnavailable {
                    name: source.name(),
                    reason: format!(
                        "fetch exceeded {}s deadline",
                        self.config.source_timeout_secs
                    ),
                });
            }
        };

        self.install(records)
    }

    fn install(&self, records: Vec<DeviceRecord>) -> Result<(), CoreError> {
        let now = Utc::now();
        let staleness = self.config.staleness_threshold();
        let drafts = records
            .into_iter()
            .map(|r| r.into_draft(now, staleness))
            .collect();
        self.store.replace_all(
            drafts,
            self.config.topology,
            self.config.absent_devices,
            &self.layout,
        )
    }
}

async fn join_in_flight(mut rx: watch::Receiver<RefreshPhase>) -> Result<(), CoreError> {
    debug!("refresh already in flight, joining");
    loop {
        let phase = *rx.borrow_and_update();
        match phase {
            RefreshPhase::Pending => {
                if rx.changed().await.is_err() {
                    // Reconciler dropped mid-attempt; report as exhausted.
                    return Err(CoreError::AllSourcesExhausted { attempted: 0 });
                }
            }
            RefreshPhase::Succeeded => return Ok(()),
            RefreshPhase::Exhausted { attempted } => {
                return Err(CoreError::AllSourcesExhausted { attempted });
            }
        }
    }
}

async fn refresh_task(reconciler: Arc<Reconciler>, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = reconciler.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
