//! Topology state and reconciliation for the tailmap workspace.
//!
//! This crate owns the live model of a private device network and the
//! machinery that keeps it current and observable:
//!
//! - **[`TopologyStore`]** — authoritative in-memory device/connection/
//!   stats state. Writers are strictly serialized; readers always see a
//!   consistent snapshot; stats are recomputed and change events
//!   published before any mutating call returns.
//!
//! - **[`Reconciler`]** — pulls from an ordered [`Source`] chain
//!   (directory API → manual file, with the built-in seed as boot
//!   fallback), normalizes records, and installs them as a full
//!   replace. Explicit and periodic refreshes share one in-flight
//!   attempt.
//!
//! - **[`TopologyEvent`] / [`EventStream`]** — best-effort fan-out of
//!   change events over a bounded broadcast ring. New subscribers get a
//!   full snapshot first; slow subscribers lose their oldest pending
//!   events rather than ever blocking the publisher.
//!
//! - **[`LayoutEngine`]** — deterministic spring-embedder heuristic
//!   assigning 2-D presentation positions, clamped to the canvas.

pub mod config;
pub mod error;
pub mod events;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AbsentDevicePolicy, Canvas, CoreConfig, LayoutConfig, TopologyPolicy};
pub use error::{CoreError, EntityKind};
pub use events::{EventStream, TopologyEvent};
pub use layout::LayoutEngine;
pub use reconcile::Reconciler;
pub use source::{DirectorySource, FileSource, SeedSource, Source};
pub use store::TopologyStore;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Connection, ConnectionDraft, ConnectionId, ConnectionPatch, ConnectionStatus, Device,
    DeviceClass, DeviceDraft, DeviceId, DevicePatch, DeviceStatus, NetworkStats, Position,
    StatusCounts, TopologySnapshot,
};
