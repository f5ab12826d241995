// ── Core error taxonomy ──

use thiserror::Error;

/// What kind of entity an id-based operation failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Device,
    Connection,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Connection => write!(f, "connection"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed create/update input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation on an id that is not in the store.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    /// Duplicate external id on device creation or rename.
    #[error("conflict: {0}")]
    Conflict(String),

    /// One source failed or timed out. Recoverable: the reconciler
    /// falls through to the next source in the chain.
    #[error("source {name} unavailable: {reason}")]
    SourceUnavailable { name: &'static str, reason: String },

    /// Every source failed during an explicit refresh. Fatal to that
    /// call only; the store keeps its last-known-good state.
    #[error("all {attempted} sources exhausted during refresh")]
    AllSourcesExhausted { attempted: usize },
}
