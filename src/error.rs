//! Error types for the directory-read coordinator.
//!
//! Most failure modes are recovered internally (a `ReplicaRpcFailed` in
//! strict mode triggers failover rather than surfacing) and only the
//! variants below ever reach a client-facing `Result`. A failed self-heal
//! trigger and a single replica's scan error during the divergence probe are
//! not represented here because they are never surfaced to the client;
//! both are logged at the point of occurrence (see
//! `opendir::run_divergence_probe` and `opendir::open_fanout`).

use thiserror::Error;

use crate::ids::{ClientHandle, ReplicaId};

/// Error returned by a single replica RPC (`open-directory` or `readdir`).
///
/// This is the boundary type the `ReplicaClient` collaborator trait uses;
/// the actual transport failure (timeout, connection reset, protocol error)
/// is the host's concern, represented here only by a message and whether it
/// looks like a disconnect.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ReplicaError {
    /// Human-readable cause, as reported by the transport layer.
    pub message: String,
    /// True if this failure means the replica is unreachable (connection
    /// loss, timeout) rather than an RPC-level rejection the replica
    /// actively returned.
    pub disconnected: bool,
}

impl ReplicaError {
    /// Creates a disconnect-style error (connection loss, timeout).
    #[must_use]
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            disconnected: true,
        }
    }

    /// Creates a non-disconnect RPC error (e.g. the replica rejected the call).
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            disconnected: false,
        }
    }
}

/// Errors returned to the client by [`crate::coordinator::DirReadCoordinator`].
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// No replica is currently reachable.
    ///
    /// Surfaced as "not connected"; the coordinator does not retry internally.
    #[error("no replica is currently reachable")]
    NoReplicaUp,

    /// A replica RPC failed and the failure could not be (or should not be)
    /// recovered internally.
    ///
    /// In strict mode this is only returned once failover has been
    /// attempted on every up replica (see [`CoordinatorError::FailoverExhausted`]
    /// for that case specifically); in non-strict mode it is returned
    /// directly on the first failure.
    #[error("replica {replica} rpc failed: {source}")]
    ReplicaRpcFailed {
        /// The replica whose RPC failed.
        replica: ReplicaId,
        /// The underlying replica error.
        #[source]
        source: ReplicaError,
    },

    /// Strict-mode failover walked every up replica without success.
    #[error("failover exhausted all up replicas")]
    FailoverExhausted,

    /// The handle has no associated context (never opened, or already released).
    #[error("no context associated with {handle}")]
    ContextMissing {
        /// The handle that was looked up.
        handle: ClientHandle,
    },

    /// The replica chosen to serve this call has no open directory handle on
    /// it (it was never part of the `opendir` fan-out, or its open failed).
    #[error("replica {replica} has no open directory handle")]
    ReplicaHandleMissing {
        /// The replica that was looked up.
        replica: ReplicaId,
    },
}
