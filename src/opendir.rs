//! Opendir fan-out & divergence probe (C4).
//!
//! Phase A opens every up replica concurrently. Phase B, run only on the
//! first open of a given inode while more than one replica is up, scans
//! every opened replica fully and compares weak checksums; a mismatch
//! triggers a self-heal. Fan-out is expressed as `join_all` over per-replica
//! async tasks, each with its own owned state, rather than a manually
//! decremented pending counter shared under a lock.

use std::collections::HashMap;

use futures_util::future::join_all;
use tracing::warn;

use crate::checksum::ChecksumAccumulator;
use crate::error::ReplicaError;
use crate::heal::{HealDescriptor, SelfHealTrigger};
use crate::ids::{InodeId, ReplicaHandleToken, ReplicaId};
use crate::replica::{ReplicaClient, ReplicaView};
use crate::types::DirLocation;

/// Reason reported to the self-heal trigger on a checksum mismatch.
pub const DIVERGENCE_REASON: &str = "checksums of directory differ";

/// Result of Phase A: which replicas opened successfully, and (if any
/// failed) the most recent error, used to report opendir failure when
/// *every* replica failed.
#[derive(Debug, Default)]
pub struct OpenFanoutResult {
    /// Per-replica handle tokens for replicas that opened successfully.
    pub opens: HashMap<ReplicaId, ReplicaHandleToken>,
    /// The error from the last replica to report failure, if any did.
    pub last_error: Option<(ReplicaId, ReplicaError)>,
}

impl OpenFanoutResult {
    /// True iff at least one replica opened: the open is reported to the
    /// client as successful as long as one replica succeeded.
    #[must_use]
    pub fn any_opened(&self) -> bool {
        !self.opens.is_empty()
    }
}

/// Issues `open-directory` concurrently to every up replica and collects
/// per-replica success/error.
pub async fn open_fanout(
    client: &dyn ReplicaClient,
    view: &ReplicaView,
    loc: &DirLocation,
) -> OpenFanoutResult {
    let up_replicas = up_replica_list(view);

    let attempts = up_replicas
        .iter()
        .map(|&replica| async move { (replica, client.open_directory(replica, loc).await) });
    let results = join_all(attempts).await;

    let mut fanout = OpenFanoutResult::default();
    for (replica, result) in results {
        match result {
            Ok(token) => {
                fanout.opens.insert(replica, token);
            }
            Err(error) => {
                warn!(%replica, %error, "open-directory failed on replica");
                fanout.last_error = Some((replica, error));
            }
        }
    }
    fanout
}

/// Outcome of the Phase B divergence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// True if the contributing replicas' directory contents diverge.
    pub diverged: bool,
}

/// Returns whether Phase B should run at all: the inode's latch must not
/// already be set, and more than one replica must be up.
#[must_use]
pub fn should_run_probe(opendir_done: bool, view: &ReplicaView) -> bool {
    !opendir_done && view.up_count() > 1
}

/// Runs the Phase B divergence probe over every replica that opened
/// successfully, fanned out concurrently; each replica's scan is sequential
/// within itself since each chunk's offset depends on the previous chunk's
/// last entry.
pub async fn run_divergence_probe(
    client: &dyn ReplicaClient,
    view: &ReplicaView,
    opens: &HashMap<ReplicaId, ReplicaHandleToken>,
    chunk_size: u32,
) -> ProbeOutcome {
    let up_replicas = up_replica_list(view);

    let scans = opens
        .iter()
        .map(|(&replica, &token)| async move { (replica, scan_replica(client, replica, token, chunk_size).await) });
    let results = join_all(scans).await;

    let mut accumulator = ChecksumAccumulator::new(view.replica_count());
    // Replicas that never got a handle (open failed) never ran a scan at
    // all; they must be excluded from the predicate exactly like a down
    // replica, or their all-zero slot would spuriously read as divergent.
    let mut excluded: Vec<ReplicaId> = up_replicas
        .iter()
        .copied()
        .filter(|r| !opens.contains_key(r))
        .collect();

    for (replica, result) in results {
        match result {
            Ok(checksum) => accumulator.xor_checksum(replica, checksum),
            Err(error) => {
                warn!(%replica, %error, "directory scan failed during divergence probe");
                excluded.push(replica);
            }
        }
    }

    ProbeOutcome {
        diverged: accumulator.checksums_differ(view, &excluded),
    }
}

/// Scans one replica's directory to completion, returning the XOR of its
/// entries' weak checksums. Sequential: each `readdir` call depends on the
/// previous call's last opaque offset.
async fn scan_replica(
    client: &dyn ReplicaClient,
    replica: ReplicaId,
    token: ReplicaHandleToken,
    chunk_size: u32,
) -> Result<u32, ReplicaError> {
    let mut offset: i64 = 0;
    let mut checksum: u32 = 0;

    loop {
        let entries = client
            .readdir(replica, token, chunk_size, offset, false)
            .await?;
        if entries.is_empty() {
            return Ok(checksum);
        }
        for entry in &entries {
            checksum ^= crate::checksum::weak_checksum(entry.name.as_bytes());
        }
        offset = entries
            .iter()
            .map(|e| e.opaque_offset)
            .max()
            .unwrap_or(offset);
    }
}

/// Fires the self-heal trigger for a diverged directory. Errors are logged
/// and never surfaced to the client: the opendir still unwinds with success
/// once the heal has been requested.
pub async fn trigger_heal_for_divergence(
    heal: &dyn SelfHealTrigger,
    inode: InodeId,
) {
    if let Err(error) = heal
        .trigger_self_heal(inode, HealDescriptor::entry_forced_merge(), DIVERGENCE_REASON)
        .await
    {
        warn!(%inode, %error, "self-heal trigger failed; opendir continues regardless");
    }
}

fn up_replica_list(view: &ReplicaView) -> Vec<ReplicaId> {
    (0..view.replica_count())
        .map(ReplicaId::from)
        .filter(|&r| view.is_up(r))
        .collect()
}
