//! Readdir serve-with-failover (C5), parameterized over `readdir`/`readdirp`
//! by [`ReadOp`], plus the root-directory hidden-entry filter (C6).
//!
//! One client call maps to at most one replica RPC on the happy path, and to
//! at most one extra re-issue when strict-mode failover or the
//! all-duplicates-on-a-page case requires it: a single re-issue per call is
//! sufficient to make progress without risking a pathological retry spin.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::CoordinatorError;
use crate::handle::HandleContext;
use crate::ids::{ReplicaHandleToken, ReplicaId};
use crate::replica::{ReplicaClient, ReplicaView};
use crate::types::{DirEntry, ReadOp};

/// Everything [`serve_readdir`] needs to address one replica's RPC: its id
/// and the opaque token returned by that replica's `open_directory`.
#[derive(Debug, Clone, Copy)]
pub struct ReplicaHandle {
    /// Which replica this handle belongs to.
    pub replica: ReplicaId,
    /// The opaque token to pass back on this replica's RPCs.
    pub token: ReplicaHandleToken,
}

/// Result of a successful readdir/readdirp call: entries to return to the
/// client, and the replica that ultimately served them (for the caller to
/// record as the handle's `call_child` cookie).
#[derive(Debug, Clone)]
pub struct ReaddirResult {
    /// Entries to hand back to the client.
    pub entries: Vec<DirEntry>,
    /// The replica that produced these entries.
    pub served_by: ReplicaId,
}

/// Upper bound on all-duplicate-page re-issues within a single client call:
/// a single re-issue is sufficient in practice without risking a
/// pathological retry spin.
const MAX_DUPLICATE_REISSUES: u32 = 1;

/// Serves one `readdir`/`readdirp` client call against `handle`, failing
/// over to another replica on RPC error when `config.strict_readdir` is set.
///
/// `open_handles` must contain one entry per replica that currently has this
/// directory open (from the `opendir` fan-out); `is_root` tells the caller
/// whether the C6 trash-entry filter applies.
#[allow(clippy::too_many_arguments)]
pub async fn serve_readdir(
    client: &dyn ReplicaClient,
    view: &ReplicaView,
    config: &Config,
    context: &mut HandleContext,
    open_handles: &[ReplicaHandle],
    preferred_order: &[ReplicaId],
    op: ReadOp,
    chunk_size: u32,
    offset: i64,
    is_root: bool,
) -> Result<ReaddirResult, CoordinatorError> {
    let call_child = view.choose_read_replica(preferred_order)?;

    let mut effective_offset = offset;
    if config.strict_readdir {
        if let Some(previous) = context.last_tried() {
            if previous != call_child {
                context.mark_failed_over();
                effective_offset = 0;
            }
        }
        context.set_last_tried(call_child);
    }

    let mut current = call_child;
    let mut current_offset = effective_offset;
    let mut reissues = 0u32;

    loop {
        let handle = find_open_handle(open_handles, current)
            .ok_or(CoordinatorError::ReplicaHandleMissing { replica: current })?;

        let rpc_result = client
            .readdir(
                current,
                handle.token,
                chunk_size,
                current_offset,
                matches!(op, ReadOp::ReadDirP),
            )
            .await;

        let entries = match rpc_result {
            Ok(entries) => entries,
            Err(error) => {
                if !config.strict_readdir {
                    return Err(CoordinatorError::ReplicaRpcFailed {
                        replica: current,
                        source: error,
                    });
                }
                warn!(replica = %current, %error, "readdir failed, attempting failover");
                context.mark_failed_over();
                current = view.next_replica(current, preferred_order)?;
                current_offset = 0;
                continue;
            }
        };

        let entries = apply_root_filter(entries, config, is_root);

        if context.failed_over() {
            let (filtered, resume_offset) = context.filter(entries.clone());
            context.remember(entries.iter().map(|e| e.name.as_str()));

            if filtered.is_empty() && !entries.is_empty() && reissues < MAX_DUPLICATE_REISSUES {
                debug!(
                    replica = %current,
                    resume_offset,
                    "all entries on page were duplicates, re-issuing"
                );
                reissues += 1;
                current_offset = resume_offset;
                continue;
            }

            return Ok(ReaddirResult {
                entries: filtered,
                served_by: current,
            });
        }

        context.remember(entries.iter().map(|e| e.name.as_str()));
        return Ok(ReaddirResult {
            entries,
            served_by: current,
        });
    }
}

/// C6: at the filesystem root, drop any entry named after the replication
/// trash directory. Applied before the dedup/remember step, so a trash entry
/// never gets remembered or counted toward "all duplicates" (matches the
/// ordering of the filter-then-dedup pipeline in the original source).
fn apply_root_filter(entries: Vec<DirEntry>, config: &Config, is_root: bool) -> Vec<DirEntry> {
    if !is_root {
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| e.name != config.trash_dir_name)
        .collect()
}

fn find_open_handle(open_handles: &[ReplicaHandle], replica: ReplicaId) -> Option<ReplicaHandle> {
    open_handles.iter().copied().find(|h| h.replica == replica)
}
