//! Coordinator tunables.
//!
//! These values have no file-backed configuration layer: there is no
//! persisted state anywhere in this crate, so there is nothing for a
//! `config`/`toml`/`dotenvy` stack to load here (noted in DESIGN.md) — a
//! plain struct constructed by the host is sufficient.

use crate::ids::InodeId;

/// Chunk size used for the first-open divergence probe: fixed at 131072
/// entries/bytes.
pub const PROBE_CHUNK_SIZE: u32 = 131_072;

/// Well-known name of the replication trash directory, hidden from listings
/// of the filesystem root.
pub const DEFAULT_TRASH_DIR_NAME: &str = ".landfill";

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enables readdir failover and cross-replica deduplication.
    ///
    /// When `false`, a replica RPC failure is surfaced directly to the
    /// client instead of triggering failover.
    pub strict_readdir: bool,

    /// Chunk size for the first-open divergence probe.
    pub probe_chunk_size: u32,

    /// Name of the replication trash directory, hidden at the filesystem root.
    pub trash_dir_name: String,

    /// Inode identity of the filesystem root, used by the C6 root filter.
    pub root_inode: InodeId,
}

impl Config {
    /// Creates a config with `strict_readdir` enabled and default tunables.
    #[must_use]
    pub fn new(root_inode: InodeId) -> Self {
        Self {
            strict_readdir: true,
            probe_chunk_size: PROBE_CHUNK_SIZE,
            trash_dir_name: DEFAULT_TRASH_DIR_NAME.to_string(),
            root_inode,
        }
    }

    /// Returns true if `inode` is the filesystem root.
    #[must_use]
    pub fn is_root(&self, inode: InodeId) -> bool {
        inode == self.root_inode
    }
}
