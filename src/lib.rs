//! Replicated directory-read coordinator for a clustered filesystem
//! translator that mirrors every directory across N backing replicas.
//!
//! Fans out `opendir` to every reachable replica, probes for content
//! divergence on first open, and serves `readdir`/`readdirp` from a single
//! chosen replica with transparent failover and duplicate suppression
//! across the failover boundary. The wire transport, the self-heal worker,
//! the inode table, and the read-replica election policy are external
//! collaborators the host supplies through the traits in [`replica`],
//! [`heal`], and [`inode_latch`].

pub mod checksum;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod heal;
pub mod ids;
pub mod inode_latch;
pub mod opendir;
pub mod readdir;
pub mod replica;
pub mod types;

pub use config::Config;
pub use coordinator::DirReadCoordinator;
pub use error::{CoordinatorError, ReplicaError};
pub use ids::{ClientHandle, InodeId, ReplicaHandleToken, ReplicaId};
pub use types::{DirEntry, DirLocation, EntryAttrs, ReadOp};
