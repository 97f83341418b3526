//! Wire-adjacent value types shared by the replica client boundary and the
//! client-facing readdir API.

use crate::ids::ReplicaId;

/// Location of a directory to open, as handed down from the client.
///
/// Kept deliberately opaque (a path string) since location resolution,
/// loc_t-equivalent gfid handling, etc. belong to the host translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirLocation {
    /// Host-meaningful path of the directory being opened.
    pub path: String,
}

impl DirLocation {
    /// Creates a new directory location from a path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Opaque per-entry attributes, filled in by a replica when `readdirp` is
/// used. The coordinator never inspects these bytes; `iatt <-> stat`
/// conversion is an external collaborator's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryAttrs(pub Vec<u8>);

/// A single directory entry as returned by a replica's `readdir`/`readdirp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (the dedup key; opaque offsets are not comparable across replicas).
    pub name: String,
    /// Replica-private position token; only meaningful to the replica that issued it.
    pub opaque_offset: i64,
    /// Per-entry attributes, present only for `readdirp`.
    pub attrs: Option<EntryAttrs>,
}

impl DirEntry {
    /// Creates a plain `readdir`-style entry (no attributes).
    #[must_use]
    pub fn new(name: impl Into<String>, opaque_offset: i64) -> Self {
        Self {
            name: name.into(),
            opaque_offset,
            attrs: None,
        }
    }

    /// Creates a `readdirp`-style entry carrying opaque attributes.
    #[must_use]
    pub fn with_attrs(name: impl Into<String>, opaque_offset: i64, attrs: EntryAttrs) -> Self {
        Self {
            name: name.into(),
            opaque_offset,
            attrs: Some(attrs),
        }
    }
}

/// Which directory-read opcode a request is serving; the two client-facing
/// operations share one algorithm parameterized on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOp {
    /// Plain `readdir`: names and opaque offsets only.
    ReadDir,
    /// `readdirp`: names, opaque offsets, and per-entry attributes.
    ReadDirP,
}

/// A replica-side directory handle obtained from a successful `open_directory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaOpen {
    /// Which replica this handle belongs to.
    pub replica: ReplicaId,
    /// The opaque token to pass back on subsequent RPCs to this replica.
    pub token: crate::ids::ReplicaHandleToken,
}
