//! Git repositories and snapshots of patched trees.
//!
//! [`Git`] covers the repository chores of a build (clone, pull, history
//! queries feeding the cache fingerprint, commit identity).
//! [`SnapshotManager`] records a patched tree as a branch commit while
//! leaving the working tree on its original branch.

#![warn(missing_docs)]

pub mod error;
pub mod git;
pub mod snapshot;

pub use error::VcsError;
pub use git::{Git, DEFAULT_EMAIL, DEFAULT_NAME};
pub use snapshot::{Snapshot, SnapshotManager, SnapshotSpec};
