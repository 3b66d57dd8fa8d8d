//! Error types for repository operations and snapshots.

use std::path::PathBuf;

use bt_common::FsError;
use bt_exec::ExecError;

/// Errors raised by git operations and the snapshot manager.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// A git command failed.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Copying or removing working-tree content failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The directory is not a git working tree.
    #[error("{path} is not a git working tree")]
    NotARepository {
        /// The directory that was opened.
        path: PathBuf,
    },

    /// HEAD does not point at a branch, so there is nothing to switch back
    /// to after committing the snapshot.
    #[error("{repo} has a detached HEAD; check out a branch first")]
    DetachedHead {
        /// The repository.
        repo: PathBuf,
    },

    /// The snapshot branch is the branch currently checked out.
    #[error("snapshot branch {branch} is checked out in {repo}; switch to another branch first")]
    BranchCheckedOut {
        /// The snapshot branch.
        branch: String,
        /// The repository.
        repo: PathBuf,
    },

    /// The tree to snapshot does not exist.
    #[error("patched tree {path} does not exist")]
    MissingPatchedTree {
        /// The expected directory.
        path: PathBuf,
    },

    /// A snapshot failed and putting the working tree back failed as well.
    #[error("{source}; restoring the working tree afterwards also failed: {rollback}")]
    RollbackFailed {
        /// The error that aborted the snapshot.
        source: Box<VcsError>,
        /// The error raised while restoring.
        rollback: Box<VcsError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_failure_mentions_both_errors() {
        let err = VcsError::RollbackFailed {
            source: Box::new(VcsError::MissingPatchedTree {
                path: PathBuf::from("work/patched/net"),
            }),
            rollback: Box::new(VcsError::DetachedHead {
                repo: PathBuf::from("CraftBukkit"),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("work/patched/net"));
        assert!(msg.contains("detached HEAD"));
    }

    #[test]
    fn branch_checked_out_display() {
        let err = VcsError::BranchCheckedOut {
            branch: "patched".to_string(),
            repo: PathBuf::from("CraftBukkit"),
        };
        assert!(err.to_string().contains("snapshot branch patched"));
    }
}
