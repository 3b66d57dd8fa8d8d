//! Capturing a patched tree as a git snapshot.
//!
//! The snapshot is a branch whose tip commit holds the patched tree in place
//! of one tracked subdirectory of the working tree. Capturing it never
//! leaves the repository on the snapshot branch: the original branch is
//! checked out again and the subdirectory is restored, whether the capture
//! succeeds or not.

use std::path::{Path, PathBuf};

use bt_config::RestoreMode;
use bt_exec::CommandRunner;

use crate::error::VcsError;
use crate::git::Git;

/// What to snapshot and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSpec {
    /// Root of the git working tree.
    pub repo: PathBuf,
    /// Subdirectory of `repo` replaced by the patched tree (`/`-separated).
    pub subdir: String,
    /// Snapshot branch name; an existing branch of that name is replaced.
    pub branch: String,
    /// Commit message prefix; the capture time is appended.
    pub label: String,
    /// Working-tree content of `subdir` after the capture.
    pub restore: RestoreMode,
}

/// A captured snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The snapshot branch.
    pub branch: String,
    /// Commit id at the branch tip.
    pub commit: String,
    /// Tree id of the tip commit. Identical patched trees give identical
    /// tree ids across captures.
    pub tree: String,
}

/// Records patched trees as snapshot commits.
pub struct SnapshotManager<'r> {
    runner: &'r dyn CommandRunner,
    spec: SnapshotSpec,
}

impl<'r> SnapshotManager<'r> {
    /// Creates a manager for `spec`.
    pub fn new(runner: &'r dyn CommandRunner, spec: SnapshotSpec) -> Self {
        Self { runner, spec }
    }

    /// Returns the snapshot settings.
    pub fn spec(&self) -> &SnapshotSpec {
        &self.spec
    }

    fn subdir_path(&self) -> PathBuf {
        self.spec
            .subdir
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(self.spec.repo.clone(), |path, c| path.join(c))
    }

    /// Commits `patched` as the content of the tracked subdirectory on the
    /// snapshot branch, then switches back and restores the working tree.
    ///
    /// On failure the original branch is checked out and the pre-image of
    /// the subdirectory is put back before the error is returned.
    pub fn capture(&self, patched: &Path) -> Result<Snapshot, VcsError> {
        if !patched.is_dir() {
            return Err(VcsError::MissingPatchedTree {
                path: patched.to_path_buf(),
            });
        }
        let git = Git::open(self.runner, &self.spec.repo)?;
        let original = git.current_branch()?;
        if original == self.spec.branch {
            return Err(VcsError::BranchCheckedOut {
                branch: self.spec.branch.clone(),
                repo: self.spec.repo.clone(),
            });
        }

        let subdir = self.subdir_path();
        let pre_image = tempfile::tempdir().map_err(|e| bt_common::FsError::io(std::env::temp_dir(), e))?;
        let had_pre_image = subdir.exists();
        if had_pre_image {
            tracing::info!(dir = %subdir.display(), "Backing up {}", self.spec.subdir);
            bt_common::fs::copy_tree(&subdir, pre_image.path())?;
        }

        let snapshot = match self.commit_snapshot(&git, patched, &subdir, &original) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("snapshot failed, restoring {}", original);
                let rollback = git
                    .checkout_force(&original)
                    .and_then(|()| replace_dir(&subdir, had_pre_image.then(|| pre_image.path())));
                return Err(match rollback {
                    Ok(()) => err,
                    Err(rollback) => VcsError::RollbackFailed {
                        source: Box::new(err),
                        rollback: Box::new(rollback),
                    },
                });
            }
        };

        match self.spec.restore {
            RestoreMode::PreImage => replace_dir(&subdir, had_pre_image.then(|| pre_image.path()))?,
            RestoreMode::Snapshot => replace_dir(&subdir, Some(patched))?,
        }

        tracing::info!(
            branch = %snapshot.branch,
            commit = %snapshot.commit,
            tree = %snapshot.tree,
            "snapshot captured"
        );
        Ok(snapshot)
    }

    fn commit_snapshot(
        &self,
        git: &Git<'_>,
        patched: &Path,
        subdir: &Path,
        original: &str,
    ) -> Result<Snapshot, VcsError> {
        let branch = &self.spec.branch;
        if git.branch_exists(branch)? {
            git.delete_branch_force(branch)?;
        }
        git.checkout_new_force(branch)?;

        replace_dir(subdir, Some(patched))?;
        git.add_all(&self.spec.subdir)?;
        let stamp = chrono::Local::now().format("%a %b %d %H:%M:%S %z %Y");
        git.commit(&format!("{} $ {stamp}", self.spec.label))?;

        let snapshot = Snapshot {
            branch: branch.clone(),
            commit: git.head()?,
            tree: git.tree_of("HEAD")?,
        };
        git.checkout_force(original)?;
        Ok(snapshot)
    }
}

/// Replaces `dir` with a copy of `content`, or removes it when there is no
/// content.
fn replace_dir(dir: &Path, content: Option<&Path>) -> Result<(), VcsError> {
    bt_common::fs::remove_if_exists(dir)?;
    if let Some(content) = content {
        let copied = bt_common::fs::copy_tree(content, dir)?;
        tracing::debug!(dir = %dir.display(), files = copied, "replaced directory");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_dir_swaps_content() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("net");
        let content = root.path().join("patched");
        bt_common::fs::write_atomic(&dir.join("old/Stale.java"), b"old").unwrap();
        bt_common::fs::write_atomic(&content.join("new/Fresh.java"), b"new").unwrap();

        replace_dir(&dir, Some(&content)).unwrap();

        assert_eq!(
            bt_common::fs::list_files(&dir).unwrap(),
            vec![PathBuf::from("new/Fresh.java")]
        );
    }

    #[test]
    fn replace_dir_without_content_removes() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("net");
        bt_common::fs::write_atomic(&dir.join("A.java"), b"a").unwrap();
        replace_dir(&dir, None).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn subdir_path_joins_components() {
        struct Never;
        impl CommandRunner for Never {
            fn execute(
                &self,
                command: &bt_exec::ExternalCommand,
            ) -> Result<bt_exec::CommandOutput, bt_exec::ExecError> {
                panic!("unexpected command {command}")
            }
        }
        let manager = SnapshotManager::new(
            &Never,
            SnapshotSpec {
                repo: PathBuf::from("CraftBukkit"),
                subdir: "src/main/java/net/".to_string(),
                branch: "patched".to_string(),
                label: "CraftBukkit".to_string(),
                restore: RestoreMode::PreImage,
            },
        );
        assert_eq!(
            manager.subdir_path(),
            Path::new("CraftBukkit").join("src").join("main").join("java").join("net")
        );
    }

    #[test]
    fn missing_patched_tree_is_rejected_before_git() {
        struct Never;
        impl CommandRunner for Never {
            fn execute(
                &self,
                command: &bt_exec::ExternalCommand,
            ) -> Result<bt_exec::CommandOutput, bt_exec::ExecError> {
                panic!("unexpected command {command}")
            }
        }
        let root = tempfile::tempdir().unwrap();
        let manager = SnapshotManager::new(
            &Never,
            SnapshotSpec {
                repo: root.path().to_path_buf(),
                subdir: "net".to_string(),
                branch: "patched".to_string(),
                label: "CraftBukkit".to_string(),
                restore: RestoreMode::PreImage,
            },
        );
        let err = manager.capture(&root.path().join("absent")).unwrap_err();
        assert!(matches!(err, VcsError::MissingPatchedTree { .. }));
    }
}
