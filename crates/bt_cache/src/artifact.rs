//! Artifact kinds, canonical names and staging areas.
//!
//! Every artifact has a canonical name embedding the fingerprint key
//! (`mapped.<key>.jar`, `decompile-<key>`). Derivation writes to a
//! `.partial` sibling of that name plus a private scratch directory; only a
//! successful step is promoted by rename.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Suffix of in-progress artifacts.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Suffix of per-derivation scratch directories.
pub const SCRATCH_SUFFIX: &str = ".scratch";

/// The kinds of artifact the pipeline derives and caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// The vanilla server jar after all remapping passes (a single file).
    MappedJar,
    /// The decompiled and formatted source tree (a directory).
    DecompiledTree,
}

impl ArtifactKind {
    /// Returns the canonical file or directory name for a fingerprint key.
    pub fn file_name(self, key: &str) -> String {
        match self {
            ArtifactKind::MappedJar => format!("mapped.{key}.jar"),
            ArtifactKind::DecompiledTree => format!("decompile-{key}"),
        }
    }

    /// Returns `true` if the artifact is a directory rather than a file.
    pub fn is_dir(self) -> bool {
        matches!(self, ArtifactKind::DecompiledTree)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::MappedJar => f.write_str("mapped jar"),
            ArtifactKind::DecompiledTree => f.write_str("decompiled tree"),
        }
    }
}

/// Where a derivation step writes.
///
/// `output` is the artifact itself: for a directory artifact it exists and
/// is empty when the step starts; for a file artifact its parent exists.
/// `scratch` is an empty directory for intermediate files and is removed
/// after the step, whatever its outcome.
#[derive(Debug)]
pub struct Staging {
    output: PathBuf,
    scratch: PathBuf,
}

impl Staging {
    /// Path the step must produce its artifact at.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Directory for intermediate files.
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    /// Lays out a fresh staging area next to `canonical`, discarding any
    /// leftovers from an interrupted run.
    pub(crate) fn prepare(kind: ArtifactKind, canonical: &Path) -> Result<Self, CacheError> {
        let staging = Self {
            output: with_suffix(canonical, PARTIAL_SUFFIX),
            scratch: with_suffix(canonical, SCRATCH_SUFFIX),
        };

        for leftover in [&staging.output, &staging.scratch] {
            if leftover.exists() {
                tracing::warn!(
                    path = %leftover.display(),
                    "removing incomplete {kind} left by an interrupted run"
                );
                bt_common::fs::remove_if_exists(leftover)?;
            }
        }

        bt_common::fs::ensure_dir(&staging.scratch)?;
        if kind.is_dir() {
            bt_common::fs::ensure_dir(&staging.output)?;
        } else if let Some(parent) = staging.output.parent() {
            bt_common::fs::ensure_dir(parent)?;
        }
        Ok(staging)
    }

    /// Checks that the step produced output and renames it to `canonical`.
    pub(crate) fn promote(self, kind: ArtifactKind, canonical: &Path) -> Result<(), CacheError> {
        let produced = if kind.is_dir() {
            self.output.is_dir()
        } else {
            self.output.is_file()
        };
        if !produced {
            self.discard();
            return Err(CacheError::MissingOutput {
                kind,
                path: self.output,
            });
        }

        std::fs::rename(&self.output, canonical).map_err(|e| CacheError::Io {
            path: canonical.to_path_buf(),
            source: e,
        })?;
        self.discard_scratch();
        Ok(())
    }

    /// Removes everything the step wrote. Failures are logged, not raised:
    /// the caller is already reporting a more specific error and the next
    /// [`Staging::prepare`] retries the cleanup.
    pub(crate) fn discard(&self) {
        if let Err(e) = bt_common::fs::remove_if_exists(&self.output) {
            tracing::warn!("failed to clean up {}: {e}", self.output.display());
        }
        self.discard_scratch();
    }

    fn discard_scratch(&self) {
        if let Err(e) = bt_common::fs::remove_if_exists(&self.scratch) {
            tracing::warn!("failed to clean up {}: {e}", self.scratch.display());
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        assert_eq!(ArtifactKind::MappedJar.file_name("ab12cd34"), "mapped.ab12cd34.jar");
        assert_eq!(
            ArtifactKind::DecompiledTree.file_name("ab12cd34"),
            "decompile-ab12cd34"
        );
    }

    #[test]
    fn dir_kinds() {
        assert!(!ArtifactKind::MappedJar.is_dir());
        assert!(ArtifactKind::DecompiledTree.is_dir());
    }

    #[test]
    fn prepare_file_staging() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("mapped.k.jar");
        let staging = Staging::prepare(ArtifactKind::MappedJar, &canonical).unwrap();
        assert!(staging.output().ends_with("mapped.k.jar.partial"));
        assert!(!staging.output().exists());
        assert!(staging.scratch().is_dir());
    }

    #[test]
    fn prepare_dir_staging_creates_output() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("decompile-k");
        let staging = Staging::prepare(ArtifactKind::DecompiledTree, &canonical).unwrap();
        assert!(staging.output().is_dir());
    }

    #[test]
    fn prepare_discards_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("decompile-k");
        let stale = dir.path().join("decompile-k.partial");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("Half.java"), "class Half {").unwrap();

        let staging = Staging::prepare(ArtifactKind::DecompiledTree, &canonical).unwrap();
        assert!(staging.output().is_dir());
        assert!(!staging.output().join("Half.java").exists());
    }

    #[test]
    fn promote_renames_and_cleans_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("mapped.k.jar");
        let staging = Staging::prepare(ArtifactKind::MappedJar, &canonical).unwrap();
        std::fs::write(staging.output(), b"jar").unwrap();
        let scratch = staging.scratch().to_path_buf();

        staging.promote(ArtifactKind::MappedJar, &canonical).unwrap();
        assert_eq!(std::fs::read(&canonical).unwrap(), b"jar");
        assert!(!scratch.exists());
    }

    #[test]
    fn promote_without_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("mapped.k.jar");
        let staging = Staging::prepare(ArtifactKind::MappedJar, &canonical).unwrap();
        let err = staging
            .promote(ArtifactKind::MappedJar, &canonical)
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingOutput { .. }));
        assert!(!canonical.exists());
    }
}
