//! High-level artifact cache.
//!
//! The `ArtifactCache` ties together canonical artifact paths, staging and
//! the manifest into the single gate the build pipeline consults before any
//! expensive derivation.

use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactKind, Staging};
use crate::error::CacheError;
use crate::hasher::{Fingerprint, RevisionSet};
use crate::manifest::CacheManifest;

/// Whether a derivation ran or was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The artifact already existed; the step was not invoked.
    Cached,
    /// The step ran and its output was promoted.
    Derived,
}

/// The result of [`ArtifactCache::derive`].
#[derive(Debug, Clone)]
pub struct Derivation {
    /// Canonical path of the artifact.
    pub path: PathBuf,
    /// Whether the step ran.
    pub outcome: Outcome,
}

/// Fingerprint-keyed store of derived artifacts.
///
/// Artifacts are created at most once per fingerprint and never modified or
/// deleted afterwards.
pub struct ArtifactCache {
    /// Root directory holding every artifact and the manifest.
    cache_dir: PathBuf,

    /// Record of fingerprints and their derivations.
    manifest: CacheManifest,
}

impl ArtifactCache {
    /// Opens the cache rooted at `cache_dir`, creating the directory if
    /// needed.
    ///
    /// A missing or unreadable manifest starts a fresh one; it never affects
    /// which artifacts are considered present.
    pub fn open(cache_dir: &Path, tool_version: &str) -> Result<Self, CacheError> {
        bt_common::fs::ensure_dir(cache_dir)?;
        let mut manifest =
            CacheManifest::load(cache_dir).unwrap_or_else(|| CacheManifest::new(tool_version));
        manifest.tool_version = tool_version.to_string();

        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            manifest,
        })
    }

    /// Returns the canonical path of an artifact.
    pub fn resolve(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> PathBuf {
        self.cache_dir.join(kind.file_name(&fingerprint.key()))
    }

    /// Returns `true` if something exists at `path`.
    ///
    /// Presence alone is proof of a completed derivation, because
    /// derivations only ever appear at canonical paths by rename.
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Returns `true` if the artifact for `fingerprint` has been derived.
    pub fn is_cached(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> bool {
        self.exists(&self.resolve(fingerprint, kind))
    }

    /// Records the revisions a fingerprint was computed from.
    pub fn record_revisions(
        &mut self,
        fingerprint: &Fingerprint,
        revisions: &RevisionSet,
    ) -> Result<(), CacheError> {
        let entry = self.manifest.entry_mut(&fingerprint.key());
        entry.fingerprint = fingerprint.to_hex();
        entry.revisions = revisions.as_slice().to_vec();
        self.manifest.save(&self.cache_dir)
    }

    /// Produces the artifact for `fingerprint`, running `step` only if it
    /// does not exist yet.
    ///
    /// The step writes to [`Staging::output`]; on success that path is
    /// renamed to the canonical path. On failure everything the step wrote
    /// is removed and the canonical path is left untouched, so the next run
    /// retries from scratch.
    pub fn derive<F, E>(
        &mut self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
        step: F,
    ) -> Result<Derivation, CacheError>
    where
        F: FnOnce(&Staging) -> Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = self.resolve(fingerprint, kind);
        if self.exists(&path) {
            tracing::debug!(path = %path.display(), "{kind} is cached");
            return Ok(Derivation {
                path,
                outcome: Outcome::Cached,
            });
        }

        tracing::info!(path = %path.display(), "{kind} does not exist, creating");
        let staging = Staging::prepare(kind, &path)?;
        if let Err(e) = step(&staging) {
            staging.discard();
            return Err(CacheError::DerivationFailed {
                kind,
                path,
                source: e.into(),
            });
        }
        staging.promote(kind, &path)?;

        self.manifest
            .entry_mut(&fingerprint.key())
            .derived
            .insert(kind);
        self.manifest.save(&self.cache_dir)?;

        tracing::info!(path = %path.display(), "created {kind}");
        Ok(Derivation {
            path,
            outcome: Outcome::Derived,
        })
    }

    /// Returns the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns a reference to the current manifest.
    pub fn manifest(&self) -> &CacheManifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;
    use std::cell::Cell;

    fn fp(rev: &str) -> Fingerprint {
        ContentHasher::fingerprint(&RevisionSet::new(vec![rev.to_string()]))
    }

    fn make_cache() -> (tempfile::TempDir, ArtifactCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::open(dir.path(), "0.1.0").unwrap();
        (dir, cache)
    }

    fn write_jar(staging: &Staging) -> Result<(), std::io::Error> {
        std::fs::write(staging.output(), b"mapped bytes")
    }

    #[test]
    fn resolve_embeds_key() {
        let (dir, cache) = make_cache();
        let f = fp("abc");
        let path = cache.resolve(&f, ArtifactKind::MappedJar);
        assert_eq!(path, dir.path().join(format!("mapped.{}.jar", f.key())));
        let path = cache.resolve(&f, ArtifactKind::DecompiledTree);
        assert_eq!(path, dir.path().join(format!("decompile-{}", f.key())));
    }

    #[test]
    fn derive_runs_once_per_fingerprint() {
        let (_dir, mut cache) = make_cache();
        let f = fp("abc");
        let calls = Cell::new(0);

        let first = cache
            .derive(&f, ArtifactKind::MappedJar, |s| {
                calls.set(calls.get() + 1);
                write_jar(s)
            })
            .unwrap();
        let second = cache
            .derive(&f, ArtifactKind::MappedJar, |s| {
                calls.set(calls.get() + 1);
                write_jar(s)
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first.outcome, Outcome::Derived);
        assert_eq!(second.outcome, Outcome::Cached);
        assert_eq!(first.path, second.path);
    }

    #[test]
    fn new_fingerprint_derives_again() {
        let (_dir, mut cache) = make_cache();
        let calls = Cell::new(0);
        for rev in ["abc", "def"] {
            cache
                .derive(&fp(rev), ArtifactKind::MappedJar, |s| {
                    calls.set(calls.get() + 1);
                    write_jar(s)
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn presence_is_trusted_without_verification() {
        let (_dir, mut cache) = make_cache();
        let f = fp("abc");
        let path = cache.resolve(&f, ArtifactKind::MappedJar);
        std::fs::write(&path, b"anything").unwrap();

        let d = cache
            .derive(&f, ArtifactKind::MappedJar, |_| -> Result<(), std::io::Error> {
                panic!("step must not run for an existing artifact")
            })
            .unwrap();
        assert_eq!(d.outcome, Outcome::Cached);
        assert_eq!(std::fs::read(&path).unwrap(), b"anything");
    }

    #[test]
    fn failed_step_leaves_no_artifact() {
        let (dir, mut cache) = make_cache();
        let f = fp("abc");

        let err = cache
            .derive(&f, ArtifactKind::DecompiledTree, |s| {
                std::fs::write(s.output().join("Half.java"), "class Half {")?;
                Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "decompiler crashed"))
            })
            .unwrap_err();

        assert!(matches!(err, CacheError::DerivationFailed { .. }));
        assert!(!cache.is_cached(&f, ArtifactKind::DecompiledTree));
        // Only the manifest directory content may remain; no partial trees
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("decompile-"))
            .collect();
        assert!(leftovers.is_empty(), "unexpected leftovers: {leftovers:?}");
    }

    #[test]
    fn retry_after_failure_derives() {
        let (_dir, mut cache) = make_cache();
        let f = fp("abc");
        let _ = cache.derive(&f, ArtifactKind::MappedJar, |_| {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
        });
        let d = cache.derive(&f, ArtifactKind::MappedJar, write_jar).unwrap();
        assert_eq!(d.outcome, Outcome::Derived);
    }

    #[test]
    fn interrupted_partial_is_not_a_hit() {
        let (dir, mut cache) = make_cache();
        let f = fp("abc");
        // Simulate a crash mid-derivation in an earlier process
        let partial = dir.path().join(format!("mapped.{}.jar.partial", f.key()));
        std::fs::write(&partial, b"trunc").unwrap();

        assert!(!cache.is_cached(&f, ArtifactKind::MappedJar));
        let d = cache.derive(&f, ArtifactKind::MappedJar, write_jar).unwrap();
        assert_eq!(d.outcome, Outcome::Derived);
        assert_eq!(std::fs::read(&d.path).unwrap(), b"mapped bytes");
        assert!(!partial.exists());
    }

    #[test]
    fn step_without_output_is_error() {
        let (_dir, mut cache) = make_cache();
        let err = cache
            .derive(&fp("abc"), ArtifactKind::MappedJar, |_| Ok::<(), std::io::Error>(()))
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingOutput { .. }));
    }

    #[test]
    fn scratch_available_and_removed() {
        let (_dir, mut cache) = make_cache();
        let mut scratch_path = PathBuf::new();
        cache
            .derive(&fp("abc"), ArtifactKind::MappedJar, |s| {
                scratch_path = s.scratch().to_path_buf();
                std::fs::write(s.scratch().join("intermediate-cl.jar"), b"cl")?;
                write_jar(s)
            })
            .unwrap();
        assert!(!scratch_path.as_os_str().is_empty());
        assert!(!scratch_path.exists());
    }

    #[test]
    fn manifest_records_revisions_and_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let revs = RevisionSet::new(vec!["r2".to_string(), "r1".to_string()]);
        let f = ContentHasher::fingerprint(&revs);
        {
            let mut cache = ArtifactCache::open(dir.path(), "0.1.0").unwrap();
            cache.record_revisions(&f, &revs).unwrap();
            cache.derive(&f, ArtifactKind::MappedJar, write_jar).unwrap();
        }

        let cache = ArtifactCache::open(dir.path(), "0.1.0").unwrap();
        let entry = &cache.manifest().entries[&f.key()];
        assert_eq!(entry.revisions, vec!["r2", "r1"]);
        assert_eq!(entry.fingerprint, f.to_hex());
        assert!(entry.derived.contains(&ArtifactKind::MappedJar));
    }
}
