//! `buildtools fingerprint`: shows the artifact cache key.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bt_cache::{ArtifactKind, ContentHasher, Fingerprint, RevisionSet};
use bt_config::{BuildToolsConfig, ResolvedLayout};
use bt_exec::{CommandRunner, SystemRunner};
use bt_vcs::Git;

use crate::context::Context;
use crate::GlobalArgs;

/// Reads the mapping history from the build-data checkout and derives the
/// fingerprint keying every cached artifact.
pub fn compute(
    runner: &dyn CommandRunner,
    config: &BuildToolsConfig,
    layout: &ResolvedLayout,
) -> anyhow::Result<(RevisionSet, Fingerprint)> {
    let repo = Git::open(runner, &layout.builddata_dir)?;
    let revisions = repo
        .log_revisions(&layout.tracked_mappings, config.mappings.history_depth)
        .context("failed to read the mapping history")?;
    if revisions.is_empty() {
        tracing::warn!(
            "no commit touches the tracked mappings in {}; the cache key covers no history",
            layout.builddata_dir.display()
        );
    }
    let fingerprint = ContentHasher::fingerprint(&revisions);
    tracing::info!("Mappings fingerprint: {}", fingerprint.key());
    Ok((revisions, fingerprint))
}

/// Prints the mapping revisions, the fingerprint and which artifacts exist.
pub fn run(global: &GlobalArgs) -> anyhow::Result<i32> {
    let Context { config, layout } = Context::load(global)?;
    let runner = SystemRunner::new();
    let (revisions, fingerprint) = compute(&runner, &config, &layout)?;

    for rev in revisions.as_slice() {
        println!("revision    {rev}");
    }
    println!("fingerprint {}", fingerprint.to_hex());
    println!("key         {}", fingerprint.key());

    for (kind, path, cached) in artifact_status(&layout.work_dir, &fingerprint) {
        let status = if cached { "cached" } else { "missing" };
        println!("{kind}: {status} ({})", path.display());
    }
    Ok(0)
}

/// Canonical path of each artifact kind for `fingerprint` and whether it
/// exists. Only inspects the filesystem; the work directory is not created.
pub fn artifact_status(work_dir: &Path, fingerprint: &Fingerprint) -> Vec<(ArtifactKind, PathBuf, bool)> {
    [ArtifactKind::MappedJar, ArtifactKind::DecompiledTree]
        .into_iter()
        .map(|kind| {
            let path = work_dir.join(kind.file_name(&fingerprint.key()));
            let cached = path.exists();
            (kind, path, cached)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_cache::ArtifactCache;

    #[test]
    fn status_does_not_create_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let revisions: RevisionSet = ["abc123"].into_iter().collect();
        let fp = ContentHasher::fingerprint(&revisions);

        let status = artifact_status(&work, &fp);
        assert!(!work.exists());
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|(_, _, cached)| !cached));
    }

    #[test]
    fn status_matches_cache_paths() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let revisions: RevisionSet = ["abc123"].into_iter().collect();
        let fp = ContentHasher::fingerprint(&revisions);
        let cache = ArtifactCache::open(&work, "test").unwrap();
        std::fs::write(cache.resolve(&fp, ArtifactKind::MappedJar), b"jar").unwrap();

        let status = artifact_status(&work, &fp);
        assert_eq!(status[0], (ArtifactKind::MappedJar, cache.resolve(&fp, ArtifactKind::MappedJar), true));
        assert_eq!(
            status[1],
            (ArtifactKind::DecompiledTree, cache.resolve(&fp, ArtifactKind::DecompiledTree), false)
        );
    }
}
