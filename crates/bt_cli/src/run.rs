//! `buildtools run`: the full build.
//!
//! Clones or updates the upstream checkouts, derives the mapped jar and the
//! decompiled tree through the artifact cache, applies the server patches,
//! snapshots the result and finally compiles every project.

use std::path::Path;

use anyhow::Context as _;
use bt_cache::ArtifactCache;
use bt_config::{BuildToolsConfig, RepoSpec, ResolvedLayout};
use bt_exec::{CommandRunner, ExternalCommand, SystemRunner};
use bt_vcs::{Git, SnapshotManager, SnapshotSpec};

use crate::context::{self, Context, WorkLock};
use crate::maven::Maven;
use crate::{derive, fingerprint, GlobalArgs, RunArgs};

/// Executes the whole pipeline. Any failing step aborts the run.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let Context { config, layout } = Context::load(global)?;
    bt_common::fs::ensure_dir(&layout.work_dir)?;
    let _lock = WorkLock::acquire(&layout.lock_file)?;
    let runner = SystemRunner::new();

    Git::ensure_identity(&runner)?;
    let checkouts = checkouts(&config, &layout);
    for (spec, dir) in &checkouts {
        if !dir.join(".git").exists() {
            Git::clone_repo(&runner, &spec.url, dir)
                .with_context(|| format!("failed to clone {}", spec.url))?;
        }
    }
    let maven = Maven::ensure(&config, &layout)?;
    for (_, dir) in &checkouts {
        Git::open(&runner, dir)?.pull(&config.repositories.upstream_branch)?;
    }

    if !layout.vanilla_jar.is_file() {
        tracing::info!("Downloading vanilla server {}", config.minecraft.version);
        bt_exec::download(&layout.server_url, &layout.vanilla_jar)
            .context("failed to download the vanilla server")?;
    }

    let (revisions, fingerprint) = fingerprint::compute(&runner, &config, &layout)?;
    let mut cache = ArtifactCache::open(&layout.work_dir, env!("CARGO_PKG_VERSION"))?;
    cache.record_revisions(&fingerprint, &revisions)?;

    let mapped = derive::mapped_jar(&mut cache, &fingerprint, &runner, &config, &layout)?;
    maven.install_file(&runner, &mapped.path, &config)?;
    let decompiled =
        derive::decompiled_tree(&mut cache, &fingerprint, &runner, &config, &layout, &mapped.path)?;

    patch_and_snapshot(&runner, &config, &layout, &decompiled.path)?;

    if args.skip_compile {
        tracing::info!("Skipping compilation");
    } else {
        compile(&runner, &maven, &layout)?;
        tracing::info!("Success! Everything compiled successfully.");
    }
    Ok(0)
}

fn checkouts<'c>(
    config: &'c BuildToolsConfig,
    layout: &'c ResolvedLayout,
) -> [(&'c RepoSpec, &'c Path); 4] {
    let repos = &config.repositories;
    [
        (&repos.bukkit, layout.bukkit_dir.as_path()),
        (&repos.craftbukkit, layout.craftbukkit_dir.as_path()),
        (&repos.spigot, layout.spigot_dir.as_path()),
        (&repos.builddata, layout.builddata_dir.as_path()),
    ]
}

/// Patches a fresh copy of `decompiled` into the staging directory and
/// records it on the snapshot branch of the server checkout.
fn patch_and_snapshot(
    runner: &dyn CommandRunner,
    config: &BuildToolsConfig,
    layout: &ResolvedLayout,
    decompiled: &Path,
) -> anyhow::Result<()> {
    bt_common::fs::remove_if_exists(&layout.staging_dir)?;
    let pipeline = context::patch_pipeline(config, None, None);
    let report = pipeline
        .run(&layout.patch_dir, decompiled, &layout.staging_dir)
        .context("patching failed; nothing was written")?;
    tracing::info!(
        files = report.files.len(),
        hunks = report.hunks(),
        "patched sources staged in {}",
        layout.staging_dir.display()
    );

    let snapshot = &config.snapshot;
    let spec = SnapshotSpec {
        repo: layout.craftbukkit_dir.clone(),
        subdir: format!(
            "{}/{}",
            snapshot.source_root.trim_end_matches('/'),
            snapshot.tracked.trim_matches('/')
        ),
        branch: snapshot.branch.clone(),
        label: snapshot.label.clone(),
        restore: snapshot.restore,
    };
    let patched = layout.staging_dir.join(snapshot.tracked.trim_matches('/'));
    SnapshotManager::new(runner, spec)
        .capture(&patched)
        .context("failed to snapshot the patched sources")?;
    Ok(())
}

/// Builds the API and the server, then applies and builds the Spigot
/// patches on top of local clones of both.
fn compile(runner: &dyn CommandRunner, maven: &Maven, layout: &ResolvedLayout) -> anyhow::Result<()> {
    maven.clean_install(runner, &layout.bukkit_dir)?;
    maven.clean_install(runner, &layout.craftbukkit_dir)?;

    for upstream in [&layout.bukkit_dir, &layout.craftbukkit_dir] {
        let Some(name) = upstream.file_name() else {
            continue;
        };
        let local = layout.spigot_dir.join(name);
        if !local.exists() {
            let url = format!("file://{}", upstream.display());
            Git::clone_repo(runner, &url, &local)
                .with_context(|| format!("failed to clone {url}"))?;
        }
    }

    tracing::info!("Applying Spigot patches");
    runner
        .run(
            &ExternalCommand::new("bash")
                .arg("applyPatches.sh")
                .current_dir(&layout.spigot_dir),
        )
        .context("failed to apply Spigot patches")?;
    maven.clean_install(runner, &layout.spigot_dir)
}
