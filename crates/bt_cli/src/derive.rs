//! Cached derivation steps: remapping the vanilla jar and decompiling it.
//!
//! Both steps go through [`ArtifactCache::derive`], so each runs at most once
//! per mapping fingerprint and never leaves a partial artifact behind.

use std::path::Path;

use anyhow::{bail, Context as _};
use bt_cache::{ArtifactCache, ArtifactKind, Derivation, Fingerprint};
use bt_config::{BuildToolsConfig, ResolvedLayout};
use bt_exec::{CommandRunner, ExternalCommand, PrefixFilter};

fn java_jar(config: &BuildToolsConfig, jar: &Path) -> ExternalCommand {
    ExternalCommand::new(&config.tools.java)
        .arg("-jar")
        .arg(jar.to_string_lossy())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Remaps the vanilla server jar with the class, member and package
/// mappings.
pub fn mapped_jar(
    cache: &mut ArtifactCache,
    fingerprint: &Fingerprint,
    runner: &dyn CommandRunner,
    config: &BuildToolsConfig,
    layout: &ResolvedLayout,
) -> anyhow::Result<Derivation> {
    let derivation = cache.derive(fingerprint, ArtifactKind::MappedJar, |staging| {
        let classes = staging.scratch().join("mapped-cl.jar");
        let members = staging.scratch().join("mapped-m.jar");

        tracing::info!("Applying class mappings");
        runner.run(&java_jar(config, &layout.special_source).args([
            "-i".to_string(),
            path_arg(&layout.vanilla_jar),
            "-m".to_string(),
            path_arg(&layout.class_mappings),
            "-o".to_string(),
            path_arg(&classes),
        ]))?;

        tracing::info!("Applying member mappings");
        runner.run(&java_jar(config, &layout.special_source_2).args([
            "map".to_string(),
            "-i".to_string(),
            path_arg(&classes),
            "-m".to_string(),
            path_arg(&layout.member_mappings),
            "-o".to_string(),
            path_arg(&members),
        ]))?;

        tracing::info!("Applying access transformer and package mappings");
        runner.run(&java_jar(config, &layout.special_source).args([
            "-i".to_string(),
            path_arg(&members),
            "--access-transformer".to_string(),
            path_arg(&layout.access_transformer),
            "-m".to_string(),
            path_arg(&layout.package_mappings),
            "-o".to_string(),
            path_arg(staging.output()),
        ]))?;
        Ok::<_, anyhow::Error>(())
    })?;
    Ok(derivation)
}

/// Decompiles the classes under the configured prefix of `mapped` and
/// formats the resulting sources.
pub fn decompiled_tree(
    cache: &mut ArtifactCache,
    fingerprint: &Fingerprint,
    runner: &dyn CommandRunner,
    config: &BuildToolsConfig,
    layout: &ResolvedLayout,
    mapped: &Path,
) -> anyhow::Result<Derivation> {
    let derivation = cache.derive(fingerprint, ArtifactKind::DecompiledTree, |staging| {
        let prefix = config.decompile.class_prefix.trim_matches('/');
        let classes = staging.scratch().join("classes");
        let extracted = bt_exec::extract(mapped, &classes, &PrefixFilter::new(prefix))
            .with_context(|| format!("failed to extract {}", mapped.display()))?;
        if extracted == 0 {
            bail!("{} has no entries under {prefix}/", mapped.display());
        }

        tracing::info!("Decompiling classes");
        runner.run(
            &java_jar(config, &layout.fernflower)
                .args(config.tools.fernflower_args.iter().cloned())
                .arg(path_arg(&classes))
                .arg(path_arg(staging.output())),
        )?;

        let sources = prefix
            .split('/')
            .fold(staging.output().to_path_buf(), |dir, c| dir.join(c));
        tracing::info!("Formatting decompiled sources");
        runner.run(&ExternalCommand::new(path_arg(&layout.jacobe)).args([
            format!("-cfg={}", layout.jacobe_config.display()),
            "-nobackup".to_string(),
            "-overwrite".to_string(),
            "-outext=java".to_string(),
            path_arg(&sources),
        ]))?;
        Ok::<_, anyhow::Error>(())
    })?;
    Ok(derivation)
}
