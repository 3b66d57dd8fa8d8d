//! Layout resolution: turning relative configuration values into absolute paths.

use crate::types::BuildToolsConfig;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the configured server version.
const VERSION_PLACEHOLDER: &str = "{version}";

/// Every path the pipeline touches, resolved against a work root.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    /// The work root all other paths are relative to.
    pub root: PathBuf,
    /// Cache and staging directory.
    pub work_dir: PathBuf,
    /// API repository checkout.
    pub bukkit_dir: PathBuf,
    /// Server repository checkout.
    pub craftbukkit_dir: PathBuf,
    /// Downstream fork checkout.
    pub spigot_dir: PathBuf,
    /// Mapping data checkout.
    pub builddata_dir: PathBuf,
    /// Unpacked Maven distribution.
    pub maven_dir: PathBuf,
    /// Downloaded vanilla server jar.
    pub vanilla_jar: PathBuf,
    /// Download URL of the vanilla server jar.
    pub server_url: String,
    /// Tracked mapping files, relative to the mapping checkout (git pathspecs).
    pub tracked_mappings: Vec<String>,
    /// Class-name mapping file.
    pub class_mappings: PathBuf,
    /// Member-name mapping file.
    pub member_mappings: PathBuf,
    /// Access transformer file.
    pub access_transformer: PathBuf,
    /// Package mapping file.
    pub package_mappings: PathBuf,
    /// Remapper for the class and access-transformer passes.
    pub special_source: PathBuf,
    /// Remapper for the member pass.
    pub special_source_2: PathBuf,
    /// Decompiler jar.
    pub fernflower: PathBuf,
    /// Source formatter executable.
    pub jacobe: PathBuf,
    /// Source formatter configuration.
    pub jacobe_config: PathBuf,
    /// Directory of patch files.
    pub patch_dir: PathBuf,
    /// Directory the patched tree is staged in before the snapshot.
    pub staging_dir: PathBuf,
    /// Directory replaced by the snapshot, relative to the server repository.
    pub snapshot_subdir: PathBuf,
    /// Lock file serializing whole-pipeline runs.
    pub lock_file: PathBuf,
}

/// Resolves every configured location against `root`.
pub fn resolve_layout(config: &BuildToolsConfig, root: &Path) -> ResolvedLayout {
    let version = config.minecraft.version.as_str();
    let expand = |s: &str| s.replace(VERSION_PLACEHOLDER, version);

    let repos = &config.repositories;
    let work_dir = root.join(&config.work.dir);
    let craftbukkit_dir = root.join(&repos.craftbukkit.dir);
    let builddata_dir = root.join(&repos.builddata.dir);
    let data = |s: &str| builddata_dir.join(expand(s));

    let mut jacobe = expand(&config.tools.jacobe);
    if cfg!(windows) {
        jacobe.push_str(".exe");
    }

    ResolvedLayout {
        root: root.to_path_buf(),
        vanilla_jar: work_dir.join(format!("minecraft_server.{version}.jar")),
        server_url: expand(&config.minecraft.server_url),
        staging_dir: work_dir.join("patched"),
        lock_file: work_dir.join(".buildtools.lock"),
        maven_dir: root.join(format!("apache-maven-{}", config.maven.version)),
        bukkit_dir: root.join(&repos.bukkit.dir),
        spigot_dir: root.join(&repos.spigot.dir),
        tracked_mappings: config.mappings.tracked.iter().map(|s| expand(s)).collect(),
        class_mappings: data(&config.mappings.class_mappings),
        member_mappings: data(&config.mappings.member_mappings),
        access_transformer: data(&config.mappings.access_transformer),
        package_mappings: data(&config.mappings.package_mappings),
        special_source: data(&config.tools.special_source),
        special_source_2: data(&config.tools.special_source_2),
        fernflower: data(&config.tools.fernflower),
        jacobe: builddata_dir.join(jacobe),
        jacobe_config: data(&config.tools.jacobe_config),
        patch_dir: craftbukkit_dir.join(&config.patches.dir),
        snapshot_subdir: Path::new(&config.snapshot.source_root).join(&config.snapshot.tracked),
        work_dir,
        craftbukkit_dir,
        builddata_dir,
    }
}
