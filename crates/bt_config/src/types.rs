//! Configuration types deserialized from `buildtools.toml`.
//!
//! String values may contain the `{version}` placeholder, which is replaced
//! by [`MinecraftConfig::version`] during layout resolution.

use serde::Deserialize;

/// The top-level configuration parsed from `buildtools.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildToolsConfig {
    /// Vendor server binary settings.
    pub minecraft: MinecraftConfig,
    /// Upstream repositories to clone and pull.
    pub repositories: RepositoriesConfig,
    /// Maven distribution used for install and compile steps.
    pub maven: MavenConfig,
    /// Symbol mapping files that key the artifact cache.
    pub mappings: MappingsConfig,
    /// External remapping and decompilation tools.
    pub tools: ToolsConfig,
    /// Decompilation settings.
    pub decompile: DecompileConfig,
    /// Patch source layout and application tolerances.
    pub patches: PatchesConfig,
    /// Version-control snapshot of the patched tree.
    pub snapshot: SnapshotConfig,
    /// Work directory layout.
    pub work: WorkConfig,
}

/// Vendor server binary settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinecraftConfig {
    /// Server version (e.g. "1.8").
    pub version: String,
    /// Download URL of the vanilla server jar.
    pub server_url: String,
}

impl Default for MinecraftConfig {
    fn default() -> Self {
        Self {
            version: "1.8".to_string(),
            server_url: "https://s3.amazonaws.com/Minecraft.Download/versions/{version}/minecraft_server.{version}.jar"
                .to_string(),
        }
    }
}

/// A single upstream repository.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSpec {
    /// Clone URL.
    pub url: String,
    /// Checkout directory, relative to the work root.
    pub dir: String,
}

impl RepoSpec {
    fn new(url: &str, dir: &str) -> Self {
        Self {
            url: url.to_string(),
            dir: dir.to_string(),
        }
    }
}

/// Upstream repositories consumed by the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositoriesConfig {
    /// API repository.
    pub bukkit: RepoSpec,
    /// Server repository; owns the patch directory and receives the snapshot.
    pub craftbukkit: RepoSpec,
    /// Downstream fork built on top of the other two.
    pub spigot: RepoSpec,
    /// Mapping data and tool binaries.
    pub builddata: RepoSpec,
    /// Branch that pulls reset to before fast-forwarding.
    pub upstream_branch: String,
}

impl Default for RepositoriesConfig {
    fn default() -> Self {
        Self {
            bukkit: RepoSpec::new("https://hub.spigotmc.org/stash/scm/spigot/bukkit.git", "Bukkit"),
            craftbukkit: RepoSpec::new(
                "https://hub.spigotmc.org/stash/scm/spigot/craftbukkit.git",
                "CraftBukkit",
            ),
            spigot: RepoSpec::new("https://hub.spigotmc.org/stash/scm/spigot/spigot.git", "Spigot"),
            builddata: RepoSpec::new(
                "https://hub.spigotmc.org/stash/scm/spigot/builddata.git",
                "BuildData",
            ),
            upstream_branch: "master".to_string(),
        }
    }
}

/// Maven distribution settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MavenConfig {
    /// Distribution version.
    pub version: String,
    /// Download URL of the distribution zip.
    pub url: String,
    /// Install coordinates of the mapped server jar.
    pub group_id: String,
    /// Artifact id of the mapped server jar.
    pub artifact_id: String,
}

impl Default for MavenConfig {
    fn default() -> Self {
        Self {
            version: "3.2.3".to_string(),
            url: "http://static.spigotmc.org/maven/apache-maven-3.2.3-bin.zip".to_string(),
            group_id: "org.spigotmc".to_string(),
            artifact_id: "minecraft-server".to_string(),
        }
    }
}

/// Mapping files, relative to the build-data repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MappingsConfig {
    /// Files whose history keys the artifact cache.
    pub tracked: Vec<String>,
    /// Number of most recent revisions fed into the fingerprint.
    pub history_depth: usize,
    /// Class-name mappings (first remapping pass).
    pub class_mappings: String,
    /// Member-name mappings (second remapping pass).
    pub member_mappings: String,
    /// Access transformer (third remapping pass).
    pub access_transformer: String,
    /// Package mappings (third remapping pass).
    pub package_mappings: String,
}

impl Default for MappingsConfig {
    fn default() -> Self {
        Self {
            tracked: vec![
                "mappings/bukkit-{version}.at".to_string(),
                "mappings/bukkit-{version}-cl.csrg".to_string(),
                "mappings/bukkit-{version}-members.csrg".to_string(),
                "mappings/package.srg".to_string(),
            ],
            history_depth: 1,
            class_mappings: "mappings/bukkit-{version}-cl.csrg".to_string(),
            member_mappings: "mappings/bukkit-{version}-members.csrg".to_string(),
            access_transformer: "mappings/bukkit-{version}.at".to_string(),
            package_mappings: "mappings/package.srg".to_string(),
        }
    }
}

/// External tool locations, relative to the build-data repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Java launcher.
    pub java: String,
    /// Remapper used for the class and access-transformer passes.
    pub special_source: String,
    /// Remapper used for the member pass.
    pub special_source_2: String,
    /// Decompiler jar.
    pub fernflower: String,
    /// Decompiler flags.
    pub fernflower_args: Vec<String>,
    /// Source formatter executable (`.exe` is appended on Windows).
    pub jacobe: String,
    /// Source formatter configuration.
    pub jacobe_config: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            special_source: "bin/SpecialSource.jar".to_string(),
            special_source_2: "bin/SpecialSource-2.jar".to_string(),
            fernflower: "bin/fernflower.jar".to_string(),
            fernflower_args: ["-dgs=1", "-hdc=0", "-rbr=0", "-asc=1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            jacobe: "bin/jacobe".to_string(),
            jacobe_config: "bin/jacobe.cfg".to_string(),
        }
    }
}

/// Decompilation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecompileConfig {
    /// Only archive entries under this prefix are decompiled.
    pub class_prefix: String,
}

impl Default for DecompileConfig {
    fn default() -> Self {
        Self {
            class_prefix: "net/minecraft/server".to_string(),
        }
    }
}

/// Patch source layout and application tolerances.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatchesConfig {
    /// Patch directory, relative to the server repository.
    pub dir: String,
    /// Package prefix prepended to every derived source path.
    pub source_prefix: String,
    /// Extension of patch files.
    pub patch_extension: String,
    /// Extension of the patched sources.
    pub source_extension: String,
    /// Maximum number of outer context lines a hunk may ignore.
    pub fuzz: usize,
    /// Maximum distance in lines between a hunk's declared and actual anchor.
    /// Unset means the whole file is searched.
    pub max_offset: Option<usize>,
}

impl Default for PatchesConfig {
    fn default() -> Self {
        Self {
            dir: "nms-patches".to_string(),
            source_prefix: "net/minecraft/server".to_string(),
            patch_extension: "patch".to_string(),
            source_extension: "java".to_string(),
            fuzz: 2,
            max_offset: None,
        }
    }
}

/// What the working tree holds after a snapshot has been captured.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreMode {
    /// The content the tracked directory held before the snapshot (default).
    #[default]
    PreImage,
    /// The patched content, left untracked on the original branch.
    Snapshot,
}

/// Version-control snapshot settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Source root inside the server repository where the patched tree lands.
    pub source_root: String,
    /// Directory under `source_root` replaced by the snapshot.
    pub tracked: String,
    /// Snapshot branch name.
    pub branch: String,
    /// Prefix of the snapshot commit message.
    pub label: String,
    /// Working-tree content after the snapshot.
    pub restore: RestoreMode,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            source_root: "src/main/java".to_string(),
            tracked: "net".to_string(),
            branch: "patched".to_string(),
            label: "CraftBukkit".to_string(),
            restore: RestoreMode::PreImage,
        }
    }
}

/// Work directory layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkConfig {
    /// Cache and staging directory, relative to the work root.
    pub dir: String,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            dir: "work".to_string(),
        }
    }
}
