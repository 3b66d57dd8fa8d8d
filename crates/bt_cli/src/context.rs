//! Shared helpers for CLI commands.
//!
//! Resolves the work root and configuration from the global flags, builds
//! the patch pipeline from configuration, and guards whole-pipeline runs
//! with a lock file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use bt_config::{BuildToolsConfig, ResolvedLayout};
use bt_patch::{PatchEngine, PatchNaming, PatchOptions, PatchPipeline};

use crate::GlobalArgs;

/// Configuration and resolved locations for one invocation.
pub struct Context {
    /// Parsed configuration.
    pub config: BuildToolsConfig,
    /// Absolute locations derived from the configuration.
    pub layout: ResolvedLayout,
}

impl Context {
    /// Loads the configuration selected by the global flags.
    ///
    /// The root is `--work-dir`, or the current directory. The configuration
    /// is `--config` when given (and must exist), otherwise `buildtools.toml`
    /// in the root, falling back to defaults when that file is absent.
    pub fn load(global: &GlobalArgs) -> anyhow::Result<Self> {
        let root = resolve_root(global)?;
        let config = match global.config {
            Some(ref path) => bt_config::load_config_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => bt_config::load_config_or_default(&root).with_context(|| {
                format!(
                    "failed to load {}",
                    root.join(bt_config::loader::CONFIG_FILE).display()
                )
            })?,
        };
        let layout = bt_config::resolve_layout(&config, &root);
        Ok(Self { config, layout })
    }
}

/// Returns the absolute work root.
pub fn resolve_root(global: &GlobalArgs) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    Ok(match global.work_dir {
        Some(ref dir) if dir.is_absolute() => dir.clone(),
        Some(ref dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Builds the patch pipeline described by the configuration, with optional
/// tolerance overrides.
pub fn patch_pipeline(
    config: &BuildToolsConfig,
    fuzz: Option<usize>,
    max_offset: Option<usize>,
) -> PatchPipeline {
    let patches = &config.patches;
    let naming = PatchNaming {
        source_prefix: patches.source_prefix.clone(),
        patch_extension: patches.patch_extension.clone(),
        source_extension: patches.source_extension.clone(),
    };
    let options = PatchOptions {
        fuzz: fuzz.unwrap_or(patches.fuzz),
        max_offset: max_offset.or(patches.max_offset),
    };
    PatchPipeline::new(naming, PatchEngine::new(options))
}

/// Exclusive lock on a work directory, released on drop.
#[derive(Debug)]
pub struct WorkLock {
    path: PathBuf,
}

impl WorkLock {
    /// Creates the lock file, failing if another run holds it.
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            bt_common::fs::ensure_dir(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => bail!(
                "another build holds {}; remove it if no build is running",
                path.display()
            ),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create {}", path.display()))
            }
        };
        writeln!(file, "{}", std::process::id())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "acquired work lock");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for WorkLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), "failed to release work lock: {e}");
        }
    }
}
