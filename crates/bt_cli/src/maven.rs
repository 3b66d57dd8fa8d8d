//! The bundled Maven distribution.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use bt_config::{BuildToolsConfig, ResolvedLayout};
use bt_exec::{AllEntries, CommandRunner, ExternalCommand};

/// A Maven installation under the work root.
#[derive(Debug, Clone)]
pub struct Maven {
    home: PathBuf,
}

impl Maven {
    /// Uses the distribution at `home` as is.
    pub fn at(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    /// Downloads and unpacks the configured distribution unless it is
    /// already present.
    pub fn ensure(config: &BuildToolsConfig, layout: &ResolvedLayout) -> anyhow::Result<Self> {
        let home = &layout.maven_dir;
        if !home.exists() {
            tracing::info!("Maven does not exist, downloading. Please wait.");
            let zip = layout.work_dir.join("mvn.zip");
            bt_exec::download(&config.maven.url, &zip)
                .with_context(|| format!("failed to download Maven {}", config.maven.version))?;
            let entries = bt_exec::extract(&zip, &layout.root, &AllEntries)
                .context("failed to unpack Maven")?;
            tracing::debug!(entries, "unpacked Maven");
            bt_common::fs::remove_if_exists(&zip)?;
            if !home.is_dir() {
                bail!(
                    "Maven archive did not contain {}",
                    home.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
                );
            }
        }
        Ok(Self::at(home))
    }

    /// Returns the installation directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Builds a Maven invocation with `args`.
    pub fn command<I, S>(&self, args: I) -> ExternalCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bin = self.home.join("bin");
        let command = if cfg!(windows) {
            ExternalCommand::new(bin.join("mvn.bat").to_string_lossy())
        } else {
            ExternalCommand::new("/bin/sh").arg(bin.join("mvn").to_string_lossy())
        };
        command.args(args)
    }

    /// Installs the mapped server jar into the local repository.
    pub fn install_file(
        &self,
        runner: &dyn CommandRunner,
        jar: &Path,
        config: &BuildToolsConfig,
    ) -> anyhow::Result<()> {
        let command = self.command([
            "install:install-file".to_string(),
            format!("-Dfile={}", jar.display()),
            "-Dpackaging=jar".to_string(),
            format!("-DgroupId={}", config.maven.group_id),
            format!("-DartifactId={}", config.maven.artifact_id),
            format!("-Dversion={}-SNAPSHOT", config.minecraft.version),
        ]);
        runner
            .run(&command)
            .with_context(|| format!("failed to install {}", jar.display()))?;
        Ok(())
    }

    /// Runs `clean install` in `project`.
    pub fn clean_install(&self, runner: &dyn CommandRunner, project: &Path) -> anyhow::Result<()> {
        tracing::info!("Compiling {}", project.display());
        runner
            .run(&self.command(["clean", "install"]).current_dir(project))
            .with_context(|| format!("failed to build {}", project.display()))?;
        Ok(())
    }
}
