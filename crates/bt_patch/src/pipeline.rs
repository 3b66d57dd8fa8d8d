//! Applies a directory of patches onto a clean source tree.
//!
//! A run has two phases. Every patch is parsed and applied in memory first;
//! only when all of them succeed are the results written, each one
//! atomically. A patch error therefore writes nothing. An I/O error while
//! writing stops the run with the earlier outputs already in place, but no
//! output is ever left half-written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::document::PatchDocument;
use crate::engine::PatchEngine;
use crate::error::PipelineError;
use crate::source::SourceFile;

/// Maps patch file names to the source files they patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchNaming {
    /// Directory, relative to the tree roots, holding the patched sources
    /// (`/`-separated).
    pub source_prefix: String,
    /// Extension of patch files, without the dot.
    pub patch_extension: String,
    /// Extension of source files, without the dot.
    pub source_extension: String,
}

impl Default for PatchNaming {
    fn default() -> Self {
        Self {
            source_prefix: "net/minecraft/server".to_string(),
            patch_extension: "patch".to_string(),
            source_extension: "java".to_string(),
        }
    }
}

impl PatchNaming {
    /// Returns `true` if `file_name` names a patch file.
    pub fn is_patch(&self, file_name: &str) -> bool {
        self.strip_patch_extension(file_name)
            .is_some_and(|stem| !stem.is_empty())
    }

    /// Returns the source path, relative to a tree root, that `file_name`
    /// patches. `Block.patch` and `Block.java.patch` both map to
    /// `<prefix>/Block.java`.
    pub fn source_path_for(&self, file_name: &str) -> Option<PathBuf> {
        let stem = self.strip_patch_extension(file_name)?;
        if stem.is_empty() {
            return None;
        }
        let source_suffix = format!(".{}", self.source_extension);
        let file = if stem.ends_with(&source_suffix) {
            stem.to_string()
        } else {
            format!("{stem}{source_suffix}")
        };

        let mut path: PathBuf = self
            .source_prefix
            .split('/')
            .filter(|c| !c.is_empty())
            .collect();
        path.push(file);
        Some(path)
    }

    fn strip_patch_extension<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_suffix(self.patch_extension.as_str())
            .and_then(|s| s.strip_suffix('.'))
    }
}

/// Outcome for one patch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedFile {
    /// The patch file.
    pub patch: PathBuf,
    /// The written source, relative to the target root.
    pub target: PathBuf,
    /// Number of hunks applied.
    pub hunks: usize,
    /// Largest fuzz any hunk needed.
    pub max_fuzz: usize,
    /// Number of hunks that applied away from their declared line.
    pub offset_hunks: usize,
}

/// Summary of a successful run, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// One entry per patch file.
    pub files: Vec<PatchedFile>,
}

impl PipelineReport {
    /// Total number of hunks applied.
    pub fn hunks(&self) -> usize {
        self.files.iter().map(|f| f.hunks).sum()
    }

    /// Files that needed fuzz to apply.
    pub fn fuzzed(&self) -> impl Iterator<Item = &PatchedFile> {
        self.files.iter().filter(|f| f.max_fuzz > 0)
    }
}

/// Applies every patch in a directory.
#[derive(Debug, Clone, Default)]
pub struct PatchPipeline {
    naming: PatchNaming,
    engine: PatchEngine,
}

impl PatchPipeline {
    /// Creates a pipeline.
    pub fn new(naming: PatchNaming, engine: PatchEngine) -> Self {
        Self { naming, engine }
    }

    /// Returns the naming rules.
    pub fn naming(&self) -> &PatchNaming {
        &self.naming
    }

    /// Lists the patch files directly inside `patch_dir`, sorted by file
    /// name.
    pub fn patches(&self, patch_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let read_dir_err = |source| PipelineError::ReadPatchDir {
            path: patch_dir.to_path_buf(),
            source,
        };
        let mut patches = Vec::new();
        for entry in std::fs::read_dir(patch_dir).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            let is_file = entry.file_type().map_err(read_dir_err)?.is_file();
            let name = entry.file_name();
            if is_file && name.to_str().is_some_and(|n| self.naming.is_patch(n)) {
                patches.push(entry.path());
            }
        }
        patches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(patches)
    }

    /// Applies every patch in `patch_dir` to its counterpart under
    /// `clean_root` and writes the results under `target_root`.
    ///
    /// Exactly one file is written per patch; clean files without a patch
    /// are not copied.
    pub fn run(
        &self,
        patch_dir: &Path,
        clean_root: &Path,
        target_root: &Path,
    ) -> Result<PipelineReport, PipelineError> {
        let patches = self.patches(patch_dir)?;
        if patches.is_empty() {
            tracing::warn!(dir = %patch_dir.display(), "no patches found");
        }

        let mut claimed: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        let mut outputs = Vec::with_capacity(patches.len());
        let mut report = PipelineReport::default();

        for patch in patches {
            // `patches` only yields UTF-8 names that map to a source path.
            let Some(target) = patch
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.naming.source_path_for(n))
            else {
                continue;
            };
            if let Some(first) = claimed.get(&target) {
                return Err(PipelineError::DuplicateTarget {
                    target,
                    first: first.clone(),
                    second: patch,
                });
            }

            let clean = clean_root.join(&target);
            if !clean.is_file() {
                return Err(PipelineError::MissingSource {
                    patch,
                    expected: clean,
                });
            }

            tracing::info!(
                "Patching with {}",
                patch.file_name().unwrap_or_default().to_string_lossy()
            );
            let patch_text = read_text(&patch)?;
            let clean_text = read_text(&clean)?;
            let applied = PatchDocument::parse(&patch_text)
                .and_then(|doc| self.engine.apply(&SourceFile::parse(&clean_text), &doc))
                .map_err(|source| PipelineError::Patch {
                    patch: patch.clone(),
                    source,
                })?;

            report.files.push(PatchedFile {
                patch: patch.clone(),
                target: target.clone(),
                hunks: applied.placements.len(),
                max_fuzz: applied.max_fuzz(),
                offset_hunks: applied.placements.iter().filter(|p| p.offset != 0).count(),
            });
            outputs.push((target.clone(), applied.file.render()));
            claimed.insert(target, patch);
        }

        for (target, content) in &outputs {
            let path = target_root.join(target);
            bt_common::fs::write_atomic(&path, content.as_bytes())?;
            tracing::debug!(path = %path.display(), "wrote patched source");
        }

        tracing::info!(
            files = report.files.len(),
            hunks = report.hunks(),
            fuzzed = report.fuzzed().count(),
            "patches applied"
        );
        Ok(report)
    }
}

fn read_text(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })
}
