//! Error types for patch parsing, application and the patch pipeline.

use std::path::PathBuf;

use bt_common::FsError;

/// Errors produced while parsing or applying a single patch document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// The patch text cannot be parsed into hunks.
    #[error("malformed patch at line {line}: {reason}")]
    Malformed {
        /// 1-based line in the patch text.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// A hunk's context does not match the source anywhere within tolerance.
    #[error("hunk #{hunk} (declared at line {declared_line}) does not apply: {reason}")]
    Conflict {
        /// 1-based index of the hunk within the document.
        hunk: usize,
        /// Old-side start line declared in the hunk header.
        declared_line: usize,
        /// Description of the mismatch.
        reason: String,
    },
}

impl PatchError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors that abort a patch pipeline run.
///
/// Every variant is fatal: a run either writes all of its outputs or none.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The patch directory could not be listed.
    #[error("failed to read patch directory {path}: {source}")]
    ReadPatchDir {
        /// The patch directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A patch or source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The clean tree has no file for a patch; the clean tree is stale or
    /// incomplete.
    #[error("clean source {expected} for patch {patch} does not exist")]
    MissingSource {
        /// The patch file.
        patch: PathBuf,
        /// Where the clean source was expected.
        expected: PathBuf,
    },

    /// A patch could not be parsed or applied.
    #[error("failed to apply {patch}: {source}")]
    Patch {
        /// The patch file.
        patch: PathBuf,
        /// The parse or conflict error.
        source: PatchError,
    },

    /// Two patch files map to the same source file.
    #[error("patches {first} and {second} both target {target}")]
    DuplicateTarget {
        /// The shared source path.
        target: PathBuf,
        /// The first patch file.
        first: PathBuf,
        /// The second patch file.
        second: PathBuf,
    },

    /// Writing the patched tree failed.
    #[error(transparent)]
    Fs(#[from] FsError),
}
