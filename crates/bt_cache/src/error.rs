//! Error types for cache operations.

use std::path::PathBuf;

use bt_common::FsError;

use crate::artifact::ArtifactKind;

/// Errors that can occur during cache operations.
///
/// Reading the manifest is fail-safe and never produces these; they come
/// from creating artifacts.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A filesystem helper failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The derivation step itself failed. Nothing was written to the
    /// canonical path.
    #[error("failed to derive {kind} at {path}: {source}")]
    DerivationFailed {
        /// The kind of artifact being derived.
        kind: ArtifactKind,
        /// The canonical path the artifact would have occupied.
        path: PathBuf,
        /// The step's error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The derivation step reported success but left nothing at its
    /// staging path.
    #[error("{kind} derivation reported success but produced no output at {path}")]
    MissingOutput {
        /// The kind of artifact being derived.
        kind: ArtifactKind,
        /// The staging path that should have been written.
        path: PathBuf,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
