//! Fingerprint-keyed artifact cache for expensive derivation steps.
//!
//! Remapped jars and decompiled trees are keyed by a [`Fingerprint`] of the
//! mapping data's revision history. An artifact that exists at its canonical
//! path is a completed derivation: [`ArtifactCache::derive`] skips the step
//! entirely in that case, and otherwise runs it against a staging path that
//! is renamed into place only once the step succeeds.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod error;
pub mod hasher;
pub mod manifest;

pub use artifact::{ArtifactKind, Staging};
pub use cache::{ArtifactCache, Derivation, Outcome};
pub use error::CacheError;
pub use hasher::{ContentHasher, Fingerprint, RevisionSet};
pub use manifest::{CacheManifest, ManifestEntry};
