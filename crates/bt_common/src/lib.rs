//! Shared foundational types used across the buildtools pipeline.
//!
//! This crate provides tree digests for comparing outputs and the
//! filesystem primitives every derivation step relies on: atomic file
//! replacement, deterministic tree walks and directory copies.

#![warn(missing_docs)]

pub mod fs;
pub mod hash;

pub use fs::{FsError, FsResult};
pub use hash::{TreeDigest, TreeDigester};
