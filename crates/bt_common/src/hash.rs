//! Digests of whole source trees.
//!
//! A [`TreeDigest`] identifies the exact set of files below a directory and
//! their bytes. It is a fast non-cryptographic XXH3-128 digest used to check
//! that repeated patch runs and snapshots produce identical trees; upstream
//! revisions are keyed elsewhere.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

/// Digest of a file tree, serialized as 32 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TreeDigest([u8; 16]);

impl TreeDigest {
    /// Returns the digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TreeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for TreeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeDigest({})", &self.to_hex()[..8])
    }
}

impl From<TreeDigest> for String {
    fn from(digest: TreeDigest) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for TreeDigest {
    type Error = String;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        if hex.len() != 32 || !hex.is_ascii() {
            return Err(format!("expected 32 hex digits, got {hex:?}"));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("invalid digest {hex:?}: {e}"))?;
        }
        Ok(Self(bytes))
    }
}

/// Accumulates files into a [`TreeDigest`].
///
/// Files must be added in a deterministic order. Paths are hashed with `/`
/// separators so digests agree across platforms, and every field is
/// length-prefixed so moving bytes between a path and its content changes
/// the digest.
pub struct TreeDigester {
    state: Xxh3,
    files: u64,
}

impl Default for TreeDigester {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeDigester {
    /// Starts an empty digest.
    pub fn new() -> Self {
        Self {
            state: Xxh3::new(),
            files: 0,
        }
    }

    fn field(&mut self, bytes: &[u8]) {
        self.state.update(&(bytes.len() as u64).to_le_bytes());
        self.state.update(bytes);
    }

    /// Adds one file, given by its path relative to the tree root.
    pub fn add_file(&mut self, rel: &Path, content: &[u8]) {
        let rel = rel.to_string_lossy().replace('\\', "/");
        self.field(rel.as_bytes());
        self.field(content);
        self.files += 1;
    }

    /// Number of files added so far.
    pub fn files(&self) -> u64 {
        self.files
    }

    /// Finishes the digest.
    pub fn finish(&self) -> TreeDigest {
        TreeDigest(self.state.digest128().to_le_bytes())
    }
}
