//! Cache manifest recording what each fingerprint was derived from.
//!
//! The manifest is stored as `cache-manifest.json` in the cache directory.
//! It is a record for humans and the `fingerprint` command, not the source of
//! truth: whether an artifact exists is always decided by looking at its
//! canonical path.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKind;
use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
pub const MANIFEST_FILE: &str = "cache-manifest.json";

/// Top-level manifest, keyed by fingerprint key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Version of the tool that wrote this manifest.
    pub tool_version: String,

    /// One entry per fingerprint key seen by this cache.
    pub entries: BTreeMap<String, ManifestEntry>,
}

/// What is known about one fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Full hex digest of the fingerprint.
    pub fingerprint: String,

    /// Revision identifiers the fingerprint was computed from, newest first.
    pub revisions: Vec<String>,

    /// Artifact kinds derived for this fingerprint.
    pub derived: BTreeSet<ArtifactKind>,
}

impl CacheManifest {
    /// Creates a new, empty manifest.
    pub fn new(tool_version: &str) -> Self {
        Self {
            tool_version: tool_version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the manifest from the cache directory, returning `None` if
    /// the file doesn't exist or can't be parsed.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable cache manifest: {e}");
                None
            }
        }
    }

    /// Saves the manifest atomically, creating the cache directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        bt_common::fs::write_atomic(&cache_dir.join(MANIFEST_FILE), json.as_bytes())?;
        Ok(())
    }

    /// Returns the entry for `key`, creating an empty one if needed.
    pub fn entry_mut(&mut self, key: &str) -> &mut ManifestEntry {
        self.entries.entry(key.to_string()).or_default()
    }
}
