//! Zip and jar extraction.

use std::fs::File;
use std::path::Path;

use crate::error::ExecError;

/// Decides which archive entries to unpack.
pub trait EntryFilter {
    /// Returns `true` if the entry named `name` (`/`-separated, as stored in
    /// the archive) should be extracted.
    fn accept(&self, name: &str) -> bool;
}

impl<F: Fn(&str) -> bool> EntryFilter for F {
    fn accept(&self, name: &str) -> bool {
        self(name)
    }
}

/// Accepts every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEntries;

impl EntryFilter for AllEntries {
    fn accept(&self, _name: &str) -> bool {
        true
    }
}

/// Accepts entries below a directory prefix such as `net/minecraft/server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixFilter {
    prefix: String,
}

impl PrefixFilter {
    /// Creates a filter for entries under `prefix`. A trailing `/` is
    /// optional.
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: format!("{trimmed}/"),
        }
    }
}

impl EntryFilter for PrefixFilter {
    fn accept(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }
}

/// Unpacks the entries of `archive` accepted by `filter` into `dest`,
/// keeping their relative paths. Returns the number of files written.
///
/// Entries whose names would escape `dest` are skipped with a warning.
pub fn extract(archive: &Path, dest: &Path, filter: &dyn EntryFilter) -> Result<usize, ExecError> {
    let archive_err = |reason: String| ExecError::Archive {
        path: archive.to_path_buf(),
        reason,
    };
    let file = File::open(archive).map_err(|e| archive_err(e.to_string()))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_err(e.to_string()))?;
    bt_common::fs::ensure_dir(dest)?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| archive_err(e.to_string()))?;
        if !filter.accept(entry.name()) {
            continue;
        }
        let Some(rel) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let out = dest.join(rel);

        if entry.is_dir() {
            bt_common::fs::ensure_dir(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            bt_common::fs::ensure_dir(parent)?;
        }
        let mut target = File::create(&out).map_err(|e| bt_common::FsError::io(&out, e))?;
        std::io::copy(&mut entry, &mut target).map_err(|e| archive_err(format!("{}: {e}", out.display())))?;
        written += 1;
    }

    tracing::debug!(archive = %archive.display(), files = written, "extracted archive");
    Ok(written)
}
