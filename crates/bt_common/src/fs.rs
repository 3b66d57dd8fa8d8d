//! Filesystem primitives shared by the derivation steps.
//!
//! Every writer in the pipeline goes through [`write_atomic`] so that an
//! interrupted run never leaves a half-written file at a canonical path.
//! Tree walks are sorted by relative path, which keeps every directory
//! operation independent of the order the OS lists entries in.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::hash::{TreeDigest, TreeDigester};

/// Errors raised by the filesystem helpers.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// An I/O error occurred at the given path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A directory walk failed.
    #[error("failed to walk {path}: {reason}")]
    Walk {
        /// The root of the walk.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

impl FsError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for filesystem helpers.
pub type FsResult<T> = Result<T, FsError>;

/// Creates `dir` and all missing parents.
pub fn ensure_dir(dir: &Path) -> FsResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| FsError::io(dir, e))
}

/// Writes `data` to `path` by writing a temporary sibling and renaming it
/// into place.
///
/// Parent directories are created as needed. Readers observe either the old
/// content or the complete new content, never a partial file.
pub fn write_atomic(path: &Path, data: &[u8]) -> FsResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| FsError::io(&parent, e))?;
    tmp.write_all(data).map_err(|e| FsError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| FsError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| FsError::io(path, e.error))?;

    tracing::trace!(path = %path.display(), bytes = data.len(), "wrote file");
    Ok(())
}

/// Reads a whole file, attaching the path to any error.
pub fn read(path: &Path) -> FsResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| FsError::io(path, e))
}

/// Removes a file or directory tree if it exists.
pub fn remove_if_exists(path: &Path) -> FsResult<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FsError::io(path, e)),
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| FsError::io(path, e))
}

/// Returns every regular file below `root` as a path relative to `root`,
/// sorted lexicographically.
///
/// A missing `root` yields an empty list.
pub fn list_files(root: &Path) -> FsResult<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| FsError::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| FsError::Walk {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;
        files.push(rel.to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Copies every file below `src` into `dst`, creating directories as needed.
///
/// Existing files in `dst` with the same relative path are replaced; other
/// files in `dst` are left alone. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> FsResult<usize> {
    ensure_dir(dst)?;
    let files = list_files(src)?;
    for rel in &files {
        let from = src.join(rel);
        let to = dst.join(rel);
        if let Some(parent) = to.parent() {
            ensure_dir(parent)?;
        }
        std::fs::copy(&from, &to).map_err(|e| FsError::io(&from, e))?;
    }
    Ok(files.len())
}

/// Computes a digest over the relative paths and contents of every file
/// below `root`.
///
/// Empty directories do not contribute. Two trees with the same files and
/// bytes produce the same digest regardless of where they live on disk.
pub fn digest_tree(root: &Path) -> FsResult<TreeDigest> {
    let mut digester = TreeDigester::new();
    for rel in list_files(root)? {
        digester.add_file(&rel, &read(&root.join(&rel))?);
    }
    Ok(digester.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("file.txt");
        write_atomic(&path, b"content").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"content");
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        // No temporaries left behind
        assert_eq!(list_files(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn list_files_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        write_atomic(&dir.path().join("c.txt"), b"c").unwrap();
        write_atomic(&dir.path().join("a/b.txt"), b"b").unwrap();
        write_atomic(&dir.path().join("a.txt"), b"a").unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a/b.txt"),
                PathBuf::from("a.txt"),
                PathBuf::from("c.txt")
            ]
        );
    }

    #[test]
    fn list_files_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn copy_tree_copies_nested() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write_atomic(&src.join("x/y/z.txt"), b"deep").unwrap();
        write_atomic(&src.join("top.txt"), b"top").unwrap();

        let n = copy_tree(&src, &dst).unwrap();
        assert_eq!(n, 2);
        assert_eq!(std::fs::read(dst.join("x/y/z.txt")).unwrap(), b"deep");
        assert_eq!(digest_tree(&src).unwrap(), digest_tree(&dst).unwrap());
    }

    #[test]
    fn digest_tree_detects_content_change() {
        let dir = tempfile::tempdir().unwrap();
        write_atomic(&dir.path().join("f.txt"), b"one").unwrap();
        let before = digest_tree(dir.path()).unwrap();
        write_atomic(&dir.path().join("f.txt"), b"two").unwrap();
        assert_ne!(before, digest_tree(dir.path()).unwrap());
    }

    #[test]
    fn digest_tree_detects_rename() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write_atomic(&a.path().join("f.txt"), b"same").unwrap();
        write_atomic(&b.path().join("g.txt"), b"same").unwrap();
        assert_ne!(digest_tree(a.path()).unwrap(), digest_tree(b.path()).unwrap());
    }

    #[test]
    fn remove_if_exists_handles_missing_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        remove_if_exists(&dir.path().join("missing")).unwrap();

        let sub = dir.path().join("sub");
        write_atomic(&sub.join("f"), b"x").unwrap();
        remove_if_exists(&sub).unwrap();
        assert!(!sub.exists());
    }

    #[test]
    fn io_error_display_includes_path() {
        let err = FsError::io(
            "/tmp/missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("missing.txt"));
    }
}
