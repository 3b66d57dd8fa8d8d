//! HTTP downloads.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::ExecError;

/// Fetches `url` and writes the body atomically to `dest`, returning the
/// body's SHA-256 as lowercase hex.
///
/// `dest` only appears once the whole body has been received.
pub fn download(url: &str, dest: &Path) -> Result<String, ExecError> {
    tracing::info!("Starting download of {url}");
    let failed = |reason: String| ExecError::Download {
        url: url.to_string(),
        reason,
    };

    let response = reqwest::blocking::get(url).map_err(|e| failed(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExecError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.bytes().map_err(|e| failed(e.to_string()))?;

    let digest = hex::encode(Sha256::digest(&body));
    bt_common::fs::write_atomic(dest, &body)?;
    tracing::info!(sha256 = %digest, bytes = body.len(), "Downloaded file: {}", dest.display());
    Ok(digest)
}

/// Returns the SHA-256 of a file on disk as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String, ExecError> {
    let mut file = std::fs::File::open(path).map_err(|e| bt_common::FsError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| bt_common::FsError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
