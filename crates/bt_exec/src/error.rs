//! Error types for external processes, archives and downloads.

use std::path::PathBuf;

use bt_common::FsError;

/// Errors raised while talking to the outside world.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting for or reading from a running child failed.
    #[error("failed while running {program}: {source}")]
    Wait {
        /// The program that was running.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("{command} exited with {}{}", exit_description(.code), stderr_suffix(.stderr))]
    NonZero {
        /// The full command line.
        command: String,
        /// Exit code, or `None` if the child was killed by a signal.
        code: Option<i32>,
        /// The last lines the child wrote to stderr.
        stderr: String,
    },

    /// An archive could not be read or unpacked.
    #[error("failed to extract {path}: {reason}")]
    Archive {
        /// The archive file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A download failed before a response body was received.
    #[error("failed to download {url}: {reason}")]
    Download {
        /// The requested URL.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("download of {url} failed with HTTP status {status}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A filesystem helper failed.
    #[error(transparent)]
    Fs(#[from] FsError),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!(": {}", stderr.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_display_with_stderr() {
        let err = ExecError::NonZero {
            command: "git pull".to_string(),
            code: Some(1),
            stderr: "fatal: not a git repository\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "git pull exited with exit code 1: fatal: not a git repository"
        );
    }

    #[test]
    fn non_zero_display_signal() {
        let err = ExecError::NonZero {
            command: "java -jar fernflower.jar".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "java -jar fernflower.jar exited with a signal");
    }

    #[test]
    fn http_status_display() {
        let err = ExecError::HttpStatus {
            url: "https://example.invalid/server.jar".to_string(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
    }
}
