//! Errors raised while reading `buildtools.toml`.

use std::path::PathBuf;

/// A configuration file that cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The content is not valid TOML for the configuration schema.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A field that must name something is empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field holds a value the pipeline cannot work with.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted key of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("/bt/buildtools.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read /bt/buildtools.toml: denied");
    }

    #[test]
    fn invalid_names_field_and_reason() {
        let err = ConfigError::Invalid {
            field: "mappings.history_depth",
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(err.to_string(), "invalid mappings.history_depth: must be at least 1");
    }
}
