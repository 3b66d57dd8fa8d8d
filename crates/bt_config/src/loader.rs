//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::BuildToolsConfig;
use std::path::Path;

/// Name of the configuration file inside the work root.
pub const CONFIG_FILE: &str = "buildtools.toml";

/// Loads and validates `buildtools.toml` from a work root directory.
pub fn load_config(root: &Path) -> Result<BuildToolsConfig, ConfigError> {
    load_config_file(&root.join(CONFIG_FILE))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<BuildToolsConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Loads `buildtools.toml` from `root`, falling back to the built-in
/// defaults when the file does not exist.
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_default(root: &Path) -> Result<BuildToolsConfig, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(BuildToolsConfig::default());
    }
    load_config_file(&path)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<BuildToolsConfig, ConfigError> {
    let config: BuildToolsConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &BuildToolsConfig) -> Result<(), ConfigError> {
    let required = [
        ("minecraft.version", &config.minecraft.version),
        ("repositories.craftbukkit.dir", &config.repositories.craftbukkit.dir),
        ("repositories.builddata.dir", &config.repositories.builddata.dir),
        ("repositories.upstream_branch", &config.repositories.upstream_branch),
        ("patches.dir", &config.patches.dir),
        ("patches.patch_extension", &config.patches.patch_extension),
        ("patches.source_extension", &config.patches.source_extension),
        ("snapshot.tracked", &config.snapshot.tracked),
        ("snapshot.branch", &config.snapshot.branch),
        ("work.dir", &config.work.dir),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(name.to_string()));
        }
    }

    if config.mappings.tracked.is_empty() {
        return Err(ConfigError::MissingField("mappings.tracked".to_string()));
    }
    if config.mappings.history_depth == 0 {
        return Err(ConfigError::Invalid {
            field: "mappings.history_depth",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.patches.patch_extension == config.patches.source_extension {
        return Err(ConfigError::Invalid {
            field: "patches.patch_extension",
            reason: "must differ from patches.source_extension".to_string(),
        });
    }
    if config.snapshot.branch.contains(char::is_whitespace) {
        return Err(ConfigError::Invalid {
            field: "snapshot.branch",
            reason: format!("'{}' contains whitespace", config.snapshot.branch),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.minecraft.version, "1.8");
        assert_eq!(config.work.dir, "work");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[minecraft]
version = "1.8.3"

[mappings]
tracked = ["mappings/a.csrg", "mappings/b.srg"]
history_depth = 3

[patches]
dir = "patches"
source_prefix = "org/example"
fuzz = 1
max_offset = 200

[snapshot]
branch = "snap"
label = "Server"
restore = "snapshot"

[work]
dir = "cache"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.minecraft.version, "1.8.3");
        assert_eq!(config.mappings.tracked.len(), 2);
        assert_eq!(config.mappings.history_depth, 3);
        assert_eq!(config.patches.dir, "patches");
        assert_eq!(config.patches.max_offset, Some(200));
        assert_eq!(config.snapshot.branch, "snap");
        assert_eq!(config.work.dir, "cache");
    }

    #[test]
    fn empty_branch_errors() {
        let toml = r#"
[snapshot]
branch = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "snapshot.branch"));
    }

    #[test]
    fn branch_with_whitespace_errors() {
        let toml = r#"
[snapshot]
branch = "my branch"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_history_depth_errors() {
        let toml = r#"
[mappings]
history_depth = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn empty_tracked_mappings_errors() {
        let toml = r#"
[mappings]
tracked = []
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn same_extensions_error() {
        let toml = r#"
[patches]
patch_extension = "java"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path()).unwrap();
        assert_eq!(config.snapshot.branch, "patched");
    }

    #[test]
    fn present_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[snapshot]\nbranch = \"nightly\"\n",
        )
        .unwrap();
        let config = load_config_or_default(dir.path()).unwrap();
        assert_eq!(config.snapshot.branch, "nightly");
    }

    #[test]
    fn read_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { ref path, .. } if path.ends_with(CONFIG_FILE)));
    }
}
