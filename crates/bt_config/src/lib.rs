//! Parsing and validation of `buildtools.toml` configuration files.
//!
//! This crate reads the optional configuration file from the work root and
//! produces a strongly-typed [`BuildToolsConfig`]. Every field has a default
//! matching the stock Bukkit/CraftBukkit/Spigot 1.8 layout, so a missing file
//! is a valid configuration. [`resolve_layout`] turns the relative settings
//! into absolute paths under a chosen root.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, load_config_or_default};
pub use resolve::{resolve_layout, ResolvedLayout};
pub use types::*;
