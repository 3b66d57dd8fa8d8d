//! External collaborators of the build pipeline.
//!
//! This crate wraps everything that leaves the process: spawning tools
//! ([`SystemRunner`]), unpacking archives ([`extract`]) and fetching files
//! over HTTP ([`download`]). Callers depend on the [`CommandRunner`] trait so
//! that version-control and compiler steps can be driven by any runner.

#![warn(missing_docs)]

pub mod archive;
pub mod download;
pub mod error;
pub mod process;

pub use archive::{extract, AllEntries, EntryFilter, PrefixFilter};
pub use download::{download, sha256_file};
pub use error::ExecError;
pub use process::{CommandOutput, CommandRunner, ExternalCommand, SystemRunner};
