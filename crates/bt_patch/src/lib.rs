//! Unified-diff parsing, application and generation.
//!
//! [`PatchDocument::parse`] turns one unified diff into ordered hunks;
//! [`PatchEngine::apply`] replays them onto a [`SourceFile`] with GNU-patch
//! style offset search and context fuzz; [`PatchPipeline`] applies a whole
//! directory of patches onto a clean tree. [`unified_diff`] produces the
//! diffs in the first place.

#![warn(missing_docs)]

pub mod diff;
pub mod document;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod source;

pub use diff::unified_diff;
pub use document::{Hunk, HunkLine, PatchDocument};
pub use engine::{Applied, HunkPlacement, PatchEngine, PatchOptions};
pub use error::{PatchError, PipelineError};
pub use pipeline::{PatchNaming, PatchPipeline, PatchedFile, PipelineReport};
pub use source::SourceFile;
