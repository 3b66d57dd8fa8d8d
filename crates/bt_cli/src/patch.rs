//! `buildtools patch`: applies a patch directory without the rest of the
//! pipeline.

use anyhow::Context as _;

use crate::context::{self, Context};
use crate::{GlobalArgs, PatchArgs};

/// Applies `--patches` onto `--clean`, writing under `--target`.
///
/// The target receives one file per patch, and nothing at all when any patch
/// fails.
pub fn run(args: &PatchArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let Context { config, .. } = Context::load(global)?;
    let pipeline = context::patch_pipeline(&config, args.fuzz, args.max_offset);

    let report = pipeline
        .run(&args.patches, &args.clean, &args.target)
        .with_context(|| format!("failed to patch {}", args.clean.display()))?;

    if !global.quiet {
        for file in &report.files {
            let mut notes = Vec::new();
            if file.offset_hunks > 0 {
                notes.push(format!("{} offset", file.offset_hunks));
            }
            if file.max_fuzz > 0 {
                notes.push(format!("fuzz {}", file.max_fuzz));
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            };
            println!("patched {}{notes}", file.target.display());
        }
        println!(
            "{} files, {} hunks, {} fuzzed",
            report.files.len(),
            report.hunks(),
            report.fuzzed().count()
        );
    }
    Ok(0)
}
