//! `buildtools diff`: authors patches from an edited copy of a clean tree.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bt_config::PatchesConfig;
use bt_patch::SourceFile;

use crate::context::Context;
use crate::{DiffArgs, GlobalArgs};

/// Writes one patch per changed source and prints where they went.
pub fn run(args: &DiffArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let Context { config, .. } = Context::load(global)?;
    let written = write_patches(&config.patches, &args.clean, &args.edited, &args.out, args.context)?;
    if !global.quiet {
        for patch in &written {
            println!("wrote {}", patch.display());
        }
        println!("{} patches", written.len());
    }
    Ok(0)
}

fn read_source(path: &Path) -> anyhow::Result<SourceFile> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(SourceFile::parse(&text))
}

/// Diffs every source directly under the source prefix of `edited` against
/// its counterpart in `clean`, writing a patch into `out` for each one that
/// differs. Returns the written patch paths in name order.
pub fn write_patches(
    patches: &PatchesConfig,
    clean: &Path,
    edited: &Path,
    out: &Path,
    context: usize,
) -> anyhow::Result<Vec<PathBuf>> {
    let prefix = patches.source_prefix.trim_matches('/');
    let in_prefix = |root: &Path| prefix.split('/').fold(root.to_path_buf(), |p, c| p.join(c));
    let (clean_dir, edited_dir) = (in_prefix(clean), in_prefix(edited));

    let mut written = Vec::new();
    for rel in bt_common::fs::list_files(&edited_dir)? {
        // Only direct children map back to a patch name.
        if rel.components().count() != 1
            || rel.extension().and_then(|e| e.to_str()) != Some(patches.source_extension.as_str())
        {
            continue;
        }
        let (Some(name), Some(stem)) = (
            rel.file_name().and_then(|n| n.to_str()),
            rel.file_stem().and_then(|s| s.to_str()),
        ) else {
            continue;
        };

        let clean_file = clean_dir.join(name);
        if !clean_file.is_file() {
            tracing::warn!("{name} has no clean counterpart, skipping");
            continue;
        }
        let old = read_source(&clean_file)?;
        let new = read_source(&edited_dir.join(name))?;
        let Some(diff) = bt_patch::unified_diff(
            &old,
            &new,
            &format!("a/{prefix}/{name}"),
            &format!("b/{prefix}/{name}"),
            context,
        ) else {
            continue;
        };

        let patch = out.join(format!("{stem}.{}", patches.patch_extension));
        bt_common::fs::write_atomic(&patch, diff.as_bytes())?;
        tracing::debug!(patch = %patch.display(), "wrote patch");
        written.push(patch);
    }
    Ok(written)
}
