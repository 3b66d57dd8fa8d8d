//! Hunk application with offset search and context fuzz.
//!
//! Hunks are applied in document order. Each hunk is first looked for at its
//! declared position, shifted by the offset at which the previous hunk
//! applied; if its old-side lines are not there, positions at increasing
//! distance are tried, lower lines first on a tie. When no position matches,
//! up to `fuzz` leading and trailing context lines are ignored and the
//! search repeats. A hunk never matches before the end of the previous one.

use crate::document::{Hunk, HunkLine, PatchDocument};
use crate::error::PatchError;
use crate::source::SourceFile;

/// Tolerances for [`PatchEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Maximum number of context lines ignored at each end of a hunk.
    pub fuzz: usize,

    /// Maximum distance, in lines, from the expected position. `None`
    /// searches the whole file.
    pub max_offset: Option<usize>,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            fuzz: 2,
            max_offset: None,
        }
    }
}

/// Where a hunk ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkPlacement {
    /// 1-based index of the hunk within its document.
    pub hunk: usize,
    /// Old-side start line from the hunk header.
    pub declared_line: usize,
    /// 1-based line in the original file where the matched lines begin.
    pub line: usize,
    /// Distance from the declared position.
    pub offset: isize,
    /// Number of context lines ignored at each end.
    pub fuzz: usize,
}

/// A successfully patched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The patched content.
    pub file: SourceFile,
    /// One placement per hunk, in order.
    pub placements: Vec<HunkPlacement>,
}

impl Applied {
    /// Largest fuzz used by any hunk.
    pub fn max_fuzz(&self) -> usize {
        self.placements.iter().map(|p| p.fuzz).max().unwrap_or(0)
    }

    /// Returns `true` if every hunk applied at its declared line without fuzz.
    pub fn is_exact(&self) -> bool {
        self.placements.iter().all(|p| p.offset == 0 && p.fuzz == 0)
    }
}

/// Applies parsed patches to source files.
///
/// Application is pure: the same source, document and options always give
/// the same result.
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    options: PatchOptions,
}

struct Found {
    pos: usize,
    lead: usize,
    trail: usize,
    offset: isize,
    fuzz: usize,
}

impl PatchEngine {
    /// Creates an engine with the given tolerances.
    pub fn new(options: PatchOptions) -> Self {
        Self { options }
    }

    /// Returns the engine's tolerances.
    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Applies every hunk of `doc` to `source`.
    ///
    /// Fails with [`PatchError::Conflict`] naming the first hunk that cannot
    /// be placed; nothing is partially applied.
    pub fn apply(&self, source: &SourceFile, doc: &PatchDocument) -> Result<Applied, PatchError> {
        let lines = source.lines();
        let mut out: Vec<String> = Vec::with_capacity(lines.len());
        let mut placements = Vec::with_capacity(doc.hunks.len());
        let mut trailing_newline = source.has_trailing_newline();
        let mut cursor = 0;
        let mut drift = 0;

        for (index, hunk) in doc.hunks.iter().enumerate() {
            let number = index + 1;
            let found = self
                .locate(lines, hunk, cursor, drift)
                .ok_or_else(|| PatchError::Conflict {
                    hunk: number,
                    declared_line: hunk.old_start,
                    reason: self.conflict_reason(lines, hunk, cursor),
                })?;

            out.extend_from_slice(&lines[cursor..found.pos]);
            let mut pos = found.pos;
            for line in &hunk.lines[found.lead..hunk.lines.len() - found.trail] {
                match line {
                    HunkLine::Context(_) => {
                        out.push(lines[pos].clone());
                        pos += 1;
                    }
                    HunkLine::Remove(_) => pos += 1,
                    HunkLine::Add(text) => out.push(text.clone()),
                }
            }
            cursor = pos;

            if cursor == lines.len() {
                if hunk.new_missing_newline {
                    trailing_newline = false;
                } else if hunk.old_missing_newline {
                    trailing_newline = true;
                }
            }

            if found.offset != 0 || found.fuzz != 0 {
                tracing::debug!(
                    hunk = number,
                    line = found.pos + 1,
                    offset = found.offset,
                    fuzz = found.fuzz,
                    "hunk applied away from its declared position"
                );
            }
            drift = found.offset;
            placements.push(HunkPlacement {
                hunk: number,
                declared_line: hunk.old_start,
                line: found.pos + 1,
                offset: found.offset,
                fuzz: found.fuzz,
            });
        }
        out.extend_from_slice(&lines[cursor..]);

        Ok(Applied {
            file: SourceFile::new(out, trailing_newline),
            placements,
        })
    }

    fn locate(&self, lines: &[String], hunk: &Hunk, min_pos: usize, drift: isize) -> Option<Found> {
        let leading = hunk.leading_context();
        let trailing = hunk.trailing_context();
        let has_old = hunk.lines.iter().any(HunkLine::is_old);
        // An insertion with no old lines anchors after its declared line.
        let base = if hunk.old_len == 0 {
            hunk.old_start
        } else {
            hunk.old_start.saturating_sub(1)
        };

        let mut previous = None;
        for fuzz in 0..=self.options.fuzz {
            let lead = fuzz.min(leading);
            let trail = fuzz.min(trailing);
            if previous == Some((lead, trail)) {
                continue;
            }
            previous = Some((lead, trail));

            let Some(end) = hunk.lines.len().checked_sub(trail).filter(|&end| end >= lead) else {
                continue;
            };
            let old: Vec<&str> = hunk.lines[lead..end]
                .iter()
                .filter(|l| l.is_old())
                .map(HunkLine::text)
                .collect();
            if old.is_empty() && has_old {
                continue;
            }

            let anchor = isize::try_from(base.saturating_add(lead)).unwrap_or(isize::MAX);
            if let Some(pos) = self.search(lines, &old, min_pos, anchor.saturating_add(drift)) {
                return Some(Found {
                    pos,
                    lead,
                    trail,
                    offset: pos as isize - anchor,
                    fuzz,
                });
            }
        }
        None
    }

    fn search(&self, lines: &[String], old: &[&str], min_pos: usize, expected: isize) -> Option<usize> {
        let last = lines.len().checked_sub(old.len())?;
        if min_pos > last {
            return None;
        }
        let (lo, hi) = (min_pos as isize, last as isize);
        let within = |pos: isize| self.options.max_offset.map_or(true, |m| pos.abs_diff(expected) <= m);
        let fits = |pos: isize| pos >= lo && pos <= hi && within(pos) && matches_at(lines, pos as usize, old);

        // Walk outward from the nearest in-range position; a declared line far
        // past the end of the file starts at the last candidate.
        let start = expected.clamp(lo, hi);
        let reach = (start - lo).max(hi - start);
        for d in 0..=reach {
            if fits(start - d) {
                return Some((start - d) as usize);
            }
            if d > 0 && fits(start + d) {
                return Some((start + d) as usize);
            }
        }
        None
    }

    fn conflict_reason(&self, lines: &[String], hunk: &Hunk, min_pos: usize) -> String {
        let needed = hunk.old_lines().count();
        let remaining = lines.len().saturating_sub(min_pos);
        if needed > remaining {
            return format!("hunk needs {needed} lines but only {remaining} remain after the previous hunk");
        }
        match self.options.max_offset {
            Some(max) => format!(
                "context not found within {max} lines of the expected position (fuzz {})",
                self.options.fuzz
            ),
            None => format!("context not found anywhere in the file (fuzz {})", self.options.fuzz),
        }
    }
}

fn matches_at(lines: &[String], pos: usize, old: &[&str]) -> bool {
    old.iter()
        .zip(&lines[pos..])
        .all(|(expected, actual)| same_line(expected, actual))
}

/// Line equality that ignores a trailing carriage return on either side.
fn same_line(a: &str, b: &str) -> bool {
    a.strip_suffix('\r').unwrap_or(a) == b.strip_suffix('\r').unwrap_or(b)
}
