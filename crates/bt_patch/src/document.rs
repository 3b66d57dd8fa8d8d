//! Parsed unified-diff documents.
//!
//! A document covers one file: optional `---`/`+++` headers followed by one
//! or more `@@ -a,b +c,d @@` hunks. Anything before the first header (for
//! example `diff --git` or `index` lines) is ignored. Hunk bodies are read
//! strictly by their declared line counts, so removed lines that happen to
//! start with `--` are never mistaken for headers.

use crate::error::PatchError;

/// Marker line following a line that has no terminating newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// One line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Present on both sides.
    Context(String),
    /// Present only on the new side.
    Add(String),
    /// Present only on the old side.
    Remove(String),
}

impl HunkLine {
    /// Returns `true` for lines present on the old side.
    pub fn is_old(&self) -> bool {
        matches!(self, HunkLine::Context(_) | HunkLine::Remove(_))
    }

    /// Returns `true` for lines present on the new side.
    pub fn is_new(&self) -> bool {
        matches!(self, HunkLine::Context(_) | HunkLine::Add(_))
    }

    /// Returns the line text without its marker.
    pub fn text(&self) -> &str {
        match self {
            HunkLine::Context(s) | HunkLine::Add(s) | HunkLine::Remove(s) => s,
        }
    }
}

/// One contiguous change region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Old-side start line as declared in the header (1-based; 0 for an
    /// insertion at the top of the file).
    pub old_start: usize,
    /// Number of old-side lines.
    pub old_len: usize,
    /// New-side start line as declared in the header.
    pub new_start: usize,
    /// Number of new-side lines.
    pub new_len: usize,
    /// Body lines in order.
    pub lines: Vec<HunkLine>,
    /// The last old-side line has no trailing newline.
    pub old_missing_newline: bool,
    /// The last new-side line has no trailing newline.
    pub new_missing_newline: bool,
}

impl Hunk {
    /// Returns the old-side lines in order.
    pub fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter(|l| l.is_old()).map(HunkLine::text)
    }

    /// Returns the new-side lines in order.
    pub fn new_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter(|l| l.is_new()).map(HunkLine::text)
    }

    /// Number of context lines before the first change.
    pub fn leading_context(&self) -> usize {
        self.lines
            .iter()
            .take_while(|l| matches!(l, HunkLine::Context(_)))
            .count()
    }

    /// Number of context lines after the last change.
    pub fn trailing_context(&self) -> usize {
        self.lines
            .iter()
            .rev()
            .take_while(|l| matches!(l, HunkLine::Context(_)))
            .count()
    }
}

/// A parsed unified diff for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDocument {
    /// Path from the `---` header, without any timestamp.
    pub old_path: Option<String>,
    /// Path from the `+++` header, without any timestamp.
    pub new_path: Option<String>,
    /// Hunks in document order.
    pub hunks: Vec<Hunk>,
}

impl PatchDocument {
    /// Returns the file the patch targets: the new-side path, or the
    /// old-side path when the new side is absent.
    pub fn target(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }

    /// Parses unified-diff text.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        Parser::new(text).parse()
    }
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let mut lines: Vec<&str> = text.split('\n').collect();
        if text.ends_with('\n') {
            lines.pop();
        }
        Self { lines, pos: 0 }
    }

    /// 1-based number of the line at `pos`.
    fn line_no(&self) -> usize {
        self.pos + 1
    }

    fn parse(mut self) -> Result<PatchDocument, PatchError> {
        let mut doc = PatchDocument {
            old_path: None,
            new_path: None,
            hunks: Vec::new(),
        };

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.starts_with("@@") {
                let hunk = self.parse_hunk()?;
                doc.hunks.push(hunk);
                continue;
            }
            if let Some(path) = line.strip_prefix("--- ") {
                if !doc.hunks.is_empty() {
                    return Err(PatchError::malformed(
                        self.line_no(),
                        "a second file header follows the hunks; one document covers one file",
                    ));
                }
                doc.old_path = Some(header_path(path));
            } else if let Some(path) = line.strip_prefix("+++ ") {
                doc.new_path = Some(header_path(path));
            } else if !doc.hunks.is_empty() && !line.trim().is_empty() {
                return Err(PatchError::malformed(
                    self.line_no(),
                    format!("unexpected line between hunks: {line:?}"),
                ));
            }
            self.pos += 1;
        }

        if doc.hunks.is_empty() {
            return Err(PatchError::malformed(
                self.lines.len().max(1),
                "no hunks found",
            ));
        }
        Ok(doc)
    }

    fn parse_hunk(&mut self) -> Result<Hunk, PatchError> {
        let header_line = self.line_no();
        let (old_start, old_len, new_start, new_len) =
            parse_hunk_header(self.lines[self.pos]).map_err(|r| PatchError::malformed(header_line, r))?;
        self.pos += 1;

        let mut hunk = Hunk {
            old_start,
            old_len,
            new_start,
            new_len,
            lines: Vec::new(),
            old_missing_newline: false,
            new_missing_newline: false,
        };

        let (mut old_left, mut new_left) = (old_len, new_len);
        while old_left > 0 || new_left > 0 {
            let Some(&raw) = self.lines.get(self.pos) else {
                return Err(PatchError::malformed(
                    self.line_no(),
                    format!(
                        "hunk at line {header_line} is truncated: {old_left} old and {new_left} new lines missing"
                    ),
                ));
            };

            if raw.starts_with('\\') {
                self.apply_marker(&mut hunk)?;
                continue;
            }

            let line = match raw.chars().next() {
                Some(' ') => HunkLine::Context(raw[1..].to_string()),
                Some('+') => HunkLine::Add(raw[1..].to_string()),
                Some('-') => HunkLine::Remove(raw[1..].to_string()),
                // Some tools strip the leading space of blank context lines.
                None => HunkLine::Context(String::new()),
                Some(_) => {
                    return Err(PatchError::malformed(
                        self.line_no(),
                        format!("unexpected line in hunk body: {raw:?}"),
                    ))
                }
            };

            if line.is_old() {
                old_left = old_left.checked_sub(1).ok_or_else(|| {
                    PatchError::malformed(self.line_no(), "more old-side lines than the header declares")
                })?;
            }
            if line.is_new() {
                new_left = new_left.checked_sub(1).ok_or_else(|| {
                    PatchError::malformed(self.line_no(), "more new-side lines than the header declares")
                })?;
            }
            hunk.lines.push(line);
            self.pos += 1;
        }

        // A marker for the hunk's final line follows once the counts are exhausted.
        if self
            .lines
            .get(self.pos)
            .is_some_and(|l| l.starts_with('\\'))
        {
            self.apply_marker(&mut hunk)?;
        }
        Ok(hunk)
    }

    fn apply_marker(&mut self, hunk: &mut Hunk) -> Result<(), PatchError> {
        match hunk.lines.last() {
            Some(HunkLine::Context(_)) => {
                hunk.old_missing_newline = true;
                hunk.new_missing_newline = true;
            }
            Some(HunkLine::Remove(_)) => hunk.old_missing_newline = true,
            Some(HunkLine::Add(_)) => hunk.new_missing_newline = true,
            None => {
                return Err(PatchError::malformed(
                    self.line_no(),
                    "no-newline marker before any hunk line",
                ))
            }
        }
        self.pos += 1;
        Ok(())
    }
}

/// Strips a trailing tab-separated timestamp from a header path.
fn header_path(raw: &str) -> String {
    raw.split('\t').next().unwrap_or(raw).trim_end().to_string()
}

/// Parses `@@ -a[,b] +c[,d] @@[ section]`.
fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize), String> {
    let rest = line
        .strip_prefix("@@ ")
        .ok_or_else(|| format!("invalid hunk header {line:?}"))?;
    let end = rest
        .find(" @@")
        .ok_or_else(|| format!("hunk header missing '@@' terminator: {line:?}"))?;
    let mut ranges = rest[..end].split_whitespace();

    let old = ranges
        .next()
        .and_then(|r| r.strip_prefix('-'))
        .ok_or_else(|| format!("hunk header missing old range: {line:?}"))?;
    let new = ranges
        .next()
        .and_then(|r| r.strip_prefix('+'))
        .ok_or_else(|| format!("hunk header missing new range: {line:?}"))?;
    if ranges.next().is_some() {
        return Err(format!("hunk header has extra ranges: {line:?}"));
    }

    let (old_start, old_len) = parse_range(old)?;
    let (new_start, new_len) = parse_range(new)?;
    Ok((old_start, old_len, new_start, new_len))
}

/// Parses `start[,len]`; an omitted length means one line.
///
/// Numbers must fit in an `isize` so positions and offsets stay signed-safe.
fn parse_range(range: &str) -> Result<(usize, usize), String> {
    let number = |s: &str| {
        s.parse::<usize>()
            .ok()
            .filter(|&n| isize::try_from(n).is_ok())
            .ok_or_else(|| format!("invalid number {s:?} in hunk range"))
    };
    match range.split_once(',') {
        Some((start, len)) => Ok((number(start)?, number(len)?)),
        None => Ok((number(range)?, 1)),
    }
}
