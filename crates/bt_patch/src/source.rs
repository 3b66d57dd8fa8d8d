//! Line-oriented source files.

/// A text file as an ordered sequence of lines.
///
/// Lines are stored without their `\n` terminator. Whether the last line
/// was terminated is tracked separately so that parsing and rendering round
/// trip byte for byte. A `\r` before the `\n` stays part of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl SourceFile {
    /// Builds a file from lines and an explicit final-newline flag.
    pub fn new(lines: Vec<String>, trailing_newline: bool) -> Self {
        Self {
            lines,
            trailing_newline,
        }
    }

    /// Splits text into lines.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::new(Vec::new(), true);
        }
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let trailing_newline = text.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }
        Self::new(lines, trailing_newline)
    }

    /// Joins the lines back into text.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Returns the lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns `true` if the last line ends with a newline.
    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the file has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
