//! Mapping character offsets back to human-readable lines for diagnostics.

use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// The text a set of commands was parsed from.
///
/// Offsets are counted in `char`s from the start of the text. A line ends at
/// `\n`, `\r`, or `\r\n`.
#[derive(Clone, Debug)]
pub struct Source {
    name: Option<String>,
    text: String,
    line_starts: Vec<usize>,
    len: usize,
}

/// A resolved position inside a [`Source`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub name: Option<String>,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in grapheme clusters.
    pub column: usize,
    /// Offset of the first character of the line.
    pub line_start: usize,
    /// The full line, always terminated by a line break.
    pub line_text: String,
}

impl Source {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        let mut len = 0;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            len += 1;
            match c {
                '\n' => line_starts.push(len),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                        len += 1;
                    }
                    line_starts.push(len);
                }
                _ => {}
            }
        }

        Source {
            name: None,
            text,
            line_starts,
            len,
        }
    }

    /// Attach a name (usually a file path) used when printing locations.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters in the source.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The 1-based line containing `offset`. Offsets past the end belong to the
    /// last line.
    pub fn line_number(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// The offset of the first character of the line containing `offset`.
    pub fn line_beginning(&self, offset: usize) -> usize {
        self.line_starts[self.line_number(offset) - 1]
    }

    /// The text of the line containing `offset`, including its terminator. A
    /// final line without one gets a `\n` appended.
    pub fn text_line(&self, offset: usize) -> String {
        let line = self.line_number(offset);
        let start = self.line_starts[line - 1];
        let end = self.line_starts.get(line).copied().unwrap_or(self.len);
        let mut s = self.slice(start, end).to_string();
        if !s.ends_with('\n') && !s.ends_with('\r') {
            s.push('\n');
        }
        s
    }

    /// The 1-based column of `offset` within its line.
    pub fn column(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        let start = self.line_beginning(offset);
        self.slice(start, offset).graphemes(true).count() + 1
    }

    pub fn locate(&self, offset: usize) -> Location {
        Location {
            name: self.name.clone(),
            line: self.line_number(offset),
            column: self.column(offset),
            line_start: self.line_beginning(offset),
            line_text: self.text_line(offset),
        }
    }

    fn byte_index(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map(|(ix, _)| ix)
            .unwrap_or(self.text.len())
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[self.byte_index(start)..self.byte_index(end)]
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}:", name)?;
        }
        write!(f, "{}:{}", self.line, self.column)
    }
}
