use serde::{Deserialize, Serialize};
use std::fmt;

/// Region of source text, 1-based lines and columns. Zero-width spans mark
/// a single position (end of input, insertion points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A zero-width span at one position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// Start position as a `(line, col)` pair. Orders lexicographically,
    /// which is source order.
    pub fn start(self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    /// End position as a `(line, col)` pair.
    pub fn end(self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) = self.start().min(other.start());
        let (end_line, end_col) = self.end().max(other.end());
        Span::new(start_line, start_col, end_line, end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A named script plus its text, with per-line access for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0];
        for (offset, _) in source.match_indices('\n') {
            line_starts.push(offset + 1);
        }
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// One source line by 1-based number, without its terminator. `None`
    /// when the number is out of range.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let rest = &self.source[start..];
        let line = match rest.find('\n') {
            Some(newline) => &rest[..newline],
            None => rest,
        };
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// The line a span starts on, for diagnostic context. Empty when the
    /// span is out of range.
    pub fn snippet(&self, span: Span) -> &str {
        self.line(span.start_line).unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_point_is_zero_width() {
        let s = Span::point(3, 7);
        assert_eq!(s.start(), (3, 7));
        assert_eq!(s.end(), (3, 7));
    }

    #[test]
    fn span_merge_across_lines() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(2, 3, 2, 8);
        assert_eq!(a.merge(b), Span::new(1, 5, 2, 8));
        assert_eq!(b.merge(a), Span::new(1, 5, 2, 8));
    }

    #[test]
    fn span_merge_same_line() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(1, 3, 1, 8);
        assert_eq!(a.merge(b), Span::new(1, 3, 1, 10));
    }

    #[test]
    fn span_display_is_line_colon_col() {
        assert_eq!(format!("{}", Span::new(3, 7, 3, 15)), "3:7");
    }

    #[test]
    fn source_file_line_extraction() {
        let src = SourceFile::new("test.quill", "print 1;\nprint 2;\nprint 3;");
        assert_eq!(src.line(1), Some("print 1;"));
        assert_eq!(src.line(2), Some("print 2;"));
        assert_eq!(src.line(3), Some("print 3;"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn source_file_handles_crlf() {
        let src = SourceFile::new("test.quill", "var a;\r\nvar b;\r\n");
        assert_eq!(src.line(1), Some("var a;"));
        assert_eq!(src.line(2), Some("var b;"));
    }

    #[test]
    fn source_file_empty() {
        let src = SourceFile::new("test.quill", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }

    #[test]
    fn snippet_takes_the_starting_line() {
        let src = SourceFile::new("test.quill", "var s = \"open\nstill open");
        assert_eq!(src.snippet(Span::new(1, 9, 2, 10)), "var s = \"open");
        assert_eq!(src.snippet(Span::point(99, 1)), "");
    }
}
