//! Position and location tracking for source locations
//!
//! Tokens carry both the byte span of the source text they were produced from and the
//! line:column positions of that span. Columns count `char`s, not bytes, so that the
//! analysis arrays (one entry per character of the document) and positions agree.
//!
//! ## Types
//!
//! - [`Position`] - A line:column position in source text
//! - [`Range`] - A source range with start/end positions and byte span
//! - [`SourceLocation`] - Converts byte offsets to positions and character offsets
//!
//! The typical flow is:
//! 1. The scanner produces primitives paired with byte ranges
//! 2. Tag assembly merges byte ranges of bracket spans
//! 3. The pipeline converts byte ranges with [`SourceLocation::byte_range_to_range`]

use serde::Serialize;
use std::fmt;
use std::ops::Range as ByteRange;

/// A position in source text (0-based line, 0-based char column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A location in source text (start inclusive, end exclusive)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }

    /// Whether `pos` falls on a character covered by this range.
    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start && pos < self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Fast conversion from byte offsets to line/column positions and character offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    source: String,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
    /// Character offsets where each line starts
    line_char_starts: Vec<usize>,
    /// `(end byte, extra bytes so far)` for every multi-byte character
    wide_chars: Vec<(usize, usize)>,
    char_count: usize,
}

impl SourceLocation {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        let mut line_char_starts = vec![0];
        let mut wide_chars = Vec::new();
        let mut extra = 0;
        let mut char_count = 0;

        for (char_pos, (byte_pos, ch)) in source.char_indices().enumerate() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
                line_char_starts.push(char_pos + 1);
            }
            let width = ch.len_utf8();
            if width > 1 {
                extra += width - 1;
                wide_chars.push((byte_pos + width, extra));
            }
            char_count = char_pos + 1;
        }

        Self {
            source: source.to_string(),
            line_starts,
            line_char_starts,
            wide_chars,
            char_count,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Convert a byte offset to a line/column position
    pub fn byte_to_position(&self, byte_offset: usize) -> Position {
        let byte_offset = byte_offset.min(self.source.len());
        let line = self
            .line_starts
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i - 1);
        let column = self
            .byte_to_char_offset(byte_offset)
            .saturating_sub(self.line_char_starts[line]);

        Position::new(line, column)
    }

    pub fn byte_range_to_range(&self, range: &ByteRange<usize>) -> Range {
        Range::new(
            range.clone(),
            self.byte_to_position(range.start),
            self.byte_to_position(range.end),
        )
    }

    /// Character offset of a position, if the position lies inside the source.
    pub fn char_offset(&self, pos: Position) -> Option<usize> {
        let line_start = *self.line_char_starts.get(pos.line)?;
        let window = self.line_window(pos.line)?;
        let line_len = self.byte_to_char_offset(window.end) - line_start;
        (pos.column <= line_len).then_some(line_start + pos.column)
    }

    /// Character offset of a byte offset.
    pub fn byte_to_char_offset(&self, byte_offset: usize) -> usize {
        let byte_offset = byte_offset.min(self.source.len());
        let seen = self
            .wide_chars
            .partition_point(|&(end, _)| end <= byte_offset);
        let extra = seen
            .checked_sub(1)
            .map(|i| self.wide_chars[i].1)
            .unwrap_or(0);
        byte_offset - extra
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte window of a line, without its line terminator.
    pub fn line_window(&self, line: usize) -> Option<ByteRange<usize>> {
        let start = *self.line_starts.get(line)?;
        let mut end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        if end > start && self.source.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        Some(start..end)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.line_window(line).map(|window| &self.source[window])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(0, 9) < Position::new(1, 0));
        assert!(Position::new(2, 3) < Position::new(2, 4));
    }

    #[test]
    fn test_range_contains_is_end_exclusive() {
        let range = Range::new(0..3, Position::new(0, 0), Position::new(0, 3));
        assert!(range.contains(Position::new(0, 0)));
        assert!(range.contains(Position::new(0, 2)));
        assert!(!range.contains(Position::new(0, 3)));
        assert!(!range.contains(Position::new(1, 0)));
    }

    #[test]
    fn test_byte_to_position_counts_chars() {
        let loc = SourceLocation::new("héllo\nwörld");
        // 'l' after the two-byte 'é'
        assert_eq!(loc.byte_to_position(3), Position::new(0, 2));
        assert_eq!(loc.byte_to_position(7), Position::new(1, 0));
        assert_eq!(loc.byte_to_position(10), Position::new(1, 2));
    }

    #[test]
    fn test_char_offsets() {
        let loc = SourceLocation::new("ab\ncd");
        assert_eq!(loc.char_offset(Position::new(1, 1)), Some(4));
        assert_eq!(loc.char_offset(Position::new(1, 9)), None);
        assert_eq!(loc.char_offset(Position::new(5, 0)), None);
        assert_eq!(loc.byte_to_char_offset(4), 4);
        assert_eq!(loc.char_count(), 5);
    }

    #[test]
    fn test_char_offsets_after_wide_chars() {
        let loc = SourceLocation::new("é€x\nü");
        // é is two bytes, € is three
        assert_eq!(loc.byte_to_char_offset(5), 2);
        assert_eq!(loc.byte_to_char_offset(6), 3);
        assert_eq!(loc.byte_to_position(9), Position::new(1, 1));
        assert_eq!(loc.char_offset(Position::new(0, 3)), Some(3));
        assert_eq!(loc.char_offset(Position::new(0, 4)), None);
        assert_eq!(loc.char_count(), 5);
    }

    #[test]
    fn test_long_line_positions_match_char_count() {
        let line = "ab".repeat(50_000);
        let loc = SourceLocation::new(&line);
        let last = line.len() - 1;
        assert_eq!(loc.byte_to_position(last), Position::new(0, last));
        assert_eq!(loc.byte_to_char_offset(line.len()), 100_000);
    }

    #[test]
    fn test_line_windows_strip_terminators() {
        let loc = SourceLocation::new("one\r\ntwo\n");
        assert_eq!(loc.line_count(), 3);
        assert_eq!(loc.line_text(0), Some("one"));
        assert_eq!(loc.line_text(1), Some("two"));
        assert_eq!(loc.line_text(2), Some(""));
        assert_eq!(loc.line_text(3), None);
    }
}
