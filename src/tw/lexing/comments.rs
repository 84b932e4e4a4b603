//! Comment blocks
//!
//!     Grammar: `"{{#" any-character-including-newlines "#}}"`, shortest match, no nesting.
//!
//!     Comments are not removed from the source text. Instead their byte ranges are masked
//!     during scanning, which keeps every token's location pointing into the original
//!     document. A comment whose body starts with the word `timecalc` is a directive block;
//!     the analyzer reads it, playback ignores it like any other comment.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range as ByteRange;

static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{#(.*?)#\}\}").unwrap());

const DIRECTIVE_KEYWORD: &str = "timecalc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// The whole comment, delimiters included
    pub range: ByteRange<usize>,
    /// Text between the delimiters
    pub body: ByteRange<usize>,
}

impl Comment {
    /// Byte range of the directive body (after the `timecalc` keyword), if this comment
    /// is a directive block.
    pub fn directive_body(&self, source: &str) -> Option<ByteRange<usize>> {
        let body = &source[self.body.clone()];
        let rest = body.strip_prefix(DIRECTIVE_KEYWORD)?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let start = self.body.start + DIRECTIVE_KEYWORD.len();
            Some(start..self.body.end)
        } else {
            None
        }
    }
}

/// Find all comment blocks, in source order.
pub fn find_comments(source: &str) -> Vec<Comment> {
    COMMENT_REGEX
        .captures_iter(source)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let body = captures.get(1)?;
            Some(Comment {
                range: whole.range(),
                body: body.range(),
            })
        })
        .collect()
}

/// Answers whether a byte offset falls inside a comment.
#[derive(Debug, Clone, Copy)]
pub struct CommentMask<'a> {
    comments: &'a [Comment],
}

impl<'a> CommentMask<'a> {
    pub fn new(comments: &'a [Comment]) -> Self {
        Self { comments }
    }

    pub fn none() -> Self {
        Self { comments: &[] }
    }

    pub fn covers(&self, offset: usize) -> bool {
        let idx = self
            .comments
            .partition_point(|comment| comment.range.end <= offset);
        self.comments
            .get(idx)
            .map(|comment| comment.range.start <= offset)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_match() {
        let source = "a{{# one #}}b{{# two #}}c";
        let comments = find_comments(source);
        assert_eq!(comments.len(), 2);
        assert_eq!(&source[comments[0].range.clone()], "{{# one #}}");
        assert_eq!(&source[comments[1].body.clone()], " two ");
    }

    #[test]
    fn test_multiline_comment() {
        let source = "x{{# spans\nlines #}}y";
        let comments = find_comments(source);
        assert_eq!(comments[0].range, 1..20);
    }

    #[test]
    fn test_comments_do_not_nest() {
        let source = "{{# outer {{# inner #}} tail #}}";
        let comments = find_comments(source);
        assert_eq!(comments.len(), 1);
        assert_eq!(&source[comments[0].range.end..], " tail #}}");
    }

    #[test]
    fn test_unterminated_comment_is_text() {
        assert!(find_comments("{{# never closed").is_empty());
    }

    #[test]
    fn test_directive_detection() {
        let source = "{{#timecalc char: 5 #}}{{#timecalculator#}}{{# timecalc #}}";
        let comments = find_comments(source);
        let body = comments[0].directive_body(source).unwrap();
        assert_eq!(&source[body], " char: 5 ");
        assert!(comments[1].directive_body(source).is_none());
        // Keyword must follow the delimiter directly
        assert!(comments[2].directive_body(source).is_none());
    }

    #[test]
    fn test_mask() {
        let source = "ab{{#c#}}d";
        let comments = find_comments(source);
        let mask = CommentMask::new(&comments);
        assert!(!mask.covers(1));
        assert!(mask.covers(2));
        assert!(mask.covers(8));
        assert!(!mask.covers(9));
        assert!(!CommentMask::none().covers(0));
    }
}
