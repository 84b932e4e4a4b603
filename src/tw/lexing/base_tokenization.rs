//! Primitive scanning
//!
//!     Turns raw logos tokens into grapheme-level primitives. This is the only stage that
//!     knows about the configured markup characters.
//!
//!     Rules, in order of precedence:
//!         1. Characters inside a comment block are skipped.
//!         2. Line breaks are consumed; reveal line breaks only come from tags.
//!         3. The grapheme after an escape character is literal. The escape itself is
//!            folded into the primitive's byte range. Inside a tag the literal becomes
//!            tag content, which is how `]` can appear in an argument.
//!         4. `[` opens a tag span and `]` closes it. Everything in between is tag content,
//!            including style markers and further `[`.
//!         5. Outside a tag, the four style markers toggle styles.
//!         6. Everything else is a plain character.
//!
//!     A stray `]` outside a tag is a plain character. An escape at the very end of the
//!     input has nothing to apply to and is dropped.

use super::comments::CommentMask;
use crate::tw::config::MarkupSyntax;
use crate::tw::token::core::{tokenize as raw_tokenize, RawToken};
use crate::tw::token::Style;
use std::ops::Range as ByteRange;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// A plain display grapheme
    Char(String),
    /// A grapheme made literal by the escape character
    Escaped(String),
    /// A style toggle marker
    Marker(Style),
    TagOpen,
    /// A grapheme of tag content
    TagText(String),
    TagClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub span: ByteRange<usize>,
}

/// Scan `source[window]` into primitives. Byte ranges are absolute offsets into `source`.
pub fn scan(
    source: &str,
    window: ByteRange<usize>,
    syntax: &MarkupSyntax,
    mask: CommentMask<'_>,
) -> Vec<Primitive> {
    let mut scanner = Scanner {
        syntax,
        mask,
        inside_tag: false,
        pending_escape: None,
        output: Vec::new(),
    };
    let text = &source[window.clone()];

    for (raw, span) in raw_tokenize(text) {
        let start = window.start + span.start;
        let end = window.start + span.end;
        match raw {
            RawToken::LineBreak => {}
            RawToken::OpenBracket | RawToken::CloseBracket => {
                scanner.unit(&source[start..end], start..end, Some(raw))
            }
            RawToken::Text => {
                for (offset, grapheme) in source[start..end].grapheme_indices(true) {
                    let g_start = start + offset;
                    scanner.unit(grapheme, g_start..g_start + grapheme.len(), None);
                }
            }
        }
    }

    scanner.output
}

struct Scanner<'a> {
    syntax: &'a MarkupSyntax,
    mask: CommentMask<'a>,
    inside_tag: bool,
    pending_escape: Option<usize>,
    output: Vec<Primitive>,
}

impl Scanner<'_> {
    fn unit(&mut self, grapheme: &str, span: ByteRange<usize>, bracket: Option<RawToken>) {
        if self.mask.covers(span.start) {
            return;
        }

        if let Some(escape_start) = self.pending_escape.take() {
            let kind = if self.inside_tag {
                PrimitiveKind::TagText(grapheme.to_string())
            } else {
                PrimitiveKind::Escaped(grapheme.to_string())
            };
            self.push(kind, escape_start..span.end);
            return;
        }

        if is_char(grapheme, self.syntax.escape) {
            self.pending_escape = Some(span.start);
            return;
        }

        let kind = match bracket {
            Some(RawToken::OpenBracket) if !self.inside_tag => {
                self.inside_tag = true;
                PrimitiveKind::TagOpen
            }
            Some(RawToken::CloseBracket) if self.inside_tag => {
                self.inside_tag = false;
                PrimitiveKind::TagClose
            }
            _ if self.inside_tag => PrimitiveKind::TagText(grapheme.to_string()),
            _ => match self.marker(grapheme) {
                Some(style) if bracket.is_none() => PrimitiveKind::Marker(style),
                _ => PrimitiveKind::Char(grapheme.to_string()),
            },
        };
        self.push(kind, span);
    }

    fn marker(&self, grapheme: &str) -> Option<Style> {
        let syntax = self.syntax;
        [
            (syntax.italic, Style::Italic),
            (syntax.bold, Style::Bold),
            (syntax.underline, Style::Underline),
            (syntax.strikethrough, Style::Strikethrough),
        ]
        .into_iter()
        .find(|(marker, _)| is_char(grapheme, *marker))
        .map(|(_, style)| style)
    }

    fn push(&mut self, kind: PrimitiveKind, span: ByteRange<usize>) {
        self.output.push(Primitive { kind, span });
    }
}

fn is_char(grapheme: &str, c: char) -> bool {
    let mut chars = grapheme.chars();
    chars.next() == Some(c) && chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::lexing::comments::find_comments;

    fn scan_all(source: &str) -> Vec<PrimitiveKind> {
        let comments = find_comments(source);
        scan(
            source,
            0..source.len(),
            &MarkupSyntax::default(),
            CommentMask::new(&comments),
        )
        .into_iter()
        .map(|p| p.kind)
        .collect()
    }

    fn ch(s: &str) -> PrimitiveKind {
        PrimitiveKind::Char(s.to_string())
    }

    fn tt(s: &str) -> PrimitiveKind {
        PrimitiveKind::TagText(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(scan_all("ab"), vec![ch("a"), ch("b")]);
    }

    #[test]
    fn test_markers_outside_tags_only() {
        assert_eq!(
            scan_all("*a[*]"),
            vec![
                PrimitiveKind::Marker(Style::Bold),
                ch("a"),
                PrimitiveKind::TagOpen,
                tt("*"),
                PrimitiveKind::TagClose,
            ]
        );
    }

    #[test]
    fn test_escape_folds_into_span() {
        let source = r"\[x";
        let prims = scan(
            source,
            0..source.len(),
            &MarkupSyntax::default(),
            CommentMask::none(),
        );
        assert_eq!(prims[0].kind, PrimitiveKind::Escaped("[".to_string()));
        assert_eq!(prims[0].span, 0..2);
        assert_eq!(prims[1].kind, ch("x"));
    }

    #[test]
    fn test_escape_inside_tag_is_content() {
        assert_eq!(
            scan_all(r"[a\]b]"),
            vec![
                PrimitiveKind::TagOpen,
                tt("a"),
                tt("]"),
                tt("b"),
                PrimitiveKind::TagClose,
            ]
        );
    }

    #[test]
    fn test_stray_close_bracket_is_plain() {
        assert_eq!(scan_all("a]"), vec![ch("a"), ch("]")]);
    }

    #[test]
    fn test_open_bracket_inside_tag_is_content() {
        assert_eq!(
            scan_all("[a[b]"),
            vec![
                PrimitiveKind::TagOpen,
                tt("a"),
                tt("["),
                tt("b"),
                PrimitiveKind::TagClose,
            ]
        );
    }

    #[test]
    fn test_line_breaks_and_comments_are_skipped() {
        assert_eq!(scan_all("a\n{{# *[x] #}}b"), vec![ch("a"), ch("b")]);
    }

    #[test]
    fn test_trailing_escape_is_dropped() {
        assert_eq!(scan_all("a\\"), vec![ch("a")]);
    }

    #[test]
    fn test_escape_applies_across_line_break() {
        assert_eq!(
            scan_all("\\\n*"),
            vec![PrimitiveKind::Escaped("*".to_string())]
        );
    }

    #[test]
    fn test_graphemes_stay_whole() {
        assert_eq!(scan_all("e\u{301}x"), vec![ch("e\u{301}"), ch("x")]);
    }

    #[test]
    fn test_window_offsets_are_absolute() {
        let source = "ab\ncd";
        let prims = scan(source, 3..5, &MarkupSyntax::default(), CommentMask::none());
        assert_eq!(prims[0].span, 3..4);
        assert_eq!(prims[1].span, 4..5);
    }
}
