//! Lexer
//!
//!     This module orchestrates the tokenization pipeline. Both consumers get their tokens
//!     from here: playback replays one queue for the whole document, the analyzer replays
//!     one sequence per source line.
//!
//! The Lexing Pipeline
//!
//!     1. Comment scanning. See [comments](comments). Comment ranges are masked, not
//!        deleted, so locations keep pointing into the original text.
//!
//!     2. Primitive scanning. See [base_tokenization](base_tokenization). Raw logos tokens
//!        are split into graphemes and classified as escapes, style markers, tag brackets,
//!        tag content or plain characters.
//!
//!     3. Tag assembly. See [tag_assembly](tag_assembly). Bracket spans become one tag
//!        each, unterminated spans are closed at the end of the input.
//!
//!     4. Style resolution. See [style_resolution](style_resolution). Markers are removed
//!        and the active style set is stamped on every display token.
//!
//! Partition
//!
//!     Every character of the source ends up in exactly one place: a comment, a consumed
//!     line break, a style marker, an escape (folded into the following token's range),
//!     a tag token or a display token. Token ranges never overlap and appear in source
//!     order.

pub mod base_tokenization;
pub mod comments;
pub mod style_resolution;
pub mod tag_assembly;

use crate::tw::config::MarkupSyntax;
use crate::tw::location::SourceLocation;
use crate::tw::token::Token;
use comments::{find_comments, Comment, CommentMask};
use style_resolution::StyleResolver;

pub use base_tokenization::{Primitive, PrimitiveKind};
pub use tag_assembly::{Piece, PieceKind};

/// Tokenize a whole document into the queue replayed by playback.
pub fn tokenize(source: &str, syntax: &MarkupSyntax) -> Vec<Token> {
    let location = SourceLocation::new(source);
    let comments = find_comments(source);
    let primitives = base_tokenization::scan(
        source,
        0..source.len(),
        syntax,
        CommentMask::new(&comments),
    );
    let pieces = tag_assembly::assemble(primitives);
    let mut tokens = StyleResolver::new().resolve(pieces, &location);
    number(&mut tokens, 0);
    tracing::trace!(count = tokens.len(), "tokenized document");
    tokens
}

/// Tokenize a document line by line. Tags never span lines here: a tag left open at the
/// end of a line is closed there. Style toggles and comments do carry across lines.
pub fn tokenize_lines(
    location: &SourceLocation,
    comments: &[Comment],
    syntax: &MarkupSyntax,
) -> Vec<Vec<Token>> {
    let source = location.source();
    let mask = CommentMask::new(comments);
    let mut resolver = StyleResolver::new();
    let mut next_index = 0;

    (0..location.line_count())
        .map(|line| {
            let window = location.line_window(line).unwrap_or(0..0);
            let primitives = base_tokenization::scan(source, window, syntax, mask);
            let pieces = tag_assembly::assemble(primitives);
            let mut tokens = resolver.resolve(pieces, location);
            number(&mut tokens, next_index);
            next_index += tokens.len();
            tokens
        })
        .collect()
}

fn number(tokens: &mut [Token], start: usize) {
    for (offset, token) in tokens.iter_mut().enumerate() {
        token.index = start + offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::location::Position;
    use crate::tw::testing::summarize;
    use crate::tw::token::TokenKind;

    #[test]
    fn test_tokenize_resolves_every_stage() {
        let tokens = tokenize(r"*a*[sleep 20]/\[/{{# note #}}", &MarkupSyntax::default());
        assert_eq!(
            summarize(&tokens),
            vec![
                r#"Display("a", bold)"#,
                r#"Tag(sleep ["20"])"#,
                r#"Display("[", italic)"#,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers_queue() {
        let tokens = tokenize("ab[sleep]c", &MarkupSyntax::default());
        let indices: Vec<usize> = tokens.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_tokenize_joins_lines() {
        // Line breaks are dropped, not turned into spaces; a tag may span them in playback
        let tokens = tokenize("a\n[sleep \n20]b", &MarkupSyntax::default());
        assert_eq!(tokens.len(), 3);
        let tag = tokens[1].as_tag().unwrap();
        assert_eq!(tag.name, "sleep");
        assert_eq!(tag.args, vec!["20"]);
    }

    #[test]
    fn test_locations_point_into_source() {
        let tokens = tokenize("{{# c #}}x\n *y", &MarkupSyntax::default());
        assert_eq!(tokens[0].location.start, Position::new(0, 9));
        assert_eq!(tokens[1].location.start, Position::new(1, 0));
        assert_eq!(tokens[2].location.start, Position::new(1, 2));
        assert!(matches!(
            tokens[2].kind,
            TokenKind::Display { ref text, .. } if text == "y"
        ));
    }

    #[test]
    fn test_tokenize_lines_closes_tags_per_line() {
        let source = "a[sleep\n20]b";
        let location = SourceLocation::new(source);
        let comments = find_comments(source);
        let lines = tokenize_lines(&location, &comments, &MarkupSyntax::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert!(!lines[0][1].as_tag().unwrap().closed);
        // "20]b" on its own line is plain text with a stray bracket
        let text: String = lines[1].iter().filter_map(|t| t.text()).collect();
        assert_eq!(text, "20]b");
        assert_eq!(lines[1][0].index, 2);
    }

    #[test]
    fn test_tokenize_lines_masks_multiline_comments() {
        let source = "a{{# one\ntwo #}}b\nc";
        let location = SourceLocation::new(source);
        let comments = find_comments(source);
        let lines = tokenize_lines(&location, &comments, &MarkupSyntax::default());
        let texts: Vec<String> = lines
            .iter()
            .map(|line| line.iter().filter_map(|t| t.text()).collect())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
