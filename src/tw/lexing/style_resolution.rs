//! Style resolution
//!
//!     A single left-to-right pass that keeps the four style toggles, stamps the active set
//!     onto every display token and drops the markers. Tags pass through untouched.
//!
//!     The resolver is a value rather than a function so that a caller scanning a document
//!     line by line can carry the toggles from one line into the next.

use super::tag_assembly::{Piece, PieceKind};
use crate::tw::location::SourceLocation;
use crate::tw::token::{StyleSet, Token};

#[derive(Debug, Clone, Default)]
pub struct StyleResolver {
    active: StyleSet,
}

impl StyleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> StyleSet {
        self.active
    }

    pub fn resolve(&mut self, pieces: Vec<Piece>, location: &SourceLocation) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(pieces.len());
        for Piece { kind, span } in pieces {
            let range = location.byte_range_to_range(&span);
            match kind {
                PieceKind::Marker(style) => self.active.toggle(style),
                PieceKind::Display { text, .. } => {
                    tokens.push(Token::display(text, self.active, range))
                }
                PieceKind::Tag(tag) => tokens.push(Token::tag(tag, range)),
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::config::MarkupSyntax;
    use crate::tw::lexing::base_tokenization::scan;
    use crate::tw::lexing::comments::CommentMask;
    use crate::tw::lexing::tag_assembly::assemble;
    use crate::tw::token::{Style, TokenKind};

    fn resolve(source: &str) -> Vec<Token> {
        let location = SourceLocation::new(source);
        let pieces = assemble(scan(
            source,
            0..source.len(),
            &MarkupSyntax::default(),
            CommentMask::none(),
        ));
        StyleResolver::new().resolve(pieces, &location)
    }

    fn bold_text(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|token| match &token.kind {
                TokenKind::Display { text, styles } if styles.contains(Style::Bold) => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_markers_are_removed() {
        let tokens = resolve("*ab*");
        assert_eq!(tokens.len(), 2);
        assert_eq!(bold_text(&tokens), "ab");
    }

    #[test]
    fn test_toggle_parity() {
        // Each marker flips the style, so a second pair bolds again
        let tokens = resolve("*bold* text *more*");
        assert_eq!(bold_text(&tokens), "boldmore");
        assert_eq!(tokens.len(), 14);

        let tokens = resolve("*bold* text *more");
        assert_eq!(bold_text(&tokens), "boldmore");

        let tokens = resolve("*bold* text");
        assert_eq!(bold_text(&tokens), "bold");
    }

    #[test]
    fn test_styles_are_independent() {
        let tokens = resolve("/a*b/c*");
        let styles: Vec<StyleSet> = tokens
            .iter()
            .map(|token| match token.kind {
                TokenKind::Display { styles, .. } => styles,
                _ => StyleSet::empty(),
            })
            .collect();
        assert_eq!(
            styles,
            vec![
                StyleSet::empty().with(Style::Italic),
                StyleSet::empty().with(Style::Italic).with(Style::Bold),
                StyleSet::empty().with(Style::Bold),
            ]
        );
    }

    #[test]
    fn test_escaped_marker_is_literal() {
        let tokens = resolve(r"\*a");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text(), Some("*"));
        assert_eq!(bold_text(&tokens), "");
    }

    #[test]
    fn test_resolver_carries_state() {
        let mut resolver = StyleResolver::new();
        let location = SourceLocation::new("_a");
        let pieces = assemble(scan(
            "_a",
            0..2,
            &MarkupSyntax::default(),
            CommentMask::none(),
        ));
        resolver.resolve(pieces, &location);
        assert!(resolver.active().contains(Style::Underline));
    }
}
