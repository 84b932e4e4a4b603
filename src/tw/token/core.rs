//! Raw token definitions
//!
//! The logos lexer only separates what is fixed by the grammar: tag brackets and line
//! breaks. Style markers and the escape character are configurable, so they are
//! recognized later, grapheme by grapheme, inside `Text` runs.
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RawToken {
    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    #[regex(r"\r\n|\n|\r")]
    LineBreak,

    // Everything else, split into graphemes by the scanner
    #[regex(r"[^\[\]\r\n]+")]
    Text,
}

/// Tokenize source text with byte ranges.
pub fn tokenize(source: &str) -> Vec<(RawToken, logos::Span)> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        if let Ok(token) = result {
            tokens.push((token, lexer.span()));
        }
    }

    tokens
}
