//! Token types shared by the lexer, the playback engine and the analyzer.
//!
//! Token Layers
//!
//!     Raw Tokens:
//!         Structural split produced by the logos lexer: brackets, line breaks and runs of
//!         everything else. See [core](core).
//!
//!     Primitives:
//!         Grapheme-level classification of raw tokens against the configured markup
//!         characters (escape, style markers, tag brackets, plain characters). See
//!         [base_tokenization](crate::tw::lexing::base_tokenization).
//!
//!     Tokens:
//!         The finalized queue both consumers replay. A token is either a displayed
//!         grapheme stamped with its active styles, or an assembled tag with its name and
//!         arguments. Style markers, escapes and comments never survive to this layer.

pub mod core;

use crate::tw::location::Range;
use serde::Serialize;
use std::fmt;

pub use self::core::RawToken;

/// Inline display styles, in wrapping order (innermost first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Italic,
    Bold,
    Underline,
    Strikethrough,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::Italic,
        Style::Bold,
        Style::Underline,
        Style::Strikethrough,
    ];

    fn bit(self) -> u8 {
        match self {
            Style::Italic => 0b0001,
            Style::Bold => 0b0010,
            Style::Underline => 0b0100,
            Style::Strikethrough => 0b1000,
        }
    }
}

/// Set of active styles. Toggles have no depth: toggling an active style turns it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleSet(u8);

impl StyleSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn toggle(&mut self, style: Style) {
        self.0 ^= style.bit();
    }

    pub fn with(mut self, style: Style) -> Self {
        self.0 |= style.bit();
        self
    }

    pub fn contains(self, style: Style) -> bool {
        self.0 & style.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Active styles in wrapping order.
    pub fn iter(self) -> impl Iterator<Item = Style> {
        Style::ALL.into_iter().filter(move |style| self.contains(*style))
    }
}

impl Serialize for StyleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// A bracketed directive such as `[sleep 500]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub args: Vec<String>,
    /// Source text of the tag, brackets included
    pub raw: String,
    /// False when the tag was force-closed at the end of input
    pub closed: bool,
}

impl Tag {
    /// Build a tag from the text between its brackets.
    pub fn from_content(content: &str, closed: bool) -> Self {
        let mut parts = content.split_whitespace();
        let name = parts.next().unwrap_or_default().to_string();
        let args = parts.map(str::to_string).collect();
        let raw = if closed {
            format!("[{}]", content)
        } else {
            format!("[{}", content)
        };
        Self {
            name,
            args,
            raw,
            closed,
        }
    }

    /// Closed, with a name of ASCII letters only. Anything else is a stray bracket
    /// rather than a tag someone meant to write.
    pub fn is_well_formed(&self) -> bool {
        self.closed && !self.name.is_empty() && self.name.bytes().all(|b| b.is_ascii_alphabetic())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenKind {
    Display { text: String, styles: StyleSet },
    Tag(Tag),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Range,
    /// Position in the queue this token belongs to
    pub index: usize,
}

impl Token {
    pub fn display(text: impl Into<String>, styles: StyleSet, location: Range) -> Self {
        Self {
            kind: TokenKind::Display {
                text: text.into(),
                styles,
            },
            location,
            index: 0,
        }
    }

    pub fn tag(tag: Tag, location: Range) -> Self {
        Self {
            kind: TokenKind::Tag(tag),
            location,
            index: 0,
        }
    }

    pub fn is_display(&self) -> bool {
        matches!(self.kind, TokenKind::Display { .. })
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match &self.kind {
            TokenKind::Tag(tag) => Some(tag),
            TokenKind::Display { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Display { text, .. } => Some(text),
            TokenKind::Tag(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Display { text, styles } if styles.is_empty() => {
                write!(f, "Display({:?})", text)
            }
            TokenKind::Display { text, styles } => {
                let names: Vec<String> = styles
                    .iter()
                    .map(|style| format!("{:?}", style).to_lowercase())
                    .collect();
                write!(f, "Display({:?}, {})", text, names.join("+"))
            }
            TokenKind::Tag(tag) => write!(f, "Tag({} {:?})", tag.name, tag.args),
        }
    }
}
