//! Tag assembly
//!
//!     Merges each run of tag primitives, from `[` to the matching `]`, into a single tag
//!     piece. The inner text is split on whitespace: the first piece is the tag name, the
//!     rest are its arguments. A tag still open at the end of the input is closed there.

use super::base_tokenization::{Primitive, PrimitiveKind};
use crate::tw::token::{Style, Tag};
use std::ops::Range as ByteRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceKind {
    Display { text: String, escaped: bool },
    Marker(Style),
    Tag(Tag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub span: ByteRange<usize>,
}

struct OpenTag {
    content: String,
    span: ByteRange<usize>,
}

impl OpenTag {
    fn finish(self, closed: bool) -> Piece {
        Piece {
            kind: PieceKind::Tag(Tag::from_content(&self.content, closed)),
            span: self.span,
        }
    }
}

pub fn assemble(primitives: Vec<Primitive>) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(primitives.len());
    let mut open: Option<OpenTag> = None;

    for Primitive { kind, span } in primitives {
        match kind {
            PrimitiveKind::TagOpen => {
                open = Some(OpenTag {
                    content: String::new(),
                    span,
                });
            }
            PrimitiveKind::TagText(text) => match open.as_mut() {
                Some(tag) => {
                    tag.content.push_str(&text);
                    tag.span.end = span.end;
                }
                // The scanner never emits tag text outside a tag span
                None => pieces.push(display(text, false, span)),
            },
            PrimitiveKind::TagClose => {
                if let Some(mut tag) = open.take() {
                    tag.span.end = span.end;
                    pieces.push(tag.finish(true));
                }
            }
            PrimitiveKind::Char(text) => pieces.push(display(text, false, span)),
            PrimitiveKind::Escaped(text) => pieces.push(display(text, true, span)),
            PrimitiveKind::Marker(style) => pieces.push(Piece {
                kind: PieceKind::Marker(style),
                span,
            }),
        }
    }

    if let Some(tag) = open {
        pieces.push(tag.finish(false));
    }

    pieces
}

fn display(text: String, escaped: bool, span: ByteRange<usize>) -> Piece {
    Piece {
        kind: PieceKind::Display { text, escaped },
        span,
    }
}
