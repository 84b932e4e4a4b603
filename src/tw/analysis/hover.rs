//! Read-side data for editor features: position inspection, tag documentation and
//! completion candidates. Protocol wiring lives with the host; these are plain values.

use crate::tw::color::Color;
use crate::tw::tags::{self, ArgShape, TagKind, TAGS};
use crate::tw::token::{Tag, Token, TokenKind};
use serde::Serialize;

/// What is rendered at a position and how long it takes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionInfo {
    /// `None` between tokens, e.g. inside a comment
    pub token: Option<String>,
    /// `None` when timing is not configured or the delay is unknown
    pub resolved_speed_ms: Option<f64>,
    pub speed_override_ms: Option<f64>,
    pub foreground: Color,
    pub background: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagInfo {
    pub name: String,
    pub recognized: bool,
    pub kind: Option<TagKind>,
    pub args: Option<ArgShape>,
    pub detail: Option<&'static str>,
    pub example: Option<&'static str>,
}

impl TagInfo {
    pub fn for_tag(tag: &Tag) -> Self {
        match tags::lookup(&tag.name) {
            Some(spec) => Self {
                name: tag.name.clone(),
                recognized: true,
                kind: Some(spec.kind),
                args: Some(spec.args),
                detail: Some(spec.detail),
                example: Some(spec.example),
            },
            None => Self {
                name: tag.name.clone(),
                recognized: false,
                kind: None,
                args: None,
                detail: None,
                example: None,
            },
        }
    }

    /// Markdown shown when hovering the tag.
    pub fn hover_text(&self) -> String {
        match (self.detail, self.example, self.args) {
            (Some(detail), Some(example), Some(args)) => format!(
                "**[{}]** {}\n\nArguments: {}\n\n`{}`",
                self.name, detail, args, example
            ),
            _ => format!("Unknown tag: [{}].", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub label: &'static str,
    pub detail: &'static str,
    /// Markdown
    pub documentation: String,
    /// Inserted after the `[` that triggered completion
    pub insert_text: String,
}

/// One candidate per registered tag, in registry order.
pub fn completion_candidates() -> Vec<Completion> {
    TAGS.iter()
        .map(|spec| Completion {
            label: spec.name,
            detail: spec.detail,
            documentation: format!("`{}`", spec.example),
            insert_text: format!("{}]", spec.name),
        })
        .collect()
}

/// Short human description of a token.
pub fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Display { text, styles } if styles.is_empty() => {
            format!("character {:?}", text)
        }
        TokenKind::Display { text, styles } => {
            let names: Vec<String> = styles
                .iter()
                .map(|style| format!("{:?}", style).to_lowercase())
                .collect();
            format!("character {:?} ({})", text, names.join(", "))
        }
        TokenKind::Tag(tag) if tags::lookup(&tag.name).is_some() => format!("tag {}", tag.raw),
        TokenKind::Tag(tag) => format!("unknown tag {}", tag.raw),
    }
}
