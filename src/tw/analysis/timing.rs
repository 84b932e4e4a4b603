//! Timing and color propagation
//!
//!     One pass over the per-line token sequences, in document order, carrying the tag
//!     state across line boundaries. Tags are applied through the same registry playback
//!     uses, so colors, speed overrides and delays match the reveal exactly.
//!
//!     Colors are recorded densely: one foreground and one background entry per character
//!     of the document. A color tag takes effect at its own first character and lasts until
//!     the next color-affecting tag or the end of the document. Characters inside comments
//!     and line breaks get whatever color is active there.
//!
//!     Durations need a timing configuration. Without one, only `sleep` tokens resolve
//!     (their delay is their own argument) and no line timings are produced. A token whose
//!     duration cannot be known, an unknown tag or a page break waiting for the reader,
//!     marks its line as a lower bound instead.

use super::diagnostics::{
    Diagnostic, INVALID_ARGUMENT, INVALID_COLOR, MISSING_ARGUMENT, UNEXPECTED_ARGUMENTS,
    UNKNOWN_TAG,
};
use super::directive::DurationConfig;
use crate::tw::color::Color;
use crate::tw::location::{Position, Range, SourceLocation};
use crate::tw::tags::{self, ArgIssue, Delay, TagDefaults, TagKind, TagSpec, TagState};
use crate::tw::token::{Tag, Token, TokenKind};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineTiming {
    pub line: usize,
    pub duration_ms: f64,
    /// Some delay on the line could not be resolved
    pub lower_bound: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentDuration {
    pub duration_ms: f64,
    pub lower_bound: bool,
}

/// A `color` or `background` tag whose literal parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorTag {
    pub range: Range,
    pub kind: TagKind,
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    /// Active foreground per character offset
    pub foreground: Vec<Color>,
    /// Active background per character offset
    pub background: Vec<Color>,
    /// Colors in effect after the last character
    pub end_colors: Option<(Color, Color)>,
    /// Empty without a timing configuration
    pub lines: Vec<LineTiming>,
    /// Resolved duration per token, indexed by token index
    pub durations: Vec<Option<f64>>,
    /// Speed override active at each token that has one
    pub speeds: BTreeMap<Position, f64>,
    pub unknown_tags: Vec<Range>,
    pub color_tags: Vec<ColorTag>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Timeline {
    pub fn document_duration(&self) -> Option<DocumentDuration> {
        if self.lines.is_empty() {
            return None;
        }
        Some(DocumentDuration {
            duration_ms: self.lines.iter().map(|line| line.duration_ms).sum(),
            lower_bound: self.lines.iter().any(|line| line.lower_bound),
        })
    }

    /// Foreground and background at a character offset.
    pub fn colors_at(&self, char_offset: usize) -> Option<(Color, Color)> {
        match (
            self.foreground.get(char_offset),
            self.background.get(char_offset),
        ) {
            (Some(fg), Some(bg)) => Some((*fg, *bg)),
            _ => self.end_colors,
        }
    }
}

struct Walker<'a> {
    location: &'a SourceLocation,
    config: Option<&'a DurationConfig>,
    defaults: &'a TagDefaults,
    state: TagState,
    timeline: Timeline,
}

impl Walker<'_> {
    /// Extend the color arrays with the current colors up to `char_offset`.
    fn fill_to(&mut self, char_offset: usize) {
        let missing = char_offset.saturating_sub(self.timeline.foreground.len());
        let TagState {
            foreground,
            background,
            ..
        } = self.state;
        self.timeline
            .foreground
            .extend(std::iter::repeat(foreground).take(missing));
        self.timeline
            .background
            .extend(std::iter::repeat(background).take(missing));
    }

    fn resolve(&self, delay: Delay) -> Option<f64> {
        match (delay, self.config) {
            (Delay::Fixed(millis), _) => Some(millis),
            (delay, Some(config)) => delay.resolve(config, self.state.speed),
            (_, None) => None,
        }
    }

    fn token(&mut self, token: &Token) -> Option<f64> {
        let start = self
            .location
            .byte_to_char_offset(token.location.span.start);
        self.fill_to(start);

        let duration = match &token.kind {
            TokenKind::Display { text, .. } => self
                .config
                .map(|config| tags::display_delay(config, text, self.state.speed)),
            TokenKind::Tag(tag) => match tags::lookup(&tag.name) {
                Some(spec) => self.known_tag(spec, tag, &token.location),
                // Stray brackets read as plain text
                None if !tag.is_well_formed() => self.resolve(Delay::Char),
                None => {
                    self.timeline.unknown_tags.push(token.location.clone());
                    self.timeline.diagnostics.push(
                        Diagnostic::warning(
                            token.location.clone(),
                            format!("Unknown tag: [{}].", tag.name),
                        )
                        .with_code(UNKNOWN_TAG),
                    );
                    None
                }
            },
        };

        if let Some(speed) = self.state.speed {
            self.timeline.speeds.insert(token.location.start, speed);
        }
        duration
    }

    fn known_tag(&mut self, spec: &TagSpec, tag: &Tag, range: &Range) -> Option<f64> {
        let applied = spec.apply(&self.state, &tag.args, self.defaults);
        if let Some(issue) = &applied.issue {
            self.timeline
                .diagnostics
                .push(argument_diagnostic(spec, tag, issue, range.clone()));
        }

        let color = match spec.kind {
            TagKind::Color => Some(applied.state.foreground),
            TagKind::Background => Some(applied.state.background),
            _ => None,
        };
        if let (Some(color), None) = (color, &applied.issue) {
            self.timeline.color_tags.push(ColorTag {
                range: range.clone(),
                kind: spec.kind,
                color,
            });
        }

        self.state = applied.state;
        self.resolve(applied.delay)
    }
}

fn argument_diagnostic(spec: &TagSpec, tag: &Tag, issue: &ArgIssue, range: Range) -> Diagnostic {
    let unit = if spec.kind == TagKind::Tab {
        "spaces"
    } else {
        "ms"
    };
    match issue {
        ArgIssue::Missing { default } => Diagnostic::warning(
            range,
            format!(
                "Tag [{}] usually takes a numeric argument. Will default to {} {}.",
                tag.name, default, unit
            ),
        )
        .with_code(MISSING_ARGUMENT),
        ArgIssue::NotNumeric { default, .. } => Diagnostic::warning(
            range,
            format!(
                "Invalid numeric argument in tag [{} {}]. Will default to {} {}.",
                tag.name,
                tag.args.join(" "),
                default,
                unit
            ),
        )
        .with_code(INVALID_ARGUMENT),
        ArgIssue::Unexpected(count) => Diagnostic::information(
            range,
            format!(
                "Tag [{}] takes no arguments, {} ignored.",
                tag.name,
                if *count == 1 {
                    "1 argument".to_string()
                } else {
                    format!("{} arguments", count)
                }
            ),
        )
        .with_code(UNEXPECTED_ARGUMENTS),
        ArgIssue::Color(error) => {
            Diagnostic::error(range, format!("Invalid color in tag {}: {}.", tag.raw, error))
                .with_code(INVALID_COLOR)
        }
    }
}

/// Walk every line of a document. `lines` must come from
/// [`tokenize_lines`](crate::tw::lexing::tokenize_lines) over the same `location`.
pub fn walk(
    location: &SourceLocation,
    lines: &[Vec<Token>],
    config: Option<&DurationConfig>,
    defaults: &TagDefaults,
) -> Timeline {
    let mut walker = Walker {
        location,
        config,
        defaults,
        state: TagState::new(defaults),
        timeline: Timeline::default(),
    };

    for (line, tokens) in lines.iter().enumerate() {
        let mut duration_ms = 0.0;
        let mut lower_bound = false;
        for token in tokens {
            let duration = walker.token(token);
            match duration {
                Some(millis) => duration_ms += millis,
                None => lower_bound = true,
            }
            walker.timeline.durations.push(duration);
        }
        if config.is_some() {
            walker.timeline.lines.push(LineTiming {
                line,
                duration_ms,
                lower_bound,
            });
        }
    }

    walker.fill_to(location.char_count());
    walker.timeline.end_colors = Some((walker.state.foreground, walker.state.background));
    walker.timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::config::MarkupSyntax;
    use crate::tw::lexing::comments::find_comments;
    use crate::tw::lexing::tokenize_lines;
    use std::collections::BTreeMap;

    fn defaults() -> TagDefaults {
        TagDefaults {
            char_delay: 50.0,
            foreground: Color::BLACK,
            background: Color::WHITE,
        }
    }

    fn timing() -> DurationConfig {
        DurationConfig {
            char_delay: 50.0,
            newline_delay: 200.0,
            custom: BTreeMap::from([("a".to_string(), 10.0)]),
        }
    }

    fn run(source: &str, config: Option<&DurationConfig>) -> Timeline {
        let location = SourceLocation::new(source);
        let lines = tokenize_lines(&location, &find_comments(source), &MarkupSyntax::default());
        walk(&location, &lines, config, &defaults())
    }

    #[test]
    fn test_custom_delays_per_character() {
        let config = timing();
        let timeline = run("aab", Some(&config));
        assert_eq!(timeline.durations, vec![Some(10.0), Some(10.0), Some(50.0)]);
        assert_eq!(
            timeline.lines,
            vec![LineTiming {
                line: 0,
                duration_ms: 70.0,
                lower_bound: false
            }]
        );
        assert!(timeline.diagnostics.is_empty());
    }

    #[test]
    fn test_speed_carries_across_lines() {
        let config = timing();
        let timeline = run("[speed 5]a\nb[speeddefault]\nb", Some(&config));
        assert_eq!(
            timeline.durations,
            vec![Some(5.0), Some(5.0), Some(5.0), Some(50.0), Some(50.0)]
        );
        assert_eq!(timeline.speeds.get(&Position::new(1, 0)), Some(&5.0));
        assert_eq!(timeline.speeds.get(&Position::new(2, 0)), None);
    }

    #[test]
    fn test_lower_bound_lines() {
        let config = timing();
        let timeline = run("b[foo]\n[newpage]\nb", Some(&config));
        let flags: Vec<bool> = timeline.lines.iter().map(|line| line.lower_bound).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(timeline.unknown_tags.len(), 1);

        let document = timeline.document_duration().unwrap();
        assert_eq!(document.duration_ms, 100.0);
        assert!(document.lower_bound);
    }

    #[test]
    fn test_stray_brackets_are_plain_text() {
        let config = timing();
        for source in ["Price [", "see [note", "[123]"] {
            let timeline = run(source, Some(&config));
            assert!(timeline.diagnostics.is_empty(), "{}", source);
            assert!(timeline.unknown_tags.is_empty(), "{}", source);
            assert!(!timeline.lines[0].lower_bound, "{}", source);
        }

        let timeline = run("Price [", Some(&config));
        assert_eq!(timeline.durations.last(), Some(&Some(50.0)));
    }

    #[test]
    fn test_newline_and_linebreak_cost_the_same() {
        let config = timing();
        let timeline = run("[newline][linebreak]", Some(&config));
        assert_eq!(timeline.durations, vec![Some(200.0), Some(200.0)]);
    }

    #[test]
    fn test_colors_are_dense() {
        let timeline = run("a[color #f00]b\nc[resetcolor]", None);
        let red = Color::rgb(255, 0, 0);
        // "a" + 12 tag chars + "b" + "\n" + "c" + 12 tag chars
        assert_eq!(timeline.foreground.len(), 28);
        assert_eq!(timeline.foreground[0], Color::BLACK);
        assert_eq!(timeline.foreground[1], red);
        assert_eq!(timeline.foreground[14], red);
        assert_eq!(timeline.foreground[15], red);
        assert_eq!(timeline.foreground[16], Color::BLACK);
        assert_eq!(timeline.colors_at(99), Some((Color::BLACK, Color::WHITE)));
        assert!(timeline.background.iter().all(|bg| *bg == Color::WHITE));
        assert_eq!(timeline.color_tags.len(), 1);
    }

    #[test]
    fn test_without_timing_only_sleep_resolves() {
        let timeline = run("a[sleep 30]", None);
        assert_eq!(timeline.durations, vec![None, Some(30.0)]);
        assert!(timeline.lines.is_empty());
        assert!(timeline.document_duration().is_none());
    }

    #[test]
    fn test_argument_diagnostics() {
        let timeline = run("[sleep][speed x][hr 1][color #12]", None);
        let messages: Vec<&str> = timeline
            .diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Tag [sleep] usually takes a numeric argument. Will default to 1000 ms.",
                "Invalid numeric argument in tag [speed x]. Will default to 50 ms.",
                "Tag [hr] takes no arguments, 1 argument ignored.",
                "Invalid color in tag [color #12]: invalid hex color `#12`, expected #RGB or #RRGGBB.",
            ]
        );
    }
}
