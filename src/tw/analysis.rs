//! Timing and analysis
//!
//!     Whole-document analysis for editor integration. One call to [`Analysis::analyze`]
//!     runs every step to completion and never fails; problems become diagnostics and
//!     the results are as complete as the input allows.
//!
//! Steps
//!
//!     1. Directive blocks. See [directive](directive). Every `{{#timecalc … #}}` block is
//!        parsed and validated. The last block that validates is the active timing
//!        configuration; the others only contribute diagnostics.
//!
//!     2. Line tokens. The lexing pipeline runs per source line (see
//!        [tokenize_lines](crate::tw::lexing::tokenize_lines)), so every token keeps an
//!        absolute, single-line span.
//!
//!     3. Walk. See [timing](timing). Tag state is carried across lines to produce dense
//!        per-character colors, per-token durations, speed overrides and per-line timings.
//!
//!     The result is immutable. A host re-analyzes on every change and swaps the whole
//!     value, see [workspace](workspace).

pub mod diagnostics;
pub mod directive;
pub mod hover;
pub mod timing;
pub mod workspace;

use crate::tw::color::Color;
use crate::tw::config::{MarkupSyntax, PlaybackOptions, TypewriterConfig};
use crate::tw::lexing::comments::find_comments;
use crate::tw::lexing::tokenize_lines;
use crate::tw::location::{Position, Range, SourceLocation};
use crate::tw::tags::TagDefaults;
use crate::tw::token::{Token, TokenKind};
use diagnostics::{Diagnostic, UNKNOWN_DIRECTIVE_KEY};
use directive::{active_config, find_directives, Directive, DurationConfig};
use serde::Serialize;
use timing::{ColorTag, DocumentDuration, LineTiming, Timeline};

pub use hover::{completion_candidates, Completion, PositionInfo, TagInfo};
pub use workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub markup: MarkupSyntax,
    pub default_foreground: Color,
    pub default_background: Color,
    /// Used by `[speed]` without a valid argument when no timing block is active
    pub char_delay: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_parts(MarkupSyntax::default(), &PlaybackOptions::default())
    }
}

impl AnalysisOptions {
    fn from_parts(markup: MarkupSyntax, playback: &PlaybackOptions) -> Self {
        Self {
            markup,
            default_foreground: playback.default_text_color,
            default_background: playback.default_background_color,
            char_delay: playback.char_delay,
        }
    }
}

impl From<&TypewriterConfig> for AnalysisOptions {
    fn from(config: &TypewriterConfig) -> Self {
        Self::from_parts(config.markup, &config.playback)
    }
}

/// Serializable whole-document summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub diagnostics: Vec<Diagnostic>,
    pub timing: Option<DurationConfig>,
    pub lines: Vec<LineTiming>,
    pub document_duration: Option<DocumentDuration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    location: SourceLocation,
    lines: Vec<Vec<Token>>,
    directives: Vec<Directive>,
    config: Option<DurationConfig>,
    timeline: Timeline,
    diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn analyze(source: &str, options: &AnalysisOptions) -> Self {
        let location = SourceLocation::new(source);
        let comments = find_comments(source);
        let directives = find_directives(source, &comments);
        let config = active_config(&directives).cloned();
        let lines = tokenize_lines(&location, &comments, &options.markup);

        let defaults = TagDefaults {
            char_delay: config
                .as_ref()
                .map_or(options.char_delay, |config| config.char_delay),
            foreground: options.default_foreground,
            background: options.default_background,
        };
        let mut timeline = timing::walk(&location, &lines, config.as_ref(), &defaults);

        let mut diagnostics = directive_diagnostics(&location, &directives);
        diagnostics.append(&mut timeline.diagnostics);
        diagnostics.sort_by_key(|diagnostic| diagnostic.range.span.start);

        tracing::debug!(
            lines = lines.len(),
            directives = directives.len(),
            timed = config.is_some(),
            diagnostics = diagnostics.len(),
            "analyzed document"
        );

        Self {
            location,
            lines,
            directives,
            config,
            timeline,
            diagnostics,
        }
    }

    pub fn source(&self) -> &str {
        self.location.source()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// The active timing configuration, if any block validated.
    pub fn config(&self) -> Option<&DurationConfig> {
        self.config.as_ref()
    }

    /// Tokens of each source line.
    pub fn line_tokens(&self) -> &[Vec<Token>] {
        &self.lines
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.lines.iter().flatten()
    }

    /// Per-line timings. Empty without a timing configuration.
    pub fn lines(&self) -> &[LineTiming] {
        &self.timeline.lines
    }

    pub fn document_duration(&self) -> Option<DocumentDuration> {
        self.timeline.document_duration()
    }

    pub fn foreground(&self) -> &[Color] {
        &self.timeline.foreground
    }

    pub fn background(&self) -> &[Color] {
        &self.timeline.background
    }

    pub fn unknown_tags(&self) -> &[Range] {
        &self.timeline.unknown_tags
    }

    /// Every `color`/`background` tag with a valid literal, for color pickers.
    pub fn color_tags(&self) -> &[ColorTag] {
        &self.timeline.color_tags
    }

    pub fn token_at(&self, pos: Position) -> Option<&Token> {
        self.lines
            .get(pos.line)?
            .iter()
            .find(|token| token.location.contains(pos))
    }

    /// Resolved duration of a token of this analysis.
    pub fn token_duration(&self, token: &Token) -> Option<f64> {
        self.timeline
            .durations
            .get(token.index)
            .copied()
            .flatten()
    }

    /// Speed override active at the token covering `pos`.
    pub fn speed_at(&self, pos: Position) -> Option<f64> {
        let token = self.token_at(pos)?;
        self.timeline.speeds.get(&token.location.start).copied()
    }

    /// Token, timing and colors at a position. `None` outside the document.
    pub fn inspect(&self, pos: Position) -> Option<PositionInfo> {
        let offset = self.location.char_offset(pos)?;
        let (foreground, background) = self.timeline.colors_at(offset)?;
        let token = self.token_at(pos);
        Some(PositionInfo {
            token: token.map(hover::describe),
            resolved_speed_ms: token.and_then(|token| self.token_duration(token)),
            speed_override_ms: self.speed_at(pos),
            foreground,
            background,
        })
    }

    /// Documentation of the tag whose span contains the start of `range`.
    pub fn tag_info(&self, range: &Range) -> Option<TagInfo> {
        let token = self.token_at(range.start)?;
        match &token.kind {
            TokenKind::Tag(tag) => Some(TagInfo::for_tag(tag)),
            TokenKind::Display { .. } => None,
        }
    }

    pub fn completion_candidates() -> Vec<Completion> {
        completion_candidates()
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            diagnostics: self.diagnostics.clone(),
            timing: self.config.clone(),
            lines: self.timeline.lines.clone(),
            document_duration: self.document_duration(),
        }
    }
}

fn directive_diagnostics(location: &SourceLocation, directives: &[Directive]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for directive in directives {
        match &directive.outcome {
            Ok(validated) => {
                diagnostics.extend(validated.unknown_keys.iter().map(|unknown| {
                    Diagnostic::warning(
                        location.byte_range_to_range(&unknown.span),
                        format!("Unknown timecalc key `{}` is ignored.", unknown.key),
                    )
                    .with_code(UNKNOWN_DIRECTIVE_KEY)
                }));
            }
            Err(error) => diagnostics.push(
                Diagnostic::error(location.byte_range_to_range(&error.span()), error.to_string())
                    .with_code(error.code()),
            ),
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::analysis::diagnostics::DiagnosticSeverity;

    fn analyze(source: &str) -> Analysis {
        Analysis::analyze(source, &AnalysisOptions::default())
    }

    #[test]
    fn test_directive_errors_become_diagnostics() {
        let analysis = analyze("{{#timecalc newline: 5 #}}\nabc");
        assert!(analysis.config().is_none());
        assert!(analysis.has_errors());
        let diagnostic = &analysis.diagnostics()[0];
        assert_eq!(diagnostic.code.as_deref(), Some("missing-directive-field"));
        assert_eq!(diagnostic.range.start, Position::new(0, 0));
        // Lexing and colors still run
        assert_eq!(analysis.tokens().count(), 3);
        assert_eq!(analysis.foreground().len(), 30);
    }

    #[test]
    fn test_unknown_directive_key_warns() {
        let analysis = analyze("{{#timecalc\nchar: 1\nnewline: 1\npace: 2\n#}}");
        assert!(analysis.config().is_some());
        assert_eq!(analysis.diagnostics().len(), 1);
        assert_eq!(
            analysis.diagnostics()[0].severity,
            DiagnosticSeverity::Warning
        );
        assert_eq!(analysis.diagnostics()[0].range.start, Position::new(3, 0));
    }

    #[test]
    fn test_speed_default_follows_timing_block() {
        let analysis = analyze("{{#timecalc char: 40 newline: 1 #}}[speed]a");
        let a = analysis.tokens().last().unwrap();
        assert_eq!(analysis.token_duration(a), Some(40.0));
    }

    #[test]
    fn test_inspect() {
        let analysis = analyze("{{#timecalc char: 20 newline: 1 #}}\n[background 0 0 255]*x*");
        let info = analysis.inspect(Position::new(1, 21)).unwrap();
        assert_eq!(info.token.as_deref(), Some("character \"x\" (bold)"));
        assert_eq!(info.resolved_speed_ms, Some(20.0));
        assert_eq!(info.background, Color::rgb(0, 0, 255));
        assert_eq!(info.foreground, Color::BLACK);

        // On the style marker: no token, colors still known
        let marker = analysis.inspect(Position::new(1, 20)).unwrap();
        assert_eq!(marker.token, None);
        assert_eq!(marker.background, Color::rgb(0, 0, 255));

        assert!(analysis.inspect(Position::new(5, 0)).is_none());
    }

    #[test]
    fn test_tag_info_lookup() {
        let analysis = analyze("ab [sleep 20] [foo]");
        let sleep = analysis.token_at(Position::new(0, 5)).unwrap().location.clone();
        let info = analysis.tag_info(&sleep).unwrap();
        assert!(info.recognized);
        assert_eq!(info.example, Some("[sleep 20]"));

        let foo = analysis.token_at(Position::new(0, 15)).unwrap().location.clone();
        assert!(!analysis.tag_info(&foo).unwrap().recognized);
        assert_eq!(analysis.unknown_tags(), &[foo]);

        let a = analysis.token_at(Position::new(0, 0)).unwrap().location.clone();
        assert!(analysis.tag_info(&a).is_none());
    }

    #[test]
    fn test_report_serializes() {
        let analysis = analyze("{{#timecalc char: 10 newline: 10 #}}ab");
        let json = serde_json::to_value(analysis.report()).unwrap();
        assert_eq!(json["document_duration"]["duration_ms"], 20.0);
        assert_eq!(json["timing"]["char_delay"], 10.0);
        assert_eq!(json["diagnostics"].as_array().unwrap().len(), 0);
    }
}
