//! Tag registry
//!
//!     Every recognized tag is an entry in [`TAGS`]: its name, the documentation shown by
//!     editors, the shape of its arguments and a pure handler. A handler receives the
//!     current [`TagState`] and the tag arguments and returns the next state, the effect
//!     to render and the delay rule, plus at most one argument problem. Handlers never
//!     fail: a bad argument falls back to the documented default.
//!
//!     Playback and analysis both dispatch through this table, so a tag means exactly
//!     the same thing in the reveal and in the timing report.
//!
//! Delay precedence (highest first)
//!
//!     1. `sleep` — its own argument, nothing overrides it
//!     2. the speed override set by `[speed N]`, until `[speeddefault]`
//!     3. a custom per-character delay (display tokens only)
//!     4. the character delay, or the newline delay for `newline` / `linebreak`
//!
//!     `newpage` has no delay of its own: it waits for an external signal.

use crate::tw::color::{Color, ColorError};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_SLEEP_MS: f64 = 1000.0;
pub const DEFAULT_TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Color,
    Background,
    ResetColor,
    ResetBg,
    Invert,
    Newline,
    Linebreak,
    Tab,
    Hr,
    Newpage,
    Speed,
    SpeedDefault,
    Sleep,
    Function,
}

/// What a tag accepts after its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgShape {
    None,
    /// An optional positive integer
    OptionalCount,
    /// A number the tag needs; a default is used when it is missing
    Number,
    Color,
    /// Passed through untouched
    Any,
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ArgShape::None => "no arguments",
            ArgShape::OptionalCount => "optional count",
            ArgShape::Number => "number (ms)",
            ArgShape::Color => "#RGB, #RRGGBB or three 0-255 integers",
            ArgShape::Any => "any arguments",
        };
        f.write_str(text)
    }
}

/// Visual and timing state threaded through tag handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagState {
    pub foreground: Color,
    pub background: Color,
    /// Speed override set by `[speed N]`
    pub speed: Option<f64>,
}

impl TagState {
    pub fn new(defaults: &TagDefaults) -> Self {
        Self {
            foreground: defaults.foreground,
            background: defaults.background,
            speed: None,
        }
    }
}

/// Values tags fall back to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagDefaults {
    pub char_delay: f64,
    pub foreground: Color,
    pub background: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    LineBreaks(usize),
    Rule,
    Spaces(usize),
    PageBreak,
    Call,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delay {
    Char,
    Newline,
    /// Authoritative over every override
    Fixed(f64),
    /// Waits for an external signal
    Suspend,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgIssue {
    Missing { default: f64 },
    NotNumeric { arg: String, default: f64 },
    Unexpected(usize),
    Color(ColorError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub state: TagState,
    pub effect: Effect,
    pub delay: Delay,
    pub issue: Option<ArgIssue>,
}

impl Applied {
    fn new(state: TagState, effect: Effect, delay: Delay) -> Self {
        Self {
            state,
            effect,
            delay,
            issue: None,
        }
    }

    fn with_issue(mut self, issue: Option<ArgIssue>) -> Self {
        self.issue = issue;
        self
    }
}

type Handler = fn(&TagState, &[String], &TagDefaults) -> Applied;

pub struct TagSpec {
    pub kind: TagKind,
    pub name: &'static str,
    pub detail: &'static str,
    pub example: &'static str,
    pub args: ArgShape,
    handler: Handler,
}

impl fmt::Debug for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagSpec")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl TagSpec {
    pub fn apply(&self, state: &TagState, args: &[String], defaults: &TagDefaults) -> Applied {
        let applied = (self.handler)(state, args, defaults);
        if applied.issue.is_none() && self.args == ArgShape::None && !args.is_empty() {
            return applied.with_issue(Some(ArgIssue::Unexpected(args.len())));
        }
        applied
    }
}

pub static TAGS: &[TagSpec] = &[
    TagSpec {
        kind: TagKind::Newline,
        name: "newline",
        detail: "Inserts a new line",
        example: "[newline]",
        args: ArgShape::None,
        handler: newline,
    },
    TagSpec {
        kind: TagKind::Linebreak,
        name: "linebreak",
        detail: "Inserts a line break, which is two newlines with the delay of one",
        example: "[linebreak]",
        args: ArgShape::None,
        handler: linebreak,
    },
    TagSpec {
        kind: TagKind::Newpage,
        name: "newpage",
        detail: "Starts a new page once the reader advances",
        example: "[newpage]",
        args: ArgShape::None,
        handler: newpage,
    },
    TagSpec {
        kind: TagKind::Sleep,
        name: "sleep",
        detail: "Pauses the typewriter for an amount in ms. Defaults to 1000 if the argument is not a number",
        example: "[sleep 20]",
        args: ArgShape::Number,
        handler: sleep,
    },
    TagSpec {
        kind: TagKind::Function,
        name: "function",
        detail: "Runs the function callback while playing",
        example: "[function]",
        args: ArgShape::Any,
        handler: function,
    },
    TagSpec {
        kind: TagKind::Speed,
        name: "speed",
        detail: "Overrides the character speed. Defaults to the character speed if the argument is not a number",
        example: "[speed 70]",
        args: ArgShape::Number,
        handler: speed,
    },
    TagSpec {
        kind: TagKind::SpeedDefault,
        name: "speeddefault",
        detail: "Removes the override of the [speed] tag",
        example: "[speeddefault]",
        args: ArgShape::None,
        handler: speed_default,
    },
    TagSpec {
        kind: TagKind::Color,
        name: "color",
        detail: "Sets the text color",
        example: "[color #ff0000]",
        args: ArgShape::Color,
        handler: color,
    },
    TagSpec {
        kind: TagKind::Background,
        name: "background",
        detail: "Sets the background color",
        example: "[background 0 0 0]",
        args: ArgShape::Color,
        handler: background,
    },
    TagSpec {
        kind: TagKind::ResetColor,
        name: "resetcolor",
        detail: "Restores the default text color",
        example: "[resetcolor]",
        args: ArgShape::None,
        handler: reset_color,
    },
    TagSpec {
        kind: TagKind::ResetBg,
        name: "resetbg",
        detail: "Restores the default background color",
        example: "[resetbg]",
        args: ArgShape::None,
        handler: reset_background,
    },
    TagSpec {
        kind: TagKind::Invert,
        name: "invert",
        detail: "Swaps the text and background colors",
        example: "[invert]",
        args: ArgShape::None,
        handler: invert,
    },
    TagSpec {
        kind: TagKind::Tab,
        name: "tab",
        detail: "Inserts non-breaking spaces, 4 unless a count is given",
        example: "[tab 2]",
        args: ArgShape::OptionalCount,
        handler: tab,
    },
    TagSpec {
        kind: TagKind::Hr,
        name: "hr",
        detail: "Inserts a horizontal rule",
        example: "[hr]",
        args: ArgShape::None,
        handler: hr,
    },
];

pub fn lookup(name: &str) -> Option<&'static TagSpec> {
    TAGS.iter().find(|spec| spec.name == name)
}

pub fn spec(kind: TagKind) -> &'static TagSpec {
    TAGS.iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or_else(|| unreachable!("every tag kind is registered"))
}

/// Parse a strictly positive, finite number.
pub fn positive_number(arg: &str) -> Option<f64> {
    arg.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// Read the first argument as a positive number, falling back to `default`.
fn number_or(args: &[String], default: f64) -> (f64, Option<ArgIssue>) {
    match args.first() {
        None => (default, Some(ArgIssue::Missing { default })),
        Some(arg) => match positive_number(arg) {
            Some(value) => (value, None),
            None => (
                default,
                Some(ArgIssue::NotNumeric {
                    arg: arg.clone(),
                    default,
                }),
            ),
        },
    }
}

fn newline(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    Applied::new(*state, Effect::LineBreaks(1), Delay::Newline)
}

fn linebreak(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    Applied::new(*state, Effect::LineBreaks(2), Delay::Newline)
}

fn newpage(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    Applied::new(*state, Effect::PageBreak, Delay::Suspend)
}

fn sleep(state: &TagState, args: &[String], _: &TagDefaults) -> Applied {
    let (millis, issue) = number_or(args, DEFAULT_SLEEP_MS);
    Applied::new(*state, Effect::None, Delay::Fixed(millis)).with_issue(issue)
}

fn function(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    Applied::new(*state, Effect::Call, Delay::Char)
}

fn speed(state: &TagState, args: &[String], defaults: &TagDefaults) -> Applied {
    let (millis, issue) = number_or(args, defaults.char_delay);
    let next = TagState {
        speed: Some(millis),
        ..*state
    };
    Applied::new(next, Effect::None, Delay::Char).with_issue(issue)
}

fn speed_default(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    let next = TagState {
        speed: None,
        ..*state
    };
    Applied::new(next, Effect::None, Delay::Char)
}

fn color(state: &TagState, args: &[String], _: &TagDefaults) -> Applied {
    match Color::from_args(args) {
        Ok(foreground) => Applied::new(
            TagState {
                foreground,
                ..*state
            },
            Effect::None,
            Delay::Char,
        ),
        Err(error) => Applied::new(*state, Effect::None, Delay::Char)
            .with_issue(Some(ArgIssue::Color(error))),
    }
}

fn background(state: &TagState, args: &[String], _: &TagDefaults) -> Applied {
    match Color::from_args(args) {
        Ok(background) => Applied::new(
            TagState {
                background,
                ..*state
            },
            Effect::None,
            Delay::Char,
        ),
        Err(error) => Applied::new(*state, Effect::None, Delay::Char)
            .with_issue(Some(ArgIssue::Color(error))),
    }
}

fn reset_color(state: &TagState, _: &[String], defaults: &TagDefaults) -> Applied {
    let next = TagState {
        foreground: defaults.foreground,
        ..*state
    };
    Applied::new(next, Effect::None, Delay::Char)
}

fn reset_background(state: &TagState, _: &[String], defaults: &TagDefaults) -> Applied {
    let next = TagState {
        background: defaults.background,
        ..*state
    };
    Applied::new(next, Effect::None, Delay::Char)
}

fn invert(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    let next = TagState {
        foreground: state.background,
        background: state.foreground,
        ..*state
    };
    Applied::new(next, Effect::None, Delay::Char)
}

fn tab(state: &TagState, args: &[String], _: &TagDefaults) -> Applied {
    let (width, issue) = match args.first() {
        None => (DEFAULT_TAB_WIDTH, None),
        Some(arg) => match arg.parse::<usize>() {
            Ok(width) if width > 0 => (width, None),
            _ => (
                DEFAULT_TAB_WIDTH,
                Some(ArgIssue::NotNumeric {
                    arg: arg.clone(),
                    default: DEFAULT_TAB_WIDTH as f64,
                }),
            ),
        },
    };
    Applied::new(*state, Effect::Spaces(width), Delay::Char).with_issue(issue)
}

fn hr(state: &TagState, _: &[String], _: &TagDefaults) -> Applied {
    Applied::new(*state, Effect::Rule, Delay::Char)
}

/// Where delays come from: playback options or a timing directive.
pub trait DelaySource {
    fn char_delay(&self) -> f64;
    fn newline_delay(&self) -> f64;
    fn custom_delay(&self, grapheme: &str) -> Option<f64>;
}

impl Delay {
    /// Resolve against a delay source and the active speed override. `None` for a
    /// suspension, whose length is decided by the reader.
    pub fn resolve<D: DelaySource + ?Sized>(self, source: &D, speed: Option<f64>) -> Option<f64> {
        match self {
            Delay::Fixed(millis) => Some(millis),
            Delay::Suspend => None,
            Delay::Char => Some(speed.unwrap_or_else(|| source.char_delay())),
            Delay::Newline => Some(speed.unwrap_or_else(|| source.newline_delay())),
        }
    }
}

/// Delay of a displayed grapheme.
pub fn display_delay<D: DelaySource + ?Sized>(source: &D, grapheme: &str, speed: Option<f64>) -> f64 {
    speed
        .or_else(|| source.custom_delay(grapheme))
        .unwrap_or_else(|| source.char_delay())
}

impl DelaySource for crate::tw::config::PlaybackOptions {
    fn char_delay(&self) -> f64 {
        self.char_delay
    }

    fn newline_delay(&self) -> f64 {
        self.newline_delay
    }

    fn custom_delay(&self, grapheme: &str) -> Option<f64> {
        self.custom_delays.get(grapheme).copied()
    }
}
