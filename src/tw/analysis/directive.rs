//! Timing directive blocks
//!
//!     Grammar: `"{{#timecalc" body "#}}"`
//!
//!         body  = sep (entry sep)*
//!         entry = key ":" value
//!         key   = bare-word | quoted-string
//!         value = number | quoted-string | "{" body "}" | bare-word
//!         sep   = (whitespace | ",")*
//!
//!     Entries are usually one per line, but any whitespace or comma separates them, so
//!     trailing commas and JSON-style blocks both parse. Keys need no quotes. Bare words
//!     are accepted as values so that `char: fast` is reported as a non-numeric field
//!     rather than as a parse failure.
//!
//!     Parsing and validation are separate steps. [`parse_block`] only builds entries;
//!     [`validate`] turns them into a [`DurationConfig`]. Both report a [`DirectiveError`]
//!     with the byte range it refers to.
//!
//!     Recognized keys are `char`, `newline` and `custom`. Other keys are kept as warnings
//!     and otherwise ignored. When a key repeats, the last occurrence counts.

use crate::tw::lexing::comments::Comment;
use crate::tw::tags::DelaySource;
use chumsky::prelude::*;
use chumsky::Stream;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range as ByteRange;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

type ParserError = Simple<char>;

pub const CHAR_KEY: &str = "char";
pub const NEWLINE_KEY: &str = "newline";
pub const CUSTOM_KEY: &str = "custom";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Object(Vec<Entry>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub key_span: ByteRange<usize>,
    pub value: Value,
    pub value_span: ByteRange<usize>,
}

/// Per-character timing read from a directive block. Delays are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationConfig {
    pub char_delay: f64,
    pub newline_delay: f64,
    pub custom: BTreeMap<String, f64>,
}

impl DelaySource for DurationConfig {
    fn char_delay(&self) -> f64 {
        self.char_delay
    }

    fn newline_delay(&self) -> f64 {
        self.newline_delay
    }

    fn custom_delay(&self, grapheme: &str) -> Option<f64> {
        self.custom.get(grapheme).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectiveError {
    #[error("malformed timecalc block: {message}")]
    Malformed {
        message: String,
        span: ByteRange<usize>,
    },
    #[error("timecalc block is missing the `{field}` field")]
    MissingField {
        field: &'static str,
        span: ByteRange<usize>,
    },
    #[error("timecalc field `{field}` must be a number")]
    NonNumericField {
        field: &'static str,
        span: ByteRange<usize>,
    },
    #[error("timecalc field `custom` must be an object mapping characters to delays")]
    CustomNotObject { span: ByteRange<usize> },
    #[error("custom delay key `{key}` must be exactly one character")]
    InvalidCustomKey {
        key: String,
        span: ByteRange<usize>,
    },
    #[error("custom delay for `{key}` must be a number")]
    NonNumericCustom {
        key: String,
        span: ByteRange<usize>,
    },
}

impl DirectiveError {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            DirectiveError::Malformed { .. } => "malformed-directive",
            DirectiveError::MissingField { .. } => "missing-directive-field",
            DirectiveError::NonNumericField { .. } => "non-numeric-directive-field",
            DirectiveError::CustomNotObject { .. }
            | DirectiveError::InvalidCustomKey { .. }
            | DirectiveError::NonNumericCustom { .. } => "invalid-custom-delay",
        }
    }

    pub fn span(&self) -> ByteRange<usize> {
        match self {
            DirectiveError::Malformed { span, .. }
            | DirectiveError::MissingField { span, .. }
            | DirectiveError::NonNumericField { span, .. }
            | DirectiveError::CustomNotObject { span }
            | DirectiveError::InvalidCustomKey { span, .. }
            | DirectiveError::NonNumericCustom { span, .. } => span.clone(),
        }
    }
}

/// A key the block sets but nothing reads.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownKey {
    pub key: String,
    pub span: ByteRange<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub config: DurationConfig,
    pub unknown_keys: Vec<UnknownKey>,
}

/// One `timecalc` block found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// The whole comment, delimiters included
    pub range: ByteRange<usize>,
    pub outcome: Result<Validated, DirectiveError>,
}

fn whitespace() -> impl Parser<char, (), Error = ParserError> + Clone {
    filter::<char, _, ParserError>(|c: &char| c.is_whitespace())
        .repeated()
        .ignored()
}

fn separator() -> impl Parser<char, (), Error = ParserError> + Clone {
    filter::<char, _, ParserError>(|c: &char| c.is_whitespace() || *c == ',')
        .repeated()
        .ignored()
}

fn quoted(quote: char) -> impl Parser<char, String, Error = ParserError> + Clone {
    let plain = filter::<char, _, ParserError>(move |c: &char| *c != quote && *c != '\\');
    let escaped = just::<char, _, ParserError>('\\').ignore_then(any::<char, ParserError>());
    just::<char, _, ParserError>(quote)
        .ignore_then(plain.or(escaped).repeated())
        .then_ignore(just(quote))
        .collect::<String>()
}

fn bare_word() -> impl Parser<char, String, Error = ParserError> + Clone {
    filter::<char, _, ParserError>(|c: &char| {
        !c.is_whitespace() && !matches!(c, ':' | ',' | '{' | '}' | '"' | '\'')
    })
    .repeated()
    .at_least(1)
    .collect::<String>()
}

fn number() -> impl Parser<char, f64, Error = ParserError> + Clone {
    let digits = filter::<char, _, ParserError>(char::is_ascii_digit)
        .repeated()
        .at_least(1)
        .collect::<String>();

    digits
        .clone()
        .then(just('.').ignore_then(digits).or_not())
        .try_map(|(whole, fraction), span| {
            let literal = match fraction {
                Some(fraction) => format!("{}.{}", whole, fraction),
                None => whole,
            };
            literal
                .parse::<f64>()
                .map_err(|error| Simple::custom(span, error.to_string()))
        })
}

fn key() -> impl Parser<char, String, Error = ParserError> + Clone {
    quoted('"').or(quoted('\'')).or(bare_word())
}

fn entry<P>(value: P) -> impl Parser<char, Entry, Error = ParserError> + Clone
where
    P: Parser<char, Value, Error = ParserError> + Clone,
{
    key()
        .map_with_span(|key, span| (key, span))
        .then_ignore(whitespace())
        .then_ignore(just(':'))
        .then_ignore(whitespace())
        .then(value.map_with_span(|value, span| (value, span)))
        .map(|((key, key_span), (value, value_span))| Entry {
            key,
            key_span,
            value,
            value_span,
        })
}

fn block_parser() -> impl Parser<char, Vec<Entry>, Error = ParserError> {
    let value = recursive(|value| {
        let object = entry(value)
            .then_ignore(separator())
            .repeated()
            .delimited_by(just('{').then_ignore(separator()), just('}'))
            .map(Value::Object);

        number()
            .map(Value::Number)
            .or(quoted('"').map(Value::Text))
            .or(quoted('\'').map(Value::Text))
            .or(object)
            .or(bare_word().map(Value::Text))
    });

    separator()
        .ignore_then(entry(value).then_ignore(separator()).repeated())
        .then_ignore(end())
}

/// Parse the entries of `source[body]`. Spans are absolute offsets into `source`.
pub fn parse_block(source: &str, body: ByteRange<usize>) -> Result<Vec<Entry>, DirectiveError> {
    let offset = body.start;
    let end = body.end;
    let stream = Stream::from_iter(
        end..end,
        source[body]
            .char_indices()
            .map(move |(i, c)| (c, offset + i..offset + i + c.len_utf8())),
    );

    block_parser().parse(stream).map_err(|errors| {
        let error = errors.into_iter().next();
        DirectiveError::Malformed {
            message: error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unexpected input".to_string()),
            span: error.map(|error| error.span()).unwrap_or(end..end),
        }
    })
}

fn last_entry<'a>(entries: &'a [Entry], key: &str) -> Option<&'a Entry> {
    entries.iter().rev().find(|entry| entry.key == key)
}

fn numeric_field(
    entries: &[Entry],
    field: &'static str,
    block: &ByteRange<usize>,
) -> Result<f64, DirectiveError> {
    let entry = last_entry(entries, field).ok_or(DirectiveError::MissingField {
        field,
        span: block.clone(),
    })?;
    match entry.value {
        Value::Number(value) => Ok(value),
        _ => Err(DirectiveError::NonNumericField {
            field,
            span: entry.value_span.clone(),
        }),
    }
}

fn custom_delays(entries: &[Entry]) -> Result<BTreeMap<String, f64>, DirectiveError> {
    let mut custom = BTreeMap::new();
    let Some(entry) = last_entry(entries, CUSTOM_KEY) else {
        return Ok(custom);
    };
    let Value::Object(delays) = &entry.value else {
        return Err(DirectiveError::CustomNotObject {
            span: entry.value_span.clone(),
        });
    };

    for delay in delays {
        if delay.key.graphemes(true).count() != 1 {
            return Err(DirectiveError::InvalidCustomKey {
                key: delay.key.clone(),
                span: delay.key_span.clone(),
            });
        }
        match delay.value {
            Value::Number(millis) => {
                custom.insert(delay.key.clone(), millis);
            }
            _ => {
                return Err(DirectiveError::NonNumericCustom {
                    key: delay.key.clone(),
                    span: delay.value_span.clone(),
                })
            }
        }
    }
    Ok(custom)
}

/// Check parsed entries and build the timing configuration. `block` is the range
/// reported for missing fields.
pub fn validate(entries: &[Entry], block: ByteRange<usize>) -> Result<Validated, DirectiveError> {
    let char_delay = numeric_field(entries, CHAR_KEY, &block)?;
    let newline_delay = numeric_field(entries, NEWLINE_KEY, &block)?;
    let custom = custom_delays(entries)?;

    let unknown_keys = entries
        .iter()
        .filter(|entry| ![CHAR_KEY, NEWLINE_KEY, CUSTOM_KEY].contains(&entry.key.as_str()))
        .map(|entry| UnknownKey {
            key: entry.key.clone(),
            span: entry.key_span.clone(),
        })
        .collect();

    Ok(Validated {
        config: DurationConfig {
            char_delay,
            newline_delay,
            custom,
        },
        unknown_keys,
    })
}

/// Read every `timecalc` block among `comments`.
pub fn find_directives(source: &str, comments: &[Comment]) -> Vec<Directive> {
    comments
        .iter()
        .filter_map(|comment| {
            let body = comment.directive_body(source)?;
            let outcome = parse_block(source, body)
                .and_then(|entries| validate(&entries, comment.range.clone()));
            Some(Directive {
                range: comment.range.clone(),
                outcome,
            })
        })
        .collect()
}

/// The configuration in effect: the last block that validated.
pub fn active_config(directives: &[Directive]) -> Option<&DurationConfig> {
    directives
        .iter()
        .rev()
        .find_map(|directive| directive.outcome.as_ref().ok())
        .map(|validated| &validated.config)
}
