//! Testing utilities
//!
//!     Shared by unit tests and the integration tests under `tests/`.
//!
//!     - [`RecordingSink`] keeps every sink call as a [`SinkEvent`], so playback can be
//!       asserted on without parsing HTML.
//!     - [`Recorder`] is a [`PlaybackObserver`] whose clones share one log. Hand a clone
//!       to the engine and read the other one after the run.
//!     - [`summarize`] renders a token queue as compact strings for readable assertions.

use crate::tw::color::Color;
use crate::tw::playback::{PlaybackObserver, Sink, StyledRun};
use crate::tw::token::{StyleSet, Token};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Run {
        text: String,
        styles: StyleSet,
        foreground: Color,
        background: Color,
    },
    Break,
    Spaces(usize),
    Rule,
    Suspend(String),
    Clear,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<SinkEvent>,
    progress: Vec<(usize, usize)>,
}

impl RecordingSink {
    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Every `(processed, total)` report, in order.
    pub fn progress(&self) -> &[(usize, usize)] {
        &self.progress
    }

    /// Events since the last clear.
    pub fn visible(&self) -> &[SinkEvent] {
        let start = self
            .events
            .iter()
            .rposition(|event| *event == SinkEvent::Clear)
            .map_or(0, |position| position + 1);
        &self.events[start..]
    }

    /// Displayed text since the last clear.
    pub fn text(&self) -> String {
        self.visible()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Run { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Sink for RecordingSink {
    fn append_run(&mut self, run: &StyledRun<'_>) {
        self.events.push(SinkEvent::Run {
            text: run.text.to_string(),
            styles: run.styles,
            foreground: run.foreground,
            background: run.background,
        });
    }

    fn break_line(&mut self) {
        self.events.push(SinkEvent::Break);
    }

    fn insert_spaces(&mut self, count: usize) {
        self.events.push(SinkEvent::Spaces(count));
    }

    fn insert_rule(&mut self) {
        self.events.push(SinkEvent::Rule);
    }

    fn suspend_for_advance(&mut self, label: &str) {
        self.events.push(SinkEvent::Suspend(label.to_string()));
    }

    fn clear(&mut self) {
        self.events.push(SinkEvent::Clear);
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        self.progress.push((processed, total));
    }
}

#[derive(Debug, Default)]
struct Log {
    tokens: Vec<usize>,
    displayed: String,
    function_calls: Vec<Vec<String>>,
    finished: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Rc<RefCell<Log>>,
}

impl Recorder {
    /// Queue indices of processed tokens.
    pub fn tokens(&self) -> Vec<usize> {
        self.log.borrow().tokens.clone()
    }

    pub fn displayed(&self) -> String {
        self.log.borrow().displayed.clone()
    }

    pub fn function_calls(&self) -> Vec<Vec<String>> {
        self.log.borrow().function_calls.clone()
    }

    pub fn finished(&self) -> usize {
        self.log.borrow().finished
    }
}

impl PlaybackObserver for Recorder {
    fn on_token(&mut self, token: &Token) {
        self.log.borrow_mut().tokens.push(token.index);
    }

    fn on_character_displayed(&mut self, token: &Token) {
        if let Some(text) = token.text() {
            self.log.borrow_mut().displayed.push_str(text);
        }
    }

    fn on_function_tag(&mut self, args: &[String]) {
        self.log.borrow_mut().function_calls.push(args.to_vec());
    }

    fn on_finish(&mut self) {
        self.log.borrow_mut().finished += 1;
    }
}

/// One compact string per token, e.g. `Display("a", bold)` or `Tag(sleep ["20"])`.
pub fn summarize(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(ToString::to_string).collect()
}

/// Concatenated text of the display tokens.
pub fn display_text(tokens: &[Token]) -> String {
    tokens.iter().filter_map(Token::text).collect()
}
