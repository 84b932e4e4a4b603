//! Playback engine
//!
//!     Reveals a finalized token queue one token at a time. Each processed token applies
//!     its effect to a [`Sink`] and schedules the next step after the token's delay on a
//!     [`Scheduler`]; no two tokens are ever processed at once.
//!
//! States
//!
//!     Idle ──start──▶ Playing ──pause──▶ Paused ──resume──▶ Playing
//!                        │
//!                        ├──[newpage]──▶ AwaitingPageAdvance ──advance_page──▶ Playing
//!                        │
//!                        └──queue exhausted──▶ Finished
//!
//!     `restart` works from every state: the pending step is cancelled, the cursor and
//!     visual state reset, and playback starts over on a cleared sink. A page suspension
//!     ignores `pause`/`resume`; only `advance_page` leaves it.
//!
//! Delays
//!
//!     A token's delay comes from the tag registry (see [tags](crate::tw::tags)). The
//!     transient override set with [`Playback::set_speed_override`] replaces every delay
//!     except a `sleep`.
//!
//!     In instant mode the scheduler is bypassed and the whole queue is rendered in one
//!     synchronous pass. Page breaks are drawn but do not suspend, and function tags are
//!     not invoked because the reveal is never actually playing.

pub mod html;
pub mod output;
pub mod scheduler;
pub mod sink;
pub mod terminal;

use crate::tw::config::{PlaybackOptions, TypewriterConfig};
use crate::tw::lexing::tokenize;
use crate::tw::tags::{self, ArgIssue, Delay, Effect, TagDefaults, TagState};
use crate::tw::token::{Token, TokenKind};
use std::sync::Arc;
use std::time::Duration;

pub use html::HtmlSink;
pub use output::OutputSink;
pub use scheduler::{millis, Scheduler, TimerId, TokioScheduler, VirtualScheduler};
pub use sink::{Sink, StyledRun};
pub use terminal::TerminalSink;

/// Callbacks invoked while playing. Every method defaults to a no-op.
pub trait PlaybackObserver {
    fn on_token(&mut self, _token: &Token) {}
    fn on_character_displayed(&mut self, _token: &Token) {}
    fn on_function_tag(&mut self, _args: &[String]) {}
    fn on_finish(&mut self) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl PlaybackObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Idle,
    Playing,
    Paused,
    AwaitingPageAdvance,
    Finished,
}

enum Outcome {
    Continue(f64),
    Suspend,
}

pub struct Playback<K: Sink, S: Scheduler> {
    queue: Arc<[Token]>,
    options: PlaybackOptions,
    defaults: TagDefaults,
    sink: K,
    scheduler: S,
    observer: Box<dyn PlaybackObserver>,
    state: TagState,
    speed_override: Option<f64>,
    index: usize,
    mode: PlaybackMode,
    pending: Option<TimerId>,
    finish_notified: bool,
}

impl<K: Sink, S: Scheduler> Playback<K, S> {
    pub fn new(tokens: Vec<Token>, options: PlaybackOptions, sink: K, scheduler: S) -> Self {
        let defaults = TagDefaults {
            char_delay: options.char_delay,
            foreground: options.default_text_color,
            background: options.default_background_color,
        };
        Self {
            queue: tokens.into(),
            options,
            state: TagState::new(&defaults),
            defaults,
            sink,
            scheduler,
            observer: Box::new(NoopObserver),
            speed_override: None,
            index: 0,
            mode: PlaybackMode::Idle,
            pending: None,
            finish_notified: false,
        }
    }

    /// Tokenize `source` with the configured markup and set up playback over it.
    pub fn from_source(source: &str, config: &TypewriterConfig, sink: K, scheduler: S) -> Self {
        let tokens = tokenize(source, &config.markup);
        Self::new(tokens, config.playback.clone(), sink, scheduler)
    }

    pub fn with_observer(mut self, observer: impl PlaybackObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> &TagState {
        &self.state
    }

    pub fn queue(&self) -> &[Token] {
        &self.queue
    }

    /// `(processed, total)` tokens.
    pub fn progress(&self) -> (usize, usize) {
        (self.index, self.queue.len())
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn speed_override(&self) -> Option<f64> {
        self.speed_override
    }

    /// Set or clear the transient override. It applies from the next scheduled step.
    pub fn set_speed_override(&mut self, millis: Option<f64>) {
        self.speed_override = millis;
    }

    /// Start playing. A finished run starts over and a paused one resumes.
    pub fn start(&mut self) {
        match self.mode {
            PlaybackMode::Idle | PlaybackMode::Finished => {
                self.reset();
                self.sink.clear();
                if self.options.instant {
                    self.render_instantly();
                } else {
                    self.set_mode(PlaybackMode::Playing);
                    self.process_next();
                }
            }
            PlaybackMode::Paused => self.resume(),
            PlaybackMode::Playing | PlaybackMode::AwaitingPageAdvance => {}
        }
    }

    pub fn pause(&mut self) {
        if self.mode == PlaybackMode::Playing {
            self.cancel_pending();
            self.set_mode(PlaybackMode::Paused);
        }
    }

    /// Continue from the current position. The next token is processed immediately.
    pub fn resume(&mut self) {
        if self.mode == PlaybackMode::Paused {
            self.set_mode(PlaybackMode::Playing);
            self.process_next();
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.mode {
            PlaybackMode::Playing => self.pause(),
            PlaybackMode::Paused => self.resume(),
            _ => {}
        }
    }

    pub fn restart(&mut self) {
        self.cancel();
        self.start();
    }

    /// Stop without restarting: the pending step is dropped and the cursor rewinds.
    pub fn cancel(&mut self) {
        self.cancel_pending();
        self.reset();
        self.set_mode(PlaybackMode::Idle);
    }

    /// Leave a page suspension: the surface is cleared and playback continues.
    pub fn advance_page(&mut self) {
        if self.mode == PlaybackMode::AwaitingPageAdvance {
            self.sink.clear();
            self.set_mode(PlaybackMode::Playing);
            self.process_next();
        }
    }

    /// Deliver a fired timer. Ids of cancelled steps are ignored.
    pub fn fire(&mut self, id: TimerId) {
        if self.pending == Some(id) {
            self.pending = None;
            self.process_next();
        } else {
            tracing::trace!(?id, "ignoring stale timer");
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.state = TagState::new(&self.defaults);
        self.finish_notified = false;
    }

    fn set_mode(&mut self, mode: PlaybackMode) {
        if self.mode != mode {
            tracing::debug!(from = ?self.mode, to = ?mode, index = self.index, "playback");
            self.mode = mode;
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }

    fn process_next(&mut self) {
        if self.mode != PlaybackMode::Playing {
            return;
        }
        if self.index >= self.queue.len() {
            self.finish();
            return;
        }

        let outcome = self.render_current(true);
        self.index += 1;

        if self.index >= self.queue.len() {
            self.finish();
            return;
        }

        match outcome {
            Outcome::Suspend => self.set_mode(PlaybackMode::AwaitingPageAdvance),
            Outcome::Continue(delay) => {
                self.pending = Some(self.scheduler.schedule_after(millis(delay)));
            }
        }
    }

    fn render_instantly(&mut self) {
        while self.index < self.queue.len() {
            self.render_current(false);
            self.index += 1;
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.cancel_pending();
        self.set_mode(PlaybackMode::Finished);
        if !self.finish_notified {
            self.finish_notified = true;
            self.observer.on_finish();
        }
    }

    /// Apply the token under the cursor and work out how long to wait after it.
    fn render_current(&mut self, playing: bool) -> Outcome {
        let queue = Arc::clone(&self.queue);
        let token = &queue[self.index];
        let total = queue.len();

        self.observer.on_token(token);
        self.sink.report_progress(self.index + 1, total);
        tracing::trace!(index = self.index, %token, "render");

        match &token.kind {
            TokenKind::Display { text, styles } => {
                self.sink.append_run(&StyledRun {
                    text,
                    styles: *styles,
                    foreground: self.state.foreground,
                    background: self.state.background,
                    index: token.index,
                });
                self.observer.on_character_displayed(token);
                let delay = tags::display_delay(&self.options, text, self.state.speed);
                Outcome::Continue(self.speed_override.unwrap_or(delay))
            }
            TokenKind::Tag(tag) => match tags::lookup(&tag.name) {
                Some(spec) => {
                    let applied = spec.apply(&self.state, &tag.args, &self.defaults);
                    if let Some(issue) = &applied.issue {
                        warn_issue(&tag.raw, issue);
                    }
                    self.state = applied.state;

                    match applied.effect {
                        Effect::None => {}
                        Effect::LineBreaks(count) => {
                            for _ in 0..count {
                                self.sink.break_line();
                            }
                        }
                        Effect::Rule => self.sink.insert_rule(),
                        Effect::Spaces(count) => self.sink.insert_spaces(count),
                        Effect::PageBreak => {
                            self.sink.suspend_for_advance(&self.options.newpage_text)
                        }
                        Effect::Call => {
                            if playing {
                                self.observer.on_function_tag(&tag.args);
                            }
                        }
                    }

                    match applied.delay {
                        Delay::Suspend if playing => Outcome::Suspend,
                        Delay::Suspend => Outcome::Continue(0.0),
                        Delay::Fixed(delay) => Outcome::Continue(delay),
                        delay => {
                            let resolved = delay
                                .resolve(&self.options, self.state.speed)
                                .unwrap_or(self.options.char_delay);
                            Outcome::Continue(self.speed_override.unwrap_or(resolved))
                        }
                    }
                }
                None => {
                    self.sink.append_run(&StyledRun {
                        text: &tag.raw,
                        styles: Default::default(),
                        foreground: self.state.foreground,
                        background: self.state.background,
                        index: token.index,
                    });
                    let delay = Delay::Char
                        .resolve(&self.options, self.state.speed)
                        .unwrap_or(self.options.char_delay);
                    Outcome::Continue(self.speed_override.unwrap_or(delay))
                }
            },
        }
    }
}

fn warn_issue(raw: &str, issue: &ArgIssue) {
    match issue {
        ArgIssue::Missing { default } => {
            tracing::warn!(tag = raw, default, "missing argument, using default")
        }
        ArgIssue::NotNumeric { arg, default } => {
            tracing::warn!(tag = raw, arg = %arg, default, "argument is not a number, using default")
        }
        ArgIssue::Unexpected(count) => {
            tracing::debug!(tag = raw, count, "ignoring unexpected arguments")
        }
        ArgIssue::Color(error) => {
            tracing::warn!(tag = raw, %error, "invalid color, keeping the current one")
        }
    }
}

impl<K: Sink> Playback<K, VirtualScheduler> {
    /// Move the simulated clock forward, firing every step that falls due on the way.
    pub fn advance(&mut self, by: Duration) {
        let target = self.scheduler.now().saturating_add(by);
        while let Some(id) = self.scheduler.pop_due(target) {
            self.fire(id);
        }
        self.scheduler.advance_to(target);
    }

    /// Fire steps until nothing is pending and return the simulated time reached. Stops
    /// early at a page suspension or a pause.
    pub fn run_to_end(&mut self) -> Duration {
        while let Some(id) = self.scheduler.pop_next() {
            self.fire(id);
        }
        self.scheduler.now()
    }

    pub fn elapsed(&self) -> Duration {
        self.scheduler.now()
    }
}
