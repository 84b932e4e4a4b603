//! The surface playback renders onto.
//!
//!     The engine resolves every tag effect itself and only ever talks to a [`Sink`]
//!     through this narrow contract. Whether output lands in a string buffer or on a live
//!     terminal is decided by which sink the host hands in, never inside the engine. A host
//!     that follows the configured output mode hands in an
//!     [`OutputSink`](super::output::OutputSink).

use crate::tw::color::Color;
use crate::tw::token::StyleSet;

/// A displayed grapheme under the visual state active when it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun<'a> {
    pub text: &'a str,
    pub styles: StyleSet,
    pub foreground: Color,
    pub background: Color,
    /// Queue index of the token this run came from
    pub index: usize,
}

pub trait Sink {
    fn append_run(&mut self, run: &StyledRun<'_>);
    fn break_line(&mut self);
    /// Non-breaking spaces
    fn insert_spaces(&mut self, count: usize);
    fn insert_rule(&mut self);
    /// Present the page-break affordance. Playback stays suspended until the host
    /// advances the page.
    fn suspend_for_advance(&mut self, label: &str);
    fn clear(&mut self);
    fn report_progress(&mut self, _processed: usize, _total: usize) {}
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn append_run(&mut self, run: &StyledRun<'_>) {
        (**self).append_run(run)
    }

    fn break_line(&mut self) {
        (**self).break_line()
    }

    fn insert_spaces(&mut self, count: usize) {
        (**self).insert_spaces(count)
    }

    fn insert_rule(&mut self) {
        (**self).insert_rule()
    }

    fn suspend_for_advance(&mut self, label: &str) {
        (**self).suspend_for_advance(label)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        (**self).report_progress(processed, total)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn append_run(&mut self, run: &StyledRun<'_>) {
        (**self).append_run(run)
    }

    fn break_line(&mut self) {
        (**self).break_line()
    }

    fn insert_spaces(&mut self, count: usize) {
        (**self).insert_spaces(count)
    }

    fn insert_rule(&mut self) {
        (**self).insert_rule()
    }

    fn suspend_for_advance(&mut self, label: &str) {
        (**self).suspend_for_advance(label)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        (**self).report_progress(processed, total)
    }
}
