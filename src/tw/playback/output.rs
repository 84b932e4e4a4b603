//! Sink selection by configuration.
//!
//!     [`OutputSink`] is what a host hands to playback when the output mode comes from
//!     [`PlaybackOptions::output`](crate::tw::config::PlaybackOptions). The engine still
//!     only sees a [`Sink`].

use super::html::HtmlSink;
use super::sink::{Sink, StyledRun};
use super::terminal::TerminalSink;
use crate::tw::config::OutputMode;
use std::io::{self, Write};

pub enum OutputSink<W: Write> {
    Buffered(HtmlSink),
    Live(TerminalSink<W>),
}

impl<W: Write> OutputSink<W> {
    /// `out` is only written to in live mode.
    pub fn for_mode(mode: OutputMode, out: W) -> Self {
        match mode {
            OutputMode::Buffered => OutputSink::Buffered(HtmlSink::new()),
            OutputMode::Live => OutputSink::Live(TerminalSink::new(out)),
        }
    }

    pub fn mode(&self) -> OutputMode {
        match self {
            OutputSink::Buffered(_) => OutputMode::Buffered,
            OutputSink::Live(_) => OutputMode::Live,
        }
    }

    /// The accumulated markup in buffered mode.
    pub fn markup(&self) -> Option<&str> {
        match self {
            OutputSink::Buffered(html) => Some(html.as_str()),
            OutputSink::Live(_) => None,
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        match self {
            OutputSink::Buffered(_) => None,
            OutputSink::Live(terminal) => terminal.take_error(),
        }
    }

    fn inner(&mut self) -> &mut dyn Sink {
        match self {
            OutputSink::Buffered(html) => html,
            OutputSink::Live(terminal) => terminal,
        }
    }
}

impl<W: Write> Sink for OutputSink<W> {
    fn append_run(&mut self, run: &StyledRun<'_>) {
        self.inner().append_run(run)
    }

    fn break_line(&mut self) {
        self.inner().break_line()
    }

    fn insert_spaces(&mut self, count: usize) {
        self.inner().insert_spaces(count)
    }

    fn insert_rule(&mut self) {
        self.inner().insert_rule()
    }

    fn suspend_for_advance(&mut self, label: &str) {
        self.inner().suspend_for_advance(label)
    }

    fn clear(&mut self) {
        self.inner().clear()
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        self.inner().report_progress(processed, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::config::{MarkupSyntax, PlaybackOptions};
    use crate::tw::lexing::tokenize;
    use crate::tw::playback::{Playback, VirtualScheduler};

    fn play(mode: OutputMode) -> OutputSink<Vec<u8>> {
        let options = PlaybackOptions {
            output: mode,
            instant: true,
            ..PlaybackOptions::default()
        };
        let sink = OutputSink::for_mode(options.output, Vec::new());
        let mut playback = Playback::new(
            tokenize("a[newline]b", &MarkupSyntax::default()),
            options,
            sink,
            VirtualScheduler::new(),
        );
        playback.start();
        playback.into_sink()
    }

    #[test]
    fn test_buffered_mode_collects_markup() {
        let sink = play(OutputMode::Buffered);
        assert_eq!(sink.mode(), OutputMode::Buffered);
        let markup = sink.markup().unwrap();
        assert!(markup.contains("<br>"));
        assert!(markup.contains(">a</span>"));
    }

    #[test]
    fn test_live_mode_writes_to_the_terminal() {
        let sink = play(OutputMode::Live);
        assert!(sink.markup().is_none());
        let OutputSink::Live(mut terminal) = sink else {
            panic!("expected live output");
        };
        assert!(terminal.take_error().is_none());
        let written = String::from_utf8(terminal.into_inner()).unwrap();
        assert!(written.contains('a'));
        assert!(written.contains("\r\n"));
        assert!(!written.contains("<br>"));
    }
}
