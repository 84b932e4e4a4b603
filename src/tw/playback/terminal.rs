//! Terminal sink
//!
//!     Renders the reveal live through crossterm. Line breaks are written as `\r\n` so the
//!     output is correct with raw mode enabled. Sink calls cannot fail, so the first I/O
//!     error is kept and the rest of the run is skipped; the host collects it with
//!     [`TerminalSink::take_error`].

use super::sink::{Sink, StyledRun};
use crate::tw::color::Color;
use crate::tw::token::Style;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, SetTitle};
use std::io::{self, Write};

const FALLBACK_WIDTH: u16 = 40;

pub struct TerminalSink<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_with(&mut self, write: impl FnOnce(&mut W) -> io::Result<()>) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = write(&mut self.out).and_then(|_| self.out.flush()) {
            tracing::warn!(%error, "terminal output failed");
            self.error = Some(error);
        }
    }
}

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

fn attribute(style: Style) -> Attribute {
    match style {
        Style::Italic => Attribute::Italic,
        Style::Bold => Attribute::Bold,
        Style::Underline => Attribute::Underlined,
        Style::Strikethrough => Attribute::CrossedOut,
    }
}

impl<W: Write> Sink for TerminalSink<W> {
    fn append_run(&mut self, run: &StyledRun<'_>) {
        self.write_with(|out| {
            queue!(
                out,
                SetForegroundColor(term_color(run.foreground)),
                SetBackgroundColor(term_color(run.background))
            )?;
            for style in run.styles.iter() {
                queue!(out, SetAttribute(attribute(style)))?;
            }
            queue!(
                out,
                Print(run.text),
                SetAttribute(Attribute::Reset),
                ResetColor
            )
        });
    }

    fn break_line(&mut self) {
        self.write_with(|out| queue!(out, Print("\r\n")));
    }

    fn insert_spaces(&mut self, count: usize) {
        self.write_with(|out| queue!(out, Print(" ".repeat(count))));
    }

    fn insert_rule(&mut self) {
        let width = terminal::size()
            .map(|(columns, _)| columns)
            .unwrap_or(FALLBACK_WIDTH);
        self.write_with(|out| {
            queue!(
                out,
                Print("\r\n"),
                Print("─".repeat(usize::from(width))),
                Print("\r\n")
            )
        });
    }

    fn suspend_for_advance(&mut self, label: &str) {
        self.write_with(|out| {
            queue!(
                out,
                Print("\r\n\r\n"),
                SetAttribute(Attribute::Reverse),
                Print(format!(" {} ", label)),
                SetAttribute(Attribute::Reset),
                Print("\r\n")
            )
        });
    }

    fn clear(&mut self) {
        self.write_with(|out| queue!(out, Clear(ClearType::All), MoveTo(0, 0)));
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        self.write_with(|out| queue!(out, SetTitle(format!("tw {}/{}", processed, total))));
    }
}
