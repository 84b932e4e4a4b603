//! HTML buffer sink
//!
//!     Accumulates the reveal as an HTML fragment. Every displayed grapheme becomes a
//!     `span` carrying its queue index and colors, with the style wrappers nested from
//!     the inside out: `<i>`, `<b>`, `<u>`, `<s>`.

use super::sink::{Sink, StyledRun};
use crate::tw::token::Style;
use std::fmt::Write as _;

pub const NEWPAGE_CLASS: &str = "typewriter-newpage";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlSink {
    buffer: String,
    progress: (usize, usize),
}

impl HtmlSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Last `(processed, total)` reported by playback.
    pub fn progress(&self) -> (usize, usize) {
        self.progress
    }
}

fn wrapper(style: Style) -> &'static str {
    match style {
        Style::Italic => "i",
        Style::Bold => "b",
        Style::Underline => "u",
        Style::Strikethrough => "s",
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Sink for HtmlSink {
    fn append_run(&mut self, run: &StyledRun<'_>) {
        let mut content = escape_html(run.text);
        for style in Style::ALL {
            if run.styles.contains(style) {
                let tag = wrapper(style);
                content = format!("<{tag}>{content}</{tag}>");
            }
        }
        let _ = write!(
            self.buffer,
            r#"<span data-index="{}" style="color: {}; background-color: {}">{}</span>"#,
            run.index,
            run.foreground.to_css(),
            run.background.to_css(),
            content
        );
    }

    fn break_line(&mut self) {
        self.buffer.push_str("<br>");
    }

    fn insert_spaces(&mut self, count: usize) {
        self.buffer.push_str(&"&nbsp;".repeat(count));
    }

    fn insert_rule(&mut self) {
        self.buffer.push_str("<hr>");
    }

    fn suspend_for_advance(&mut self, label: &str) {
        let _ = write!(
            self.buffer,
            r#"<hr><div class="{}">{}</div><hr>"#,
            NEWPAGE_CLASS,
            escape_html(label)
        );
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        self.progress = (processed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::color::Color;
    use crate::tw::token::StyleSet;

    fn run(text: &str, styles: StyleSet) -> StyledRun<'_> {
        StyledRun {
            text,
            styles,
            foreground: Color::rgb(255, 0, 0),
            background: Color::WHITE,
            index: 3,
        }
    }

    #[test]
    fn test_styles_nest_italic_innermost() {
        let mut sink = HtmlSink::new();
        let styles = StyleSet::empty()
            .with(Style::Strikethrough)
            .with(Style::Bold)
            .with(Style::Italic);
        sink.append_run(&run("a", styles));
        insta::assert_snapshot!(sink.as_str(), @r#"<span data-index="3" style="color: #ff0000; background-color: #ffffff"><s><b><i>a</i></b></s></span>"#);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut sink = HtmlSink::new();
        sink.append_run(&run("<", StyleSet::empty()));
        assert!(sink.as_str().contains(">&lt;</span>"));
    }

    #[test]
    fn test_structural_effects() {
        let mut sink = HtmlSink::new();
        sink.break_line();
        sink.insert_spaces(2);
        sink.insert_rule();
        sink.suspend_for_advance("Next");
        insta::assert_snapshot!(sink.as_str(), @r#"<br>&nbsp;&nbsp;<hr><hr><div class="typewriter-newpage">Next</div><hr>"#);

        sink.clear();
        assert_eq!(sink.as_str(), "");
    }
}
