//! Integration tests for tag effects during playback
//!
//! Every case plays a short document on the simulated clock and checks what reached the
//! sink and how long the reveal took. The last token never schedules a wait, so a
//! trailing `x` makes the elapsed time equal to the tag's own delay.

use rstest::rstest;
use std::time::Duration;
use tw::tw::color::Color;
use tw::tw::config::{MarkupSyntax, PlaybackOptions};
use tw::tw::lexing::tokenize;
use tw::tw::playback::{Playback, PlaybackMode, TokioScheduler, VirtualScheduler};
use tw::tw::testing::{Recorder, RecordingSink, SinkEvent};

fn playback(source: &str) -> Playback<RecordingSink, VirtualScheduler> {
    Playback::new(
        tokenize(source, &MarkupSyntax::default()),
        PlaybackOptions::default(),
        RecordingSink::default(),
        VirtualScheduler::new(),
    )
}

/// Compact form of the visible sink events
fn events(sink: &RecordingSink) -> Vec<String> {
    sink.visible()
        .iter()
        .map(|event| match event {
            SinkEvent::Run { text, .. } => format!("run:{}", text),
            SinkEvent::Break => "break".to_string(),
            SinkEvent::Spaces(count) => format!("spaces:{}", count),
            SinkEvent::Rule => "rule".to_string(),
            SinkEvent::Suspend(label) => format!("suspend:{}", label),
            SinkEvent::Clear => "clear".to_string(),
        })
        .collect()
}

fn last_run_colors(sink: &RecordingSink) -> (Color, Color) {
    sink.visible()
        .iter()
        .rev()
        .find_map(|event| match event {
            SinkEvent::Run {
                foreground,
                background,
                ..
            } => Some((*foreground, *background)),
            _ => None,
        })
        .unwrap()
}

#[rstest]
#[case("[newline]x", &["break", "run:x"], 200)]
#[case("[linebreak]x", &["break", "break", "run:x"], 200)]
#[case("[sleep 20]x", &["run:x"], 20)]
#[case("[sleep]x", &["run:x"], 1000)]
#[case("[sleep abc]x", &["run:x"], 1000)]
#[case("[speed 30]x", &["run:x"], 30)]
#[case("[speed]x", &["run:x"], 100)]
#[case("[speeddefault]x", &["run:x"], 100)]
#[case("[tab]x", &["spaces:4", "run:x"], 100)]
#[case("[tab 2]x", &["spaces:2", "run:x"], 100)]
#[case("[tab wide]x", &["spaces:4", "run:x"], 100)]
#[case("[hr]x", &["rule", "run:x"], 100)]
#[case("[function intro]x", &["run:x"], 100)]
#[case("[color #f00]x", &["run:x"], 100)]
#[case("[foo bar]x", &["run:[foo bar]", "run:x"], 100)]
fn test_tag_effect_and_delay(
    #[case] source: &str,
    #[case] expected: &[&str],
    #[case] elapsed_ms: u64,
) {
    let mut playback = playback(source);
    playback.start();
    let elapsed = playback.run_to_end();

    assert_eq!(playback.mode(), PlaybackMode::Finished);
    assert_eq!(events(playback.sink()), expected);
    assert_eq!(elapsed, Duration::from_millis(elapsed_ms));
}

#[rstest]
#[case("[color 255 0 0]x", Color::rgb(255, 0, 0), Color::WHITE)]
#[case("[color #ff0000]x", Color::rgb(255, 0, 0), Color::WHITE)]
#[case("[color #f00]x", Color::rgb(255, 0, 0), Color::WHITE)]
#[case("[background 0 0 255]x", Color::BLACK, Color::rgb(0, 0, 255))]
#[case("[invert]x", Color::WHITE, Color::BLACK)]
#[case("[color #f00][resetcolor]x", Color::BLACK, Color::WHITE)]
#[case("[background #123][resetbg]x", Color::BLACK, Color::WHITE)]
#[case("[color nope]x", Color::BLACK, Color::WHITE)]
#[case("[color 300 0 0]x", Color::BLACK, Color::WHITE)]
fn test_color_state(#[case] source: &str, #[case] foreground: Color, #[case] background: Color) {
    let mut playback = playback(source);
    playback.start();
    playback.run_to_end();
    assert_eq!(last_run_colors(playback.sink()), (foreground, background));
}

#[test]
fn test_colors_persist_until_changed() {
    let mut playback = playback("a[color #f00]bc[color #00f]d");
    playback.start();
    playback.run_to_end();
    let foregrounds: Vec<Color> = playback
        .sink()
        .visible()
        .iter()
        .filter_map(|event| match event {
            SinkEvent::Run { foreground, .. } => Some(*foreground),
            _ => None,
        })
        .collect();
    let red = Color::rgb(255, 0, 0);
    let blue = Color::rgb(0, 0, 255);
    assert_eq!(foregrounds, vec![Color::BLACK, red, red, blue]);
}

#[test]
fn test_pages_play_through_with_advances() {
    let recorder = Recorder::default();
    let mut playback = playback("one[newpage]two[newpage]three").with_observer(recorder.clone());
    playback.start();

    let mut pages = Vec::new();
    loop {
        playback.run_to_end();
        pages.push(playback.sink().text());
        if playback.mode() != PlaybackMode::AwaitingPageAdvance {
            break;
        }
        playback.advance_page();
    }

    assert_eq!(pages, vec!["one", "two", "three"]);
    assert_eq!(recorder.finished(), 1);
    assert_eq!(recorder.displayed(), "onetwothree");
    // Every token once, page breaks included
    assert_eq!(recorder.tokens(), (0..13).collect::<Vec<_>>());
}

#[test]
fn test_transient_override_replaces_every_delay_but_sleep() {
    let mut playback = playback("[speed 30]a[newline][sleep 7]b");
    playback.set_speed_override(Some(2.0));
    playback.start();
    // speed(2) a(2) newline(2) sleep(7)
    assert_eq!(playback.run_to_end(), Duration::from_millis(13));
}

#[test]
fn test_progress_is_reported_per_token() {
    let mut playback = playback("a[hr]b");
    playback.start();
    playback.run_to_end();
    assert_eq!(playback.sink().progress(), &[(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_plays_on_real_timers() {
    let options = PlaybackOptions {
        char_delay: 1.0,
        newline_delay: 1.0,
        ..PlaybackOptions::default()
    };
    let (scheduler, mut fired) = TokioScheduler::new();
    let mut playback = Playback::new(
        tokenize("ab[newline]c", &MarkupSyntax::default()),
        options,
        RecordingSink::default(),
        scheduler,
    );

    playback.start();
    while playback.mode() == PlaybackMode::Playing {
        let id = tokio::time::timeout(Duration::from_secs(5), fired.recv())
            .await
            .unwrap()
            .unwrap();
        playback.fire(id);
    }

    assert_eq!(playback.mode(), PlaybackMode::Finished);
    assert_eq!(playback.sink().text(), "abc");
}
