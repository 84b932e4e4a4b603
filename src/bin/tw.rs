//! Command-line interface for tw
//! Checks, renders and plays typewriter markup files.
//!
//! Usage:
//!   tw check `<path>` [--format `<format>`]     - Report diagnostics and timing
//!   tw render `<path>` [--duration]             - Render the final page(s) as HTML
//!   tw play `<path>` [--instant] [--speed `<ms>`] [--output `<mode>`]
//!                                             - Play the reveal on real timers
//!   tw tokens `<path>` [--format `<format>`]    - Dump the token queue
//!   tw tags                                   - List the registered tags
//!
//! Configuration is layered: built-in defaults, then `tw.toml` in the working directory
//! if present, then the file given with `--config`, then command-line flags. Logging
//! goes to stderr and is controlled with `RUST_LOG`.

use clap::{Arg, ArgAction, ArgMatches, Command};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tw::tw::analysis::{Analysis, AnalysisOptions};
use tw::tw::config::{Loader, OutputMode, TypewriterConfig};
use tw::tw::lexing::tokenize;
use tw::tw::playback::{
    HtmlSink, OutputSink, Playback, PlaybackMode, Scheduler, Sink, TimerId, TokioScheduler,
    VirtualScheduler,
};
use tw::tw::tags::TAGS;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let matches = Command::new("tw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for checking, rendering and playing typewriter markup")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the built-in defaults"),
        )
        .subcommand(
            Command::new("check")
                .about("Report diagnostics and timing for a file")
                .arg(path_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["text", "json", "yaml"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Render the file as HTML without delays")
                .arg(path_arg())
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .help("Also print the simulated playback duration to stderr")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("play")
                .about("Play the reveal (live keys: space pause, enter next page, r restart, q quit)")
                .arg(path_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Write live to the terminal or print HTML per page")
                        .value_parser(["live", "buffered"]),
                )
                .arg(
                    Arg::new("instant")
                        .long("instant")
                        .help("Show everything at once")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("speed")
                        .long("speed")
                        .short('s')
                        .help("Fixed delay in milliseconds for every step")
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new("tokens")
                .about("Dump the token queue of a file")
                .arg(path_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(Command::new("tags").about("List the registered tags"))
        .get_matches();

    let loader = loader(matches.get_one::<String>("config"));

    match matches.subcommand() {
        Some(("play", play_matches)) => {
            let mut loader = loader;
            if play_matches.get_flag("instant") {
                loader = loader
                    .set_override("playback.instant", true)
                    .unwrap_or_else(|e| fail("Error loading configuration", e));
            }
            if let Some(output) = play_matches.get_one::<String>("output") {
                loader = loader
                    .set_override("playback.output", output.as_str())
                    .unwrap_or_else(|e| fail("Error loading configuration", e));
            }
            let config = build(loader);
            let speed = play_matches.get_one::<f64>("speed").copied();
            handle_play_command(&path(play_matches), speed, &config).await;
            return;
        }
        Some(("tags", _)) => {
            handle_tags_command();
            return;
        }
        _ => {}
    }

    let config = build(loader);
    match matches.subcommand() {
        Some(("check", check_matches)) => {
            let format = check_matches.get_one::<String>("format").unwrap();
            handle_check_command(&path(check_matches), format, &config);
        }
        Some(("render", render_matches)) => {
            handle_render_command(
                &path(render_matches),
                render_matches.get_flag("duration"),
                &config,
            );
        }
        Some(("tokens", tokens_matches)) => {
            let format = tokens_matches.get_one::<String>("format").unwrap();
            handle_tokens_command(&path(tokens_matches), format, &config);
        }
        _ => unreachable!(),
    }
}

fn path_arg() -> Arg {
    Arg::new("path")
        .help("Path to the markup file")
        .required(true)
        .index(1)
}

fn path(matches: &ArgMatches) -> String {
    matches.get_one::<String>("path").unwrap().clone()
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn loader(path: Option<&String>) -> Loader {
    let loader = Loader::new().with_optional_file("tw.toml");
    match path {
        Some(path) => loader.with_file(path),
        None => loader,
    }
}

fn build(loader: Loader) -> TypewriterConfig {
    loader
        .build()
        .unwrap_or_else(|e| fail("Error loading configuration", e))
}

fn read_source(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| fail("Error reading file", e))
}

/// Handle the check command. Exits with status 1 when any error is reported.
fn handle_check_command(path: &str, format: &str, config: &TypewriterConfig) {
    let source = read_source(path);
    let analysis = Analysis::analyze(&source, &AnalysisOptions::from(config));
    let report = analysis.report();

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| fail("Error formatting report", e));
            println!("{}", json);
        }
        "yaml" => {
            let yaml = serde_yaml::to_string(&report)
                .unwrap_or_else(|e| fail("Error formatting report", e));
            print!("{}", yaml);
        }
        _ => {
            for diagnostic in &report.diagnostics {
                println!(
                    "{}:{}:{}: {}{}: {}",
                    path,
                    diagnostic.range.start.line + 1,
                    diagnostic.range.start.column + 1,
                    diagnostic.severity,
                    diagnostic
                        .code
                        .as_deref()
                        .map(|code| format!(" [{}]", code))
                        .unwrap_or_default(),
                    diagnostic.message
                );
            }
            match report.document_duration {
                Some(total) => println!(
                    "duration: {}{} ms",
                    if total.lower_bound { "at least " } else { "" },
                    total.duration_ms
                ),
                None => println!("duration: no timecalc block"),
            }
        }
    }

    if analysis.has_errors() {
        std::process::exit(1);
    }
}

/// Handle the render command
fn handle_render_command(path: &str, duration: bool, config: &TypewriterConfig) {
    let source = read_source(path);

    let mut instant = config.clone();
    instant.playback.instant = true;
    let mut playback = Playback::from_source(
        &source,
        &instant,
        HtmlSink::new(),
        VirtualScheduler::new(),
    );
    playback.start();
    print!("{}", playback.into_sink().into_string());

    if duration {
        let elapsed = simulate(&source, config);
        eprintln!("duration: {} ms", elapsed.as_secs_f64() * 1000.0);
    }
}

/// Play the whole file on a simulated clock, advancing every page immediately.
fn simulate(source: &str, config: &TypewriterConfig) -> Duration {
    let mut playback = Playback::from_source(
        source,
        config,
        HtmlSink::new(),
        VirtualScheduler::new(),
    );
    playback.start();
    loop {
        let elapsed = playback.run_to_end();
        if playback.mode() != PlaybackMode::AwaitingPageAdvance {
            return elapsed;
        }
        playback.advance_page();
    }
}

/// Handle the play command
async fn handle_play_command(path: &str, speed: Option<f64>, config: &TypewriterConfig) {
    let source = read_source(path);
    let (scheduler, fired) = TokioScheduler::new();
    let sink = OutputSink::for_mode(config.playback.output, io::stdout());
    let mut playback = Playback::from_source(&source, config, sink, scheduler);
    playback.set_speed_override(speed);

    let result = match config.playback.output {
        OutputMode::Live => {
            enable_raw_mode().unwrap_or_else(|e| fail("Error setting up terminal", e));
            let result = play_live(&mut playback, fired).await;
            result.and(disable_raw_mode())
        }
        OutputMode::Buffered => play_buffered(&mut playback, fired).await,
    };

    if let Err(e) = result {
        fail("Error", e);
    }
}

type Player = Playback<OutputSink<io::Stdout>, TokioScheduler>;

async fn play_live(playback: &mut Player, mut fired: UnboundedReceiver<TimerId>) -> io::Result<()> {
    let (key_sender, mut keys) = unbounded_channel();
    std::thread::spawn(move || forward_keys(key_sender));

    playback.start();
    loop {
        if let Some(error) = playback.sink_mut().take_error() {
            return Err(error);
        }

        tokio::select! {
            Some(id) = fired.recv() => playback.fire(id),
            key = keys.recv() => match key {
                Some(key) if handle_key_event(key, playback) => {}
                _ => return Ok(()),
            },
        }
    }
}

/// Play without a reader: every page is printed as HTML and advanced right away.
async fn play_buffered(
    playback: &mut Player,
    mut fired: UnboundedReceiver<TimerId>,
) -> io::Result<()> {
    playback.start();
    loop {
        match playback.mode() {
            PlaybackMode::Playing => match fired.recv().await {
                Some(id) => playback.fire(id),
                None => return Ok(()),
            },
            PlaybackMode::AwaitingPageAdvance => {
                print_page(playback);
                playback.advance_page();
            }
            _ => {
                print_page(playback);
                return Ok(());
            }
        }
    }
}

fn print_page(playback: &Player) {
    if let Some(markup) = playback.sink().markup() {
        println!("{}", markup);
    }
}

/// Blocking crossterm reads run on their own thread and are handed to the async loop.
fn forward_keys(sender: UnboundedSender<KeyEvent>) {
    loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if sender.send(key).is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "reading terminal events failed");
                return;
            }
        }
    }
}

/// Apply a key press. Returns false when playback should stop.
fn handle_key_event<K: Sink, S: Scheduler>(key: KeyEvent, playback: &mut Playback<K, S>) -> bool {
    match key.code {
        KeyCode::Char('q') if key.modifiers.is_empty() => false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => false,
        KeyCode::Char(' ') => {
            playback.toggle_pause();
            true
        }
        KeyCode::Enter => {
            playback.advance_page();
            true
        }
        KeyCode::Char('r') => {
            playback.restart();
            true
        }
        _ => true,
    }
}

/// Handle the tokens command
fn handle_tokens_command(path: &str, format: &str, config: &TypewriterConfig) {
    let source = read_source(path);
    let tokens = tokenize(&source, &config.markup);

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&tokens)
                .unwrap_or_else(|e| fail("Error formatting tokens", e));
            println!("{}", json);
        }
        _ => {
            for token in &tokens {
                println!("{:>4} {} @ {}", token.index, token, token.location.start);
            }
        }
    }
}

/// Handle the tags command
fn handle_tags_command() {
    println!("Registered tags:\n");
    for spec in TAGS {
        println!("  {:<12} {:<14} {}", spec.name, spec.args.to_string(), spec.example);
        println!("    {}", spec.detail);
        println!();
    }
}
