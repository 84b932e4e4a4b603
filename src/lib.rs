//! # tw
//!
//! Tooling for typewriter markup: plain text interleaved with bracketed tags
//! (`[sleep 500]`, `[color #ff0000]`, `[newpage]`), toggled inline styles
//! (`*bold*`, `/italic/`) and `{{# ... #}}` comments, one of which may be a
//! `{{#timecalc ... #}}` directive carrying per-character timing.
//!
//! File Layout
//!
//!     src/tw
//!       ├── lexing      Source text to the finalized token queue
//!       ├── tags        Tag handler table shared by both consumers
//!       ├── playback    Timed reveal of a token queue into a Sink
//!       └── analysis    Whole-document diagnostics, colors and durations
//!
//!     Both consumers replay the same token queue. Playback does it step by
//!     step under a scheduler; analysis does it line by line in one pass.
//!
//! For test helpers shared by the unit and integration tests, see [tw::testing].

#![allow(rustdoc::invalid_html_tags)]

pub mod tw;
