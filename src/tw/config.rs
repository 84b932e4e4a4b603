//! Configuration for tokenizing and playback.
//!
//! `defaults/tw.default.toml` is embedded into every binary so that docs and runtime
//! behavior stay in sync. Applications layer user-specific files on top of those
//! defaults via [`Loader`] before deserializing into [`TypewriterConfig`].

use crate::tw::color::Color;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

const DEFAULT_TOML: &str = include_str!("../../defaults/tw.default.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("custom delay key `{0}` must be exactly one character")]
    CustomDelayKey(String),
    #[error("style marker `{0}` is used for more than one purpose")]
    DuplicateMarker(char),
}

/// Top-level configuration consumed by tw applications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypewriterConfig {
    pub markup: MarkupSyntax,
    pub playback: PlaybackOptions,
}

/// The characters with special meaning outside of tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MarkupSyntax {
    pub italic: char,
    pub bold: char,
    pub underline: char,
    pub strikethrough: char,
    pub escape: char,
}

impl Default for MarkupSyntax {
    fn default() -> Self {
        Self {
            italic: '/',
            bold: '*',
            underline: '_',
            strikethrough: '-',
            escape: '\\',
        }
    }
}

impl MarkupSyntax {
    fn markers(&self) -> [char; 5] {
        [
            self.italic,
            self.bold,
            self.underline,
            self.strikethrough,
            self.escape,
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let markers = self.markers();
        for (i, marker) in markers.iter().enumerate() {
            if markers[i + 1..].contains(marker) {
                return Err(ConfigError::DuplicateMarker(*marker));
            }
        }
        Ok(())
    }
}

/// Which sink a host builds for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Accumulate markup into an in-memory buffer
    #[default]
    Buffered,
    /// Write directly to a live surface
    Live,
}

/// Knobs of the playback engine. Delays are milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaybackOptions {
    pub char_delay: f64,
    pub newline_delay: f64,
    #[serde(default)]
    pub custom_delays: HashMap<String, f64>,
    pub newpage_text: String,
    pub default_text_color: Color,
    pub default_background_color: Color,
    #[serde(default)]
    pub output: OutputMode,
    #[serde(default)]
    pub instant: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            char_delay: 100.0,
            newline_delay: 200.0,
            custom_delays: HashMap::new(),
            newpage_text: "New Page".to_string(),
            default_text_color: Color::BLACK,
            default_background_color: Color::WHITE,
            output: OutputMode::Buffered,
            instant: false,
        }
    }
}

impl PlaybackOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self
            .custom_delays
            .keys()
            .find(|key| key.graphemes(true).count() != 1)
        {
            Some(key) => Err(ConfigError::CustomDelayKey(key.clone())),
            None => Ok(()),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file, format chosen by extension. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder, deserialize and validate the resulting configuration.
    pub fn build(self) -> Result<TypewriterConfig, ConfigError> {
        let config: TypewriterConfig = self.builder.build()?.try_deserialize()?;
        config.markup.validate()?;
        config.playback.validate()?;
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<TypewriterConfig, ConfigError> {
    Loader::new().build()
}
