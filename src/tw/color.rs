//! Color literals
//!
//!     Grammar: `#RGB` | `#RRGGBB` | three space-separated decimal integers in [0, 255].
//!
//!     Tags receive their arguments already split on whitespace, so the parser works on
//!     an argument slice: one argument for the hex forms, three for the decimal form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("missing color value")]
    Missing,
    #[error("invalid hex color `{0}`, expected #RGB or #RRGGBB")]
    InvalidHex(String),
    #[error("expected three color components, found {0}")]
    ComponentCount(usize),
    #[error("color component `{0}` is not an integer between 0 and 255")]
    InvalidComponent(String),
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a color from tag arguments.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ColorError> {
        match args {
            [] => Err(ColorError::Missing),
            [single] if single.as_ref().starts_with('#') => Self::parse_hex(single.as_ref()),
            [r, g, b] => Ok(Self::rgb(
                component(r.as_ref())?,
                component(g.as_ref())?,
                component(b.as_ref())?,
            )),
            other => Err(ColorError::ComponentCount(other.len())),
        }
    }

    /// Parse a single literal, either hex or space separated components.
    pub fn parse(literal: &str) -> Result<Self, ColorError> {
        let args: Vec<&str> = literal.split_whitespace().collect();
        Self::from_args(&args)
    }

    fn parse_hex(literal: &str) -> Result<Self, ColorError> {
        let digits = &literal[1..];
        let invalid = || ColorError::InvalidHex(literal.to_string());
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// CSS expression for this color.
    pub fn to_css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn component(text: &str) -> Result<u8, ColorError> {
    text.parse::<u8>()
        .map_err(|_| ColorError::InvalidComponent(text.to_string()))
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_css()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_decimal_forms_agree() {
        let red = Color::rgb(255, 0, 0);
        assert_eq!(Color::from_args(&["#ff0000"]), Ok(red));
        assert_eq!(Color::from_args(&["#F00"]), Ok(red));
        assert_eq!(Color::from_args(&["255", "0", "0"]), Ok(red));
        assert_eq!(Color::parse("255 0 0"), Ok(red));
    }

    #[test]
    fn test_rejects_bad_literals() {
        assert_eq!(Color::from_args::<&str>(&[]), Err(ColorError::Missing));
        assert!(matches!(
            Color::from_args(&["#ff00"]),
            Err(ColorError::InvalidHex(_))
        ));
        assert!(matches!(
            Color::from_args(&["#gg0000"]),
            Err(ColorError::InvalidHex(_))
        ));
        assert_eq!(
            Color::from_args(&["256", "0", "0"]),
            Err(ColorError::InvalidComponent("256".to_string()))
        );
        assert_eq!(
            Color::from_args(&["1", "2"]),
            Err(ColorError::ComponentCount(2))
        );
        assert_eq!(
            Color::from_args(&["red"]),
            Err(ColorError::ComponentCount(1))
        );
    }

    #[test]
    fn test_css_rendering() {
        assert_eq!(Color::rgb(255, 128, 0).to_css(), "#ff8000");
        assert_eq!(Color::WHITE.to_string(), "#ffffff");
    }

    #[test]
    fn test_deserializes_from_string() {
        let color: Color = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(color, Color::rgb(0, 255, 0));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
