//! Diagnostics for editor integration
//!
//! Analysis never fails. Every problem it finds in a document is reported as a
//! [`Diagnostic`] with a range, a severity and a stable code that an editor adapter can
//! forward as-is.
//!
//! ## Codes
//!
//! | Code | Severity | Raised for |
//! | --- | --- | --- |
//! | `malformed-directive` | Error | a `timecalc` block that does not parse |
//! | `missing-directive-field` | Error | a block without `char` or `newline` |
//! | `non-numeric-directive-field` | Error | `char` or `newline` that is not a number |
//! | `invalid-custom-delay` | Error | a `custom` entry that is not one character mapped to a number |
//! | `unknown-directive-key` | Warning | a key a `timecalc` block does not use |
//! | `unknown-tag` | Warning | a tag name that is not registered |
//! | `missing-argument` | Warning | `[sleep]` or `[speed]` without a number |
//! | `invalid-argument` | Warning | a numeric argument that is not a positive number |
//! | `unexpected-arguments` | Information | arguments on a tag that takes none |
//! | `invalid-color` | Error | a color tag with a bad or missing literal |

use crate::tw::location::Range;
use serde::Serialize;
use std::fmt;

pub const SOURCE: &str = "tw";

pub const UNKNOWN_DIRECTIVE_KEY: &str = "unknown-directive-key";
pub const UNKNOWN_TAG: &str = "unknown-tag";
pub const MISSING_ARGUMENT: &str = "missing-argument";
pub const INVALID_ARGUMENT: &str = "invalid-argument";
pub const UNEXPECTED_ARGUMENTS: &str = "unexpected-arguments";
pub const INVALID_COLOR: &str = "invalid-color";

/// Diagnostic severity levels matching LSP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Information => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub code: Option<String>,
    pub source: String,
}

impl Diagnostic {
    pub fn new(range: Range, severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
            code: None,
            source: SOURCE.to_string(),
        }
    }

    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, DiagnosticSeverity::Error, message)
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, DiagnosticSeverity::Warning, message)
    }

    pub fn information(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, DiagnosticSeverity::Information, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} at {}",
            self.severity, self.source, self.message, self.range.start
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tw::location::Position;

    #[test]
    fn test_diagnostic_display() {
        let range = Range::new(4..9, Position::new(1, 2), Position::new(1, 7));
        let diagnostic = Diagnostic::warning(range, "Unknown tag: [foo].").with_code(UNKNOWN_TAG);
        assert_eq!(
            diagnostic.to_string(),
            "warning [tw]: Unknown tag: [foo]. at 1:2"
        );
        assert_eq!(diagnostic.code.as_deref(), Some("unknown-tag"));
        assert!(!diagnostic.is_error());
    }

    #[test]
    fn test_severity_orders_errors_first() {
        assert!(DiagnosticSeverity::Error < DiagnosticSeverity::Warning);
        assert!(DiagnosticSeverity::Information < DiagnosticSeverity::Hint);
    }
}
