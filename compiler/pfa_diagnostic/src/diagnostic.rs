use std::fmt;

use pfa_ir::Pos;

use crate::{ErrorCode, ErrorKind};

/// A positioned construction-time error.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Error code for searchability.
    pub code: ErrorCode,
    /// Main error message.
    pub message: String,
    /// Where in the document the error occurred.
    pub pos: Pos,
    /// Additional notes providing context.
    pub notes: Vec<String>,
    /// Simple text suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic positioned at the document root.
    pub fn error(code: ErrorCode) -> Self {
        Diagnostic {
            code,
            message: String::new(),
            pos: Pos::root(),
            notes: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Set the main message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the document position.
    pub fn at(mut self, pos: &Pos) -> Self {
        self.pos = pos.clone();
        self
    }

    /// Add a note providing additional context.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.kind(), self.code, self.message)?;
        write!(f, "\n  --> {}", self.pos)?;

        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }

        for suggestion in &self.suggestions {
            write!(f, "\n  = help: {suggestion}")?;
        }

        Ok(())
    }
}

/// Create a "malformed form" diagnostic: `form` was written with an
/// argument of the wrong shape.
pub fn malformed_form(pos: &Pos, form: &str, expected: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1005)
        .with_message(format!("malformed \"{form}\": expected {expected}"))
        .at(pos)
}

/// Create a "missing field" diagnostic.
pub fn missing_field(pos: &Pos, context: &str, field: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1002)
        .with_message(format!("{context} is missing required field \"{field}\""))
        .at(pos)
}

/// Create an "unknown symbol" diagnostic.
pub fn unknown_symbol(pos: &Pos, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3001)
        .with_message(format!("unknown symbol \"{name}\""))
        .at(pos)
}

/// Create a "type mismatch" diagnostic.
pub fn type_mismatch(pos: &Pos, expected: &str, found: &str, context: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3004)
        .with_message(format!(
            "type mismatch in {context}: expected {expected}, found {found}"
        ))
        .at(pos)
}

/// Create an "invalid value" diagnostic for JSON that does not decode as
/// its declared type.
pub fn invalid_value(pos: &Pos, context: &str, reason: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E3009)
        .with_message(format!("{context} does not match its declared type: {reason}"))
        .at(pos)
}
