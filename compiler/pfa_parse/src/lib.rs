//! Document-tree parser for PFA.
//!
//! Input is a generic JSON tree (YAML documents are read into the same tree
//! by the driver). Output is a [`Document`] whose expressions live in a flat
//! `ExprArena`. Only shapes are checked here; names and types are resolved by
//! the type checker.
//!
//! Errors are collected per section so one pass reports every malformed
//! top-level field.

mod document;
mod expr;

use pfa_diagnostic::Diagnostic;
use pfa_ir::{Document, ExprArena};

/// Parser state.
pub struct Parser {
    arena: ExprArena,
    errors: Vec<Diagnostic>,
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Parser {
            arena: ExprArena::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document tree.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse(json: &serde_json::Value) -> Result<Document, Vec<Diagnostic>> {
    Parser::new().parse_document(json)
}

#[cfg(test)]
mod tests;
