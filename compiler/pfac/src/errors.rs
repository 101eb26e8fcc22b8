//! Construction failures.

use std::fmt;
use std::path::PathBuf;

use pfa_diagnostic::{Diagnostic, ErrorCode, ErrorKind};
use pfa_ir::Pos;

/// Why a document could not become a program.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Every problem found, in document order per pass.
    #[error("{}", Rendered(.0))]
    Diagnostics(Vec<Diagnostic>),
}

impl CompileError {
    /// Kind of the first diagnostic; `None` for I/O failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.diagnostics().first().map(Diagnostic::kind)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Diagnostics(diagnostics) => diagnostics,
            CompileError::Io { .. } => &[],
        }
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.diagnostics().iter().map(|d| d.code).collect()
    }
}

impl From<Vec<Diagnostic>> for CompileError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        CompileError::Diagnostics(diagnostics)
    }
}

/// Text that is neither JSON nor YAML.
#[cold]
pub(crate) fn unreadable_text(format: &str, error: &dyn fmt::Display) -> CompileError {
    CompileError::Diagnostics(vec![Diagnostic::error(ErrorCode::E1001)
        .with_message(format!("document is not valid {format}: {error}"))
        .at(&Pos::root())])
}

struct Rendered<'a>(&'a [Diagnostic]);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
