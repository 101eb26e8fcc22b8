//! PFA driver.
//!
//! Turns a scoring document into a runnable [`Program`]:
//!
//! 1. read JSON or YAML text into a generic tree ([`compile_str`], [`compile_file`])
//! 2. build the AST skeleton (`pfa_parse`)
//! 3. type-check against a function registry (`pfa_typeck`)
//! 4. validate engine options and assemble the program (`pfa_eval`)
//!
//! Any diagnostic stops construction; no partial program is produced.
//!
//! ```no_run
//! use pfac::{compile_str, CompileOptions};
//!
//! let program = compile_str(
//!     r#"{"input": "int", "output": "int", "action": {"+": ["input", 1]}}"#,
//!     &CompileOptions::default(),
//! )?;
//! let mut instance = program.instantiate()?;
//! assert_eq!(instance.action_json(&serde_json::json!(2))?, serde_json::json!(3));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod errors;
mod options;
pub mod tracing_setup;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use pfa_library::FunctionRegistry;
use serde_json::{Map, Value as Json};

pub use errors::CompileError;
pub use pfa_diagnostic::{Diagnostic, ErrorCode, ErrorKind};
pub use pfa_eval::{Backend, EngineError, EngineOptions, Instance, Program};
pub use pfa_library::{RuntimeError, RuntimeErrorKind, Value};

/// Host-side settings for [`compile`].
#[derive(Clone, Default)]
pub struct CompileOptions {
    pub backend: Backend,
    /// Overrides for the document's `options`, by key.
    pub options: Map<String, Json>,
    /// Registry to resolve library calls against; the built-in catalog
    /// when `None`.
    pub registry: Option<Arc<FunctionRegistry>>,
}

impl CompileOptions {
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: &str, value: Json) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

fn builtins() -> &'static FunctionRegistry {
    static BUILTINS: OnceLock<FunctionRegistry> = OnceLock::new();
    BUILTINS.get_or_init(FunctionRegistry::with_builtins)
}

/// Compile a document tree.
#[tracing::instrument(level = "debug", skip_all, fields(backend = options.backend.as_str()))]
pub fn compile(document: &Json, options: &CompileOptions) -> Result<Program, CompileError> {
    let parsed = pfa_parse::parse(document)?;
    let registry = match options.registry.as_deref() {
        Some(registry) => registry,
        None => builtins(),
    };
    let typed = pfa_typeck::check(&parsed, registry)?;
    let engine = options::engine_options(&typed.options, &options.options)?;
    let program = Program::new(typed, options.backend, engine);
    tracing::debug!(name = program.name(), "compiled document");
    Ok(program)
}

/// Compile JSON or YAML text. Text starting with `{` is read as JSON.
pub fn compile_str(text: &str, options: &CompileOptions) -> Result<Program, CompileError> {
    compile(&read_document(text)?, options)
}

pub fn compile_file(
    path: impl AsRef<Path>,
    options: &CompileOptions,
) -> Result<Program, CompileError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    compile_str(&text, options)
}

/// Read JSON or YAML text into a document tree.
pub fn read_document(text: &str) -> Result<Json, CompileError> {
    if text.trim_start().starts_with('{') {
        serde_json::from_str(text).map_err(|e| errors::unreadable_text("JSON", &e))
    } else {
        serde_yaml_ng::from_str(text).map_err(|e| errors::unreadable_text("YAML", &e))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_yaml_and_json_read_the_same_tree() {
        let yaml = "input: int\noutput: int\naction:\n  - {+: [input, 1]}\n";
        let json = r#"{"input": "int", "output": "int", "action": [{"+": ["input", 1]}]}"#;
        assert_eq!(read_document(yaml).unwrap(), read_document(json).unwrap());
    }

    #[test]
    fn test_unreadable_text_is_a_syntax_error() {
        let err = compile_str("{\"input\": ", &CompileOptions::default()).err().unwrap();
        assert_eq!(err.kind(), Some(ErrorKind::Syntax));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_missing_file() {
        let err = compile_file("/nonexistent/model.pfa.json", &CompileOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, CompileError::Io { .. }));
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_options_reach_the_program() {
        let doc = json!({
            "input": "int", "output": "int", "action": "input",
            "options": {"timeout": 1000, "loop.limit": 10}
        });
        let options = CompileOptions::default().with_option("loop.limit", json!(20));
        let program = compile(&doc, &options).unwrap();
        assert_eq!(program.options().loop_limit, Some(20));
        assert_eq!(program.options().timeout, Some(std::time::Duration::from_secs(1)));
    }

    #[test]
    fn test_host_registry_replaces_the_builtins() {
        let doc = json!({"input": "double", "output": "double", "action": {"m.sqrt": ["input"]}});
        let program = compile(&doc, &CompileOptions::default()).unwrap();
        let mut instance = program.instantiate().unwrap();
        assert_eq!(instance.action_json(&json!(16.0)).unwrap(), json!(4.0));

        let empty = CompileOptions::default().with_registry(Arc::new(FunctionRegistry::new()));
        let err = compile(&doc, &empty).err().unwrap();
        assert_eq!(err.kind(), Some(ErrorKind::Semantic));
    }
}
