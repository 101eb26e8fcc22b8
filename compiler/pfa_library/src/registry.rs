//! Function registry.
//!
//! The registry maps qualified names (`"+"`, `"a.map"`, `"m.sqrt"`) to
//! library functions. A registry is built once, handed to the compiler,
//! and shared read-only by every program compiled against it.

use std::fmt;
use std::sync::Arc;

use pfa_types::{SignatureSet, Type};
use rustc_hash::FxHashMap;

use crate::{EvalError, FcnValue, Rng, Value};

/// What a library function may ask of the running engine.
pub trait CallContext {
    /// Call a first-class function value with the remaining (unfilled) arguments.
    fn call(&mut self, fcn: &FcnValue, args: Vec<Value>) -> Result<Value, EvalError>;

    /// The instance's random source.
    fn rng(&mut self) -> &mut Rng;

    /// Fail with a timeout if the current phase is over its budget.
    fn check_deadline(&mut self) -> Result<(), EvalError>;
}

/// Resolution of one call site.
#[derive(Clone, Copy, Debug)]
pub struct CallInfo<'a> {
    /// Index of the matched signature alternative.
    pub index: usize,
    pub params: &'a [Type],
    pub ret: &'a Type,
}

/// A library function.
///
/// `apply` receives arguments already widened to `call.params`.
pub trait LibFcn: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn signatures(&self) -> &SignatureSet;

    fn apply(
        &self,
        args: &[Value],
        call: &CallInfo<'_>,
        ctx: &mut dyn CallContext,
    ) -> Result<Value, EvalError>;
}

/// Body of a [`Builtin`].
pub type BuiltinFn =
    fn(&[Value], &CallInfo<'_>, &mut dyn CallContext) -> Result<Value, EvalError>;

/// A library function backed by a plain function pointer.
pub struct Builtin {
    name: &'static str,
    signatures: SignatureSet,
    body: BuiltinFn,
}

impl Builtin {
    pub fn new(name: &'static str, signatures: SignatureSet, body: BuiltinFn) -> Self {
        Builtin {
            name,
            signatures,
            body,
        }
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish_non_exhaustive()
    }
}

impl LibFcn for Builtin {
    fn name(&self) -> &str {
        self.name
    }

    fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    fn apply(
        &self,
        args: &[Value],
        call: &CallInfo<'_>,
        ctx: &mut dyn CallContext,
    ) -> Result<Value, EvalError> {
        (self.body)(args, call, ctx).map_err(|e| e.in_fcn(self.name))
    }
}

/// Name-indexed table of library functions.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    fcns: FxHashMap<String, Arc<dyn LibFcn>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_all(&mut registry);
        tracing::debug!(functions = registry.len(), "registered built-ins");
        registry
    }

    /// Add or replace a function; returns the one it replaced.
    pub fn register(&mut self, fcn: Arc<dyn LibFcn>) -> Option<Arc<dyn LibFcn>> {
        self.fcns.insert(fcn.name().to_string(), fcn)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn LibFcn>> {
        self.fcns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fcns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fcns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fcns.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fcns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.fcns.len())
            .finish()
    }
}
