//! Programs and their instances.
//!
//! A [`Program`] is the immutable result of compiling one document: the
//! checked tree, its evaluator and the shared cells and pools. It is
//! `Send + Sync`; hosts hand it to any number of threads and create one
//! [`Instance`] per thread. An instance owns its private state and runs
//! `begin`, then any number of actions, then `end` on [`Instance::close`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use pfa_ir::Method;
use pfa_library::json::{self, CodecError};
use pfa_library::{coerce, Value};
use pfa_typeck::TypedProgram;
use pfa_types::Type;
use serde_json::Value as Json;

use crate::handlers::{EmitFn, EmitSink, LogFn, LogSink};
use crate::shared::SharedStore;
use crate::state::ExecState;
use crate::{Backend, EngineError, EngineOptions, Evaluator, Phase};

pub struct Program {
    typed: Arc<TypedProgram>,
    evaluator: Arc<dyn Evaluator>,
    shared: SharedStore,
    options: EngineOptions,
    next_instance: AtomicU32,
}

impl Program {
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(name = %typed.name, backend = backend.as_str())
    )]
    pub fn new(typed: TypedProgram, backend: Backend, options: EngineOptions) -> Self {
        let typed = Arc::new(typed);
        let shared = SharedStore::new(&typed);
        let evaluator = crate::evaluator::build(Arc::clone(&typed), backend);
        Program {
            typed,
            evaluator,
            shared,
            options,
            next_instance: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.typed.name
    }

    pub fn method(&self) -> Method {
        self.typed.method
    }

    pub fn input_type(&self) -> &Type {
        &self.typed.input
    }

    pub fn output_type(&self) -> &Type {
        &self.typed.output
    }

    pub fn backend(&self) -> Backend {
        self.evaluator.backend()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn typed(&self) -> &TypedProgram {
        &self.typed
    }

    /// A new instance with `begin` already run.
    pub fn instantiate(&self) -> Result<Instance, EngineError> {
        self.instantiate_with(|_| {})
    }

    /// Like [`Program::instantiate`], letting the host register sinks
    /// before `begin` runs.
    #[tracing::instrument(level = "debug", skip_all, fields(name = %self.typed.name))]
    pub fn instantiate_with(
        &self,
        configure: impl FnOnce(&mut Instance),
    ) -> Result<Instance, EngineError> {
        let index = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let state = ExecState::new(&self.typed, &self.shared, index, &self.options);
        let mut instance = Instance {
            program: Arc::clone(&self.typed),
            evaluator: Arc::clone(&self.evaluator),
            options: self.options.clone(),
            state,
            index,
            closed: false,
        };
        configure(&mut instance);
        instance.run(Phase::Begin)?;
        tracing::debug!(instance = index, "instance ready");
        Ok(instance)
    }
}

/// One running copy of a program.
pub struct Instance {
    program: Arc<TypedProgram>,
    evaluator: Arc<dyn Evaluator>,
    options: EngineOptions,
    state: ExecState,
    index: u32,
    closed: bool,
}

impl Instance {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn run(&mut self, phase: Phase) -> Result<Value, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        self.state.start_phase(phase, self.options.timeout_for(phase));
        let value = self.evaluator.run(phase, &mut self.state)?;
        tracing::trace!(%phase, "phase finished");
        Ok(value)
    }

    /// Run `action` on one input.
    ///
    /// Returns the action value for `map`, `null` for `emit`, and the new
    /// tally for `fold`.
    #[tracing::instrument(level = "debug", skip_all, fields(instance = self.index))]
    pub fn action(&mut self, input: Value) -> Result<Value, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        let input = coerce(input, &self.program.input);
        if !inhabits(&input, &self.program.input) {
            return Err(EngineError::Decode(CodecError {
                path: String::new(),
                message: format!("a {} value is not a {}", input.kind_name(), self.program.input),
            }));
        }
        self.state.specials.input = input;
        self.state.specials.actions_started += 1;
        let result = self.run(Phase::Action)?;
        let output = match self.program.method {
            Method::Map => result,
            Method::Emit => Value::Null,
            Method::Fold => {
                self.state.specials.tally = result.clone();
                result
            }
        };
        self.state.specials.actions_finished += 1;
        Ok(output)
    }

    /// [`Instance::action`] on Avro-JSON input and output.
    pub fn action_json(&mut self, input: &Json) -> Result<Json, EngineError> {
        let input = json::decode(input, &self.program.input).map_err(EngineError::Decode)?;
        let output = self.action(input)?;
        if self.program.method == Method::Emit {
            return Ok(Json::Null);
        }
        json::encode(&output, &self.program.output).map_err(EngineError::Encode)
    }

    /// Combine two tallies with the document's `merge`.
    #[tracing::instrument(level = "debug", skip_all, fields(instance = self.index))]
    pub fn merge(&mut self, one: Value, two: Value) -> Result<Value, EngineError> {
        if self.program.merge.is_none() {
            return Err(EngineError::MergeUnavailable);
        }
        let output = &self.program.output;
        self.state.specials.tally_one = coerce(one, output);
        self.state.specials.tally_two = coerce(two, output);
        self.run(Phase::Merge)
    }

    /// Run `end` and close the instance. The instance is closed even when
    /// `end` fails.
    #[tracing::instrument(level = "debug", skip_all, fields(instance = self.index))]
    pub fn close(&mut self) -> Result<(), EngineError> {
        let result = self.run(Phase::End);
        self.closed = true;
        result.map(|_| ())
    }

    // ========================================================================
    // Sinks
    // ========================================================================

    /// Send every emitted value to `callback`.
    pub fn register_emit(&mut self, callback: impl FnMut(&Value) + Send + 'static) {
        let callback: EmitFn = Box::new(callback);
        self.state.emit = EmitSink::Callback(callback);
    }

    /// Keep emitted values until [`Instance::take_emitted`].
    pub fn buffer_emits(&mut self) {
        self.state.emit = EmitSink::Buffer(Vec::new());
    }

    pub fn take_emitted(&mut self) -> Vec<Value> {
        self.state.emit.take()
    }

    /// Send every `log` line to `callback` as well as to `tracing`.
    pub fn register_log(&mut self, callback: impl FnMut(Option<&str>, &str) + Send + 'static) {
        let callback: LogFn = Box::new(callback);
        self.state.log = LogSink::Callback(callback);
    }

    pub fn buffer_logs(&mut self) {
        self.state.log = LogSink::Buffer(Vec::new());
    }

    pub fn take_logs(&mut self) -> Vec<String> {
        self.state.log.take()
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn cell(&self, name: &str) -> Option<Value> {
        self.program
            .cell_id(name)
            .map(|id| self.state.cell_value(id))
    }

    pub fn pool(&self, name: &str) -> Option<IndexMap<String, Value>> {
        self.program
            .pool_id(name)
            .map(|id| self.state.read_pool(id, IndexMap::clone))
    }

    /// Current tally; `null` unless the method is `fold`.
    pub fn tally(&self) -> Value {
        self.state.specials.tally.clone()
    }

    pub fn actions_started(&self) -> i64 {
        self.state.specials.actions_started
    }

    pub fn actions_finished(&self) -> i64 {
        self.state.specials.actions_finished
    }
}

/// Deep check that a host-built value inhabits `ty` exactly.
fn inhabits(value: &Value, ty: &Type) -> bool {
    match (value, ty) {
        (_, Type::Union(members)) => members.iter().any(|m| inhabits(value, m)),
        (Value::Array(items), Type::Array(item)) => items.iter().all(|v| inhabits(v, item)),
        (Value::Map(entries), Type::Map(item)) => entries.values().all(|v| inhabits(v, item)),
        (Value::Record { ty: actual, fields }, Type::Record(expected)) => {
            actual.name == expected.name
                && fields.len() == expected.fields.len()
                && fields
                    .iter()
                    .zip(&expected.fields)
                    .all(|(v, f)| inhabits(v, &f.ty))
        }
        (Value::Fixed { ty: actual, bytes }, Type::Fixed(expected)) => {
            actual.name == expected.name && bytes.len() == expected.size
        }
        (Value::Enum { ty: actual, index }, Type::Enum(expected)) => {
            actual.name == expected.name && *index < expected.symbols.len()
        }
        _ => pfa_library::conforms(value, ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}

    #[test]
    fn test_program_is_shareable_and_instances_movable() {
        assert_send_sync::<Program>();
        assert_send::<Instance>();
    }

    #[test]
    fn test_inhabits_checks_nested_items() {
        let ty = Type::array(Type::Double);
        assert!(inhabits(&Value::array(vec![Value::Double(1.0)]), &ty));
        assert!(!inhabits(&Value::array(vec![Value::string("x")]), &ty));
        assert!(inhabits(&Value::Null, &Type::nullable(Type::Int)));
    }
}
