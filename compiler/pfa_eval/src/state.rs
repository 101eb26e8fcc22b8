//! Mutable state of one engine instance.
//!
//! Everything an evaluation reads or writes besides the program itself:
//! cells, pools, special symbols, local frames, the random source, the
//! emit and log sinks, and the resource budget of the running phase.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use pfa_library::errors::{call_depth_exceeded, key_not_found, loop_limit_exceeded};
use pfa_library::{EvalError, EvalResult, Rng, Value};
use pfa_typeck::{CellId, PoolId, Special, TypedProgram};

use crate::environment::Environment;
use crate::handlers::{EmitSink, LogSink};
use crate::shared::{SharedStore, Slot};
use crate::stack::MAX_CALL_DEPTH;
use crate::{EngineOptions, Phase};

/// Values of the special symbols.
pub(crate) struct Specials {
    pub input: Value,
    pub tally: Value,
    pub tally_one: Value,
    pub tally_two: Value,
    pub name: Value,
    pub instance: i32,
    pub version: Option<i32>,
    pub actions_started: i64,
    pub actions_finished: i64,
}

struct Deadline {
    at: Instant,
    phase: &'static str,
    limit_ms: u64,
}

/// Time, loop and depth limits of the running phase.
pub(crate) struct Budget {
    deadline: Option<Deadline>,
    loop_limit: Option<u64>,
    depth: usize,
}

impl Budget {
    fn new(loop_limit: Option<u64>) -> Self {
        Budget {
            deadline: None,
            loop_limit,
            depth: 0,
        }
    }

    fn start(&mut self, phase: Phase, limit: Option<Duration>) {
        self.depth = 0;
        self.deadline = limit.map(|limit| Deadline {
            at: Instant::now() + limit,
            phase: phase.as_str(),
            limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        });
    }

    fn check_deadline(&self) -> Result<(), EvalError> {
        match &self.deadline {
            Some(d) if Instant::now() >= d.at => Err(EvalError::Timeout {
                phase: d.phase,
                limit_ms: d.limit_ms,
            }),
            _ => Ok(()),
        }
    }
}

/// State threaded through every evaluation of an instance.
pub struct ExecState {
    pub(crate) cells: Vec<Slot<Value>>,
    pub(crate) pools: Vec<Slot<IndexMap<String, Value>>>,
    pub(crate) specials: Specials,
    pub(crate) env: Environment,
    pub(crate) rng: Rng,
    pub(crate) emit: EmitSink,
    pub(crate) log: LogSink,
    budget: Budget,
}

impl ExecState {
    pub(crate) fn new(
        program: &TypedProgram,
        shared: &SharedStore,
        instance: u32,
        options: &EngineOptions,
    ) -> Self {
        let rng = match program.randseed {
            Some(seed) => Rng::for_instance(seed, instance),
            None => Rng::from_entropy(instance),
        };
        ExecState {
            cells: shared.cell_slots(program),
            pools: shared.pool_slots(program),
            specials: Specials {
                input: Value::Null,
                tally: program.zero.clone().unwrap_or(Value::Null),
                tally_one: Value::Null,
                tally_two: Value::Null,
                name: Value::string(&program.name),
                instance: i32::try_from(instance).unwrap_or(i32::MAX),
                version: program.version,
                actions_started: 0,
                actions_finished: 0,
            },
            env: Environment::new(),
            rng,
            emit: EmitSink::default(),
            log: LogSink::default(),
            budget: Budget::new(options.loop_limit),
        }
    }

    /// Reset per-phase bookkeeping before running `phase`.
    pub(crate) fn start_phase(&mut self, phase: Phase, limit: Option<Duration>) {
        self.env.reset();
        self.budget.start(phase, limit);
    }

    pub(crate) fn special(&self, special: Special) -> Value {
        let s = &self.specials;
        match special {
            Special::Input => s.input.clone(),
            Special::Tally => s.tally.clone(),
            Special::TallyOne => s.tally_one.clone(),
            Special::TallyTwo => s.tally_two.clone(),
            Special::Name => s.name.clone(),
            Special::Instance => Value::Int(s.instance),
            Special::Version => s.version.map_or(Value::Null, Value::Int),
            Special::ActionsStarted => Value::Long(s.actions_started),
            Special::ActionsFinished => Value::Long(s.actions_finished),
        }
    }

    // ========================================================================
    // Limits
    // ========================================================================

    pub(crate) fn check_deadline(&self) -> Result<(), EvalError> {
        self.budget.check_deadline()
    }

    /// Count one iteration of a loop execution.
    pub(crate) fn tick_loop(&self, iterations: &mut u64) -> Result<(), EvalError> {
        *iterations += 1;
        if let Some(limit) = self.budget.loop_limit {
            if *iterations > limit {
                return Err(loop_limit_exceeded(limit).into());
            }
        }
        self.check_deadline()
    }

    /// Enter a user function or function value call.
    pub(crate) fn enter_call(&mut self) -> Result<(), EvalError> {
        self.check_deadline()?;
        if self.budget.depth >= MAX_CALL_DEPTH {
            return Err(call_depth_exceeded(MAX_CALL_DEPTH).into());
        }
        self.budget.depth += 1;
        Ok(())
    }

    pub(crate) fn leave_call(&mut self) {
        self.budget.depth = self.budget.depth.saturating_sub(1);
    }

    // ========================================================================
    // Cells
    // ========================================================================

    pub(crate) fn read_cell<R>(&self, cell: CellId, f: impl FnOnce(&Value) -> R) -> R {
        self.cells[cell.index()].read(f)
    }

    pub(crate) fn cell_value(&self, cell: CellId) -> Value {
        self.cells[cell.index()].snapshot()
    }

    /// Replace a cell with `f(old)` in one step.
    ///
    /// A shared cell stays locked while `f` runs; `f` may call functions but
    /// never touches cells or pools itself.
    pub(crate) fn update_cell(
        &mut self,
        cell: CellId,
        f: impl FnOnce(&mut ExecState, Value) -> EvalResult,
    ) -> EvalResult {
        if let Some(handle) = self.cells[cell.index()].handle() {
            let mut guard = handle.lock();
            let new = f(self, guard.clone())?;
            *guard = new.clone();
            return Ok(new);
        }
        let old = self.cell_value(cell);
        let new = f(self, old)?;
        self.cells[cell.index()].write(|v| *v = new.clone());
        Ok(new)
    }

    // ========================================================================
    // Pools
    // ========================================================================

    pub(crate) fn read_pool<R>(
        &self,
        pool: PoolId,
        f: impl FnOnce(&IndexMap<String, Value>) -> R,
    ) -> R {
        self.pools[pool.index()].read(f)
    }

    pub(crate) fn pool_entry(&self, pool: PoolId, key: &str) -> EvalResult {
        self.read_pool(pool, |entries| entries.get(key).cloned())
            .ok_or_else(|| key_not_found(key).into())
    }

    /// Set `key` to `f(old entry)`; `f` sees `None` for an absent key.
    pub(crate) fn update_pool(
        &mut self,
        pool: PoolId,
        key: &str,
        f: impl FnOnce(&mut ExecState, Option<Value>) -> EvalResult,
    ) -> EvalResult {
        if let Some(handle) = self.pools[pool.index()].handle() {
            let mut guard = handle.lock();
            let old = guard.get(key).cloned();
            let new = f(self, old)?;
            guard.insert(key.to_string(), new.clone());
            return Ok(new);
        }
        let old = self.read_pool(pool, |entries| entries.get(key).cloned());
        let new = f(self, old)?;
        self.pools[pool.index()].write(|entries| {
            entries.insert(key.to_string(), new.clone());
        });
        Ok(new)
    }

    /// Remove `key`; absent keys are ignored.
    pub(crate) fn delete_pool_entry(&mut self, pool: PoolId, key: &str) {
        self.pools[pool.index()].write(|entries| {
            entries.shift_remove(key);
        });
    }

    pub(crate) fn replace_pool(&mut self, pool: PoolId, entries: IndexMap<String, Value>) {
        self.pools[pool.index()].write(|current| *current = entries);
    }
}
