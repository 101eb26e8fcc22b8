//! Engine options from the document's `options` and host overrides.
//!
//! Recognized keys, all non-negative integers:
//!
//! | key | meaning |
//! |---|---|
//! | `timeout` | default budget in milliseconds for every phase |
//! | `timeout.begin` / `timeout.action` / `timeout.end` | per-phase budgets |
//! | `loop.limit` | maximum iterations of any single loop execution |
//!
//! A host override replaces the document's entry of the same key. Unknown
//! keys are ignored with a warning.

use std::time::Duration;

use pfa_diagnostic::{Diagnostic, ErrorCode};
use pfa_eval::EngineOptions;
use pfa_ir::{OptionEntry, Pos};
use serde_json::{Map, Value as Json};

#[derive(Copy, Clone)]
enum Key {
    Timeout,
    TimeoutBegin,
    TimeoutAction,
    TimeoutEnd,
    LoopLimit,
}

impl Key {
    fn parse(key: &str) -> Option<Key> {
        Some(match key {
            "timeout" => Key::Timeout,
            "timeout.begin" => Key::TimeoutBegin,
            "timeout.action" => Key::TimeoutAction,
            "timeout.end" => Key::TimeoutEnd,
            "loop.limit" => Key::LoopLimit,
            _ => return None,
        })
    }
}

/// Build [`EngineOptions`], collecting every invalid value.
pub(crate) fn engine_options(
    document: &[OptionEntry],
    overrides: &Map<String, Json>,
) -> Result<EngineOptions, Vec<Diagnostic>> {
    let section = Pos::root().key("options");
    let entries = document
        .iter()
        .filter(|entry| !overrides.contains_key(&entry.key))
        .map(|entry| (entry.key.as_str(), &entry.value, entry.pos.clone(), false))
        .chain(
            overrides
                .iter()
                .map(|(key, value)| (key.as_str(), value, section.key(key), true)),
        );

    let mut options = EngineOptions::default();
    let mut errors = Vec::new();
    for (name, value, pos, from_host) in entries {
        let Some(key) = Key::parse(name) else {
            tracing::warn!(option = name, "ignoring unknown option");
            continue;
        };
        let Some(n) = value.as_u64() else {
            let mut diagnostic = Diagnostic::error(ErrorCode::E4001)
                .with_message(format!(
                    "option `{name}` must be a non-negative integer, found {value}"
                ))
                .at(&pos);
            if from_host {
                diagnostic = diagnostic.with_note("set by the host, overriding the document");
            }
            errors.push(diagnostic);
            continue;
        };
        let millis = Some(Duration::from_millis(n));
        match key {
            Key::Timeout => options.timeout = millis,
            Key::TimeoutBegin => options.timeout_begin = millis,
            Key::TimeoutAction => options.timeout_action = millis,
            Key::TimeoutEnd => options.timeout_end = millis,
            Key::LoopLimit => options.loop_limit = Some(n),
        }
    }

    if errors.is_empty() {
        tracing::debug!(?options, "engine options");
        Ok(options)
    } else {
        Err(errors)
    }
}
