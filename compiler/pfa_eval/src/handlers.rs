//! Destinations for `emit` and `log` output.
//!
//! Enum dispatch: the common cases (drop, buffer) need no boxing, and a
//! host callback is one variant among them.

use pfa_library::Value;

/// Host callback receiving each emitted value.
pub type EmitFn = Box<dyn FnMut(&Value) + Send>;

/// Host callback receiving `(namespace, message)` for each `log`.
pub type LogFn = Box<dyn FnMut(Option<&str>, &str) + Send>;

#[derive(Default)]
pub(crate) enum EmitSink {
    #[default]
    Discard,
    Buffer(Vec<Value>),
    Callback(EmitFn),
}

impl EmitSink {
    pub fn emit(&mut self, value: &Value) {
        match self {
            EmitSink::Discard => {}
            EmitSink::Buffer(values) => values.push(value.clone()),
            EmitSink::Callback(f) => f(value),
        }
    }

    /// Buffered values since the last call; empty unless buffering.
    pub fn take(&mut self) -> Vec<Value> {
        match self {
            EmitSink::Buffer(values) => std::mem::take(values),
            _ => Vec::new(),
        }
    }
}

/// Log lines always become `tracing` events; the sink decides what else.
#[derive(Default)]
pub(crate) enum LogSink {
    #[default]
    Tracing,
    Buffer(Vec<String>),
    Callback(LogFn),
}

impl LogSink {
    pub fn log(&mut self, namespace: Option<&str>, message: &str) {
        tracing::info!(target: "pfa::log", namespace = namespace.unwrap_or(""), "{message}");
        match self {
            LogSink::Tracing => {}
            LogSink::Buffer(lines) => lines.push(match namespace {
                Some(ns) => format!("{ns}: {message}"),
                None => message.to_string(),
            }),
            LogSink::Callback(f) => f(namespace, message),
        }
    }

    pub fn take(&mut self) -> Vec<String> {
        match self {
            LogSink::Buffer(lines) => std::mem::take(lines),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_buffered_emits_are_taken_once() {
        let mut sink = EmitSink::Buffer(Vec::new());
        sink.emit(&Value::Int(1));
        sink.emit(&Value::Int(2));
        assert_eq!(sink.take(), vec![Value::Int(1), Value::Int(2)]);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_log_callback_receives_namespace() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let mut sink = LogSink::Callback(Box::new(move |ns, msg| {
            sink_seen.lock().push(format!("{}|{msg}", ns.unwrap_or("-")));
        }));
        sink.log(Some("audit"), "hello");
        sink.log(None, "bye");
        assert_eq!(*seen.lock(), vec!["audit|hello".to_string(), "-|bye".to_string()]);
    }
}
