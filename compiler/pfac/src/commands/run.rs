//! The `run` command: score JSON-lines input.
//!
//! Each input line is one Avro-JSON value. Outputs go to stdout one per
//! line: the action value for `map`, the running tally for `fold`, and every
//! emitted value for `emit`. Failures go to stderr and set a non-zero exit.
//!
//! With `--parallel` the input is split into contiguous chunks, one
//! instance per chunk, run on the rayon pool. Output order still follows
//! input order. For `fold` documents the chunk tallies are combined with
//! `merge` and printed last.

use std::io::BufRead;
use std::path::PathBuf;

use pfa_ir::Method;
use pfa_library::json::encode;
use pfac::{Backend, CompileOptions, Program, Value};
use rayon::prelude::*;
use serde_json::Value as Json;

use super::load;

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// JSON-lines input; stdin when `None`.
    pub input: Option<PathBuf>,
    pub backend: Backend,
    pub parallel: bool,
    pub overrides: serde_json::Map<String, Json>,
}

/// Parse flags following `pfa run <doc>`. Returns an error message for
/// anything unrecognized.
pub fn parse_run_options(args: &[String]) -> Result<RunOptions, String> {
    let mut options = RunOptions::default();
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if arg == "--compiled" {
            options.backend = Backend::Compiled;
        } else if arg == "--parallel" {
            options.parallel = true;
        } else if arg == "--input" {
            let path = args.next().ok_or("--input needs a file path")?;
            options.input = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--input=") {
            options.input = Some(PathBuf::from(path));
        } else if arg == "--option" {
            let setting = args.next().ok_or("--option needs key=value")?;
            add_override(&mut options, setting)?;
        } else if let Some(setting) = arg.strip_prefix("--option=") {
            add_override(&mut options, setting)?;
        } else {
            return Err(format!("unknown run option '{arg}'"));
        }
    }
    Ok(options)
}

/// `key=value`; the value is read as JSON, or taken as a string when it
/// is not valid JSON.
fn add_override(options: &mut RunOptions, setting: &str) -> Result<(), String> {
    let (key, value) = setting
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, found '{setting}'"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Json::String(value.to_string()));
    options.overrides.insert(key.to_string(), value);
    Ok(())
}

/// Outputs of one input line, or why it failed.
type LineResult = Result<Vec<Json>, String>;

struct Chunk {
    lines: Vec<LineResult>,
    tally: Value,
    closed: Result<(), String>,
}

pub fn run_file(path: &str, options: &RunOptions) {
    let compile_options = CompileOptions {
        backend: options.backend,
        options: options.overrides.clone(),
        registry: None,
    };
    let program = load(path, &compile_options);
    let inputs = match read_inputs(options.input.as_ref()) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let chunks = if options.parallel && inputs.len() > 1 {
        let size = inputs.len().div_ceil(rayon::current_num_threads().max(1));
        inputs
            .par_chunks(size)
            .map(|chunk| run_chunk(&program, chunk))
            .collect::<Vec<_>>()
    } else {
        vec![run_chunk(&program, &inputs)]
    };

    let mut failed = false;
    for chunk in &chunks {
        for result in &chunk.lines {
            match result {
                Ok(outputs) => outputs.iter().for_each(|json| println!("{json}")),
                Err(e) => {
                    eprintln!("error: {e}");
                    failed = true;
                }
            }
        }
        if let Err(e) = &chunk.closed {
            eprintln!("error: end: {e}");
            failed = true;
        }
    }

    if options.parallel && chunks.len() > 1 && program.typed().merge.is_some() {
        match merge_tallies(&program, chunks.into_iter().map(|c| c.tally)) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: merge: {e}");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

/// Non-blank lines, each paired with its 1-based line number.
fn read_inputs(path: Option<&PathBuf>) -> Result<Vec<(usize, String)>, String> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            Box::new(std::io::BufReader::new(file))
        }
        None => Box::new(std::io::stdin().lock()),
    };
    let mut inputs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("cannot read input: {e}"))?;
        if !line.trim().is_empty() {
            inputs.push((i + 1, line));
        }
    }
    Ok(inputs)
}

fn run_chunk(program: &Program, inputs: &[(usize, String)]) -> Chunk {
    let mut instance = match program.instantiate_with(|i| i.buffer_emits()) {
        Ok(instance) => instance,
        Err(e) => {
            let message = format!("begin: {e}");
            return Chunk {
                lines: inputs.iter().map(|_| Err(message.clone())).collect(),
                tally: Value::Null,
                closed: Ok(()),
            };
        }
    };
    let output_type = program.output_type();

    let mut lines = Vec::with_capacity(inputs.len());
    for (number, text) in inputs {
        let result = serde_json::from_str::<Json>(text)
            .map_err(|e| format!("line {number}: not JSON: {e}"))
            .and_then(|input| {
                instance
                    .action_json(&input)
                    .map_err(|e| format!("line {number}: {e}"))
            })
            .and_then(|output| match program.method() {
                Method::Emit => instance
                    .take_emitted()
                    .iter()
                    .map(|v| encode(v, output_type).map_err(|e| format!("line {number}: {e}")))
                    .collect(),
                Method::Map | Method::Fold => Ok(vec![output]),
            });
        lines.push(result);
    }

    let tally = instance.tally();
    let closed = instance.close().map_err(|e| e.to_string());
    Chunk {
        lines,
        tally,
        closed,
    }
}

fn merge_tallies(
    program: &Program,
    tallies: impl IntoIterator<Item = Value>,
) -> Result<Json, String> {
    let mut merger = program.instantiate().map_err(|e| e.to_string())?;
    let mut tallies = tallies.into_iter();
    let Some(first) = tallies.next() else {
        return Ok(Json::Null);
    };
    let merged = tallies.try_fold(first, |one, two| {
        merger.merge(one, two).map_err(|e| e.to_string())
    })?;
    encode(&merged, program.output_type()).map_err(|e| e.to_string())
}
