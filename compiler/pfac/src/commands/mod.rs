//! Command handlers for the `pfa` CLI.
//!
//! Each submodule implements one command. Loading and error reporting shared
//! by all of them live here.

mod check;
mod run;
mod schema;

pub use check::check_file;
pub use run::{parse_run_options, run_file};
pub use schema::print_schemas;

use pfac::{compile_file, CompileError, CompileOptions, Program};

/// Compile `path`, or print every diagnostic and exit.
fn load(path: &str, options: &CompileOptions) -> Program {
    match compile_file(path, options) {
        Ok(program) => program,
        Err(err) => {
            report_compile_error(path, &err);
            std::process::exit(1);
        }
    }
}

fn report_compile_error(path: &str, err: &CompileError) {
    match err {
        CompileError::Io { .. } => eprintln!("error: {err}"),
        CompileError::Diagnostics(diagnostics) => {
            for diagnostic in diagnostics {
                eprintln!("{path}: {diagnostic}");
                eprintln!();
            }
            let count = diagnostics.len();
            eprintln!(
                "{path}: {count} error{}",
                if count == 1 { "" } else { "s" }
            );
        }
    }
}
