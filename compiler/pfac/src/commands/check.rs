//! The `check` command: compile a document without running it.

use pfac::CompileOptions;

use super::load;

pub fn check_file(path: &str) {
    let program = load(path, &CompileOptions::default());
    let typed = program.typed();
    println!(
        "{path}: ok ({}, method {}, {} functions, {} cells, {} pools)",
        program.name(),
        program.method().as_str(),
        typed.fcns.len(),
        typed.cells.len(),
        typed.pools.len(),
    );
}
