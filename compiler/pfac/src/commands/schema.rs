//! The `schema` command: print the normalized input and output types.

use pfa_types::schema::to_json;
use pfac::CompileOptions;
use serde_json::json;

use super::load;

pub fn print_schemas(path: &str) {
    let program = load(path, &CompileOptions::default());
    let schemas = json!({
        "input": to_json(program.input_type()),
        "output": to_json(program.output_type()),
    });
    match serde_json::to_string_pretty(&schemas) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: cannot render schemas: {e}");
            std::process::exit(1);
        }
    }
}
