//! PFA CLI
//!
//! Check, inspect and run scoring documents.

mod commands;

use commands::{check_file, parse_run_options, print_schemas, run_file};

fn main() {
    pfac::tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "check" => {
            if args.len() < 3 {
                eprintln!("Usage: pfa check <document>");
                std::process::exit(1);
            }
            check_file(&args[2]);
        }
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: pfa run <document> [options]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --input <file.jsonl>   Read inputs from a file (default: stdin)");
                eprintln!("  --compiled             Use the closure-compiled backend");
                eprintln!("  --parallel             One instance per input chunk, in parallel");
                eprintln!("  --option <key=value>   Override a document option");
                std::process::exit(1);
            }
            let options = match parse_run_options(&args[3..]) {
                Ok(options) => options,
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            };
            run_file(&args[2], &options);
        }
        "schema" => {
            if args.len() < 3 {
                eprintln!("Usage: pfa schema <document>");
                std::process::exit(1);
            }
            print_schemas(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("pfa {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("PFA scoring engine");
    println!();
    println!("Usage: pfa <command> [options]");
    println!();
    println!("Commands:");
    println!("  check <document>     Compile a document and report problems");
    println!("  run <document>       Score JSON-lines input");
    println!("  schema <document>    Print the normalized input and output schemas");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Run options:");
    println!("  --input <file.jsonl>    Read inputs from a file (default: stdin)");
    println!("  --compiled              Use the closure-compiled backend");
    println!("  --parallel              One instance per input chunk, in parallel");
    println!("  --option <key=value>    Override a document option (e.g. timeout=100)");
    println!();
    println!("Documents may be JSON or YAML.");
    println!();
    println!("Logging:");
    println!("  PFA_LOG=<filter>        Log filter (falls back to RUST_LOG), e.g. pfa_eval=debug");
    println!("  PFA_LOG_TREE=1          Show spans as an indented tree");
    println!();
    println!("Examples:");
    println!("  pfa check model.pfa.json");
    println!("  pfa run model.pfa.yaml --input events.jsonl");
    println!("  pfa run model.pfa.json --compiled --parallel < events.jsonl");
    println!("  pfa schema model.pfa.json");
}
