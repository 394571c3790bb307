//! Interactive REPL implementation

use std::path::Path;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::resolve_path;
use crate::error::{ExdbError, Result};
use crate::output::{format_value, OutputFormat};
use crate::proxy::{Proxy, Value};
use crate::runtime::Runtime;

pub fn run_repl(script: &Path) -> Result<()> {
    let mut rl =
        DefaultEditor::new().map_err(|e| ExdbError::Script(e.to_string()))?;

    let runtime = Runtime::new();
    let session = runtime.session();
    let db = session.open(script)?;

    println!("exdb v{} - {}", env!("CARGO_PKG_VERSION"), script.display());
    println!("Type 'help' for commands, 'exit' to quit\n");

    loop {
        let readline = rl.readline("exdb> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line.to_lowercase().as_str() {
                    "exit" | "quit" | "q" => {
                        println!("Goodbye!");
                        break;
                    }
                    "help" | "?" => {
                        print_help();
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = dispatch(&db, line) {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    runtime.close_all();
    Ok(())
}

fn dispatch(db: &Proxy, line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");
    let argument = parts.next();

    match command {
        "get" => {
            let path = split_path(argument);
            let value = resolve_path(db, &path)?;
            println!("{}", format_value(&value, &OutputFormat::Human)?);
        }
        "len" => {
            let path = split_path(argument);
            match resolve_path(db, &path)? {
                Value::Table(p) => println!("{}", p.len()?),
                other => {
                    return Err(ExdbError::NotContainer(format!(
                        "{} ({})",
                        argument.unwrap_or("<root>"),
                        other.type_name()
                    )))
                }
            }
        }
        "ls" => {
            let path = split_path(argument);
            match resolve_path(db, &path)? {
                Value::Table(p) => {
                    for entry in &p {
                        let (key, value) = entry?;
                        match value {
                            Value::Table(t) => println!("{} = {}", key, t.describe()),
                            other => println!("{} = {}", key, other),
                        }
                    }
                }
                other => {
                    return Err(ExdbError::NotContainer(format!(
                        "{} ({})",
                        argument.unwrap_or("<root>"),
                        other.type_name()
                    )))
                }
            }
        }
        "dump" => {
            let path = split_path(argument);
            let value = resolve_path(db, &path)?;
            println!("{}", format_value(&value, &OutputFormat::Human)?);
        }
        _ => {
            println!("Unknown command '{}'. Type 'help' for commands.", command);
        }
    }

    Ok(())
}

fn split_path(argument: Option<&str>) -> Vec<String> {
    match argument {
        Some(path) => path.split('.').map(str::to_string).collect(),
        None => Vec::new(),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  get <path>    read the value at a dotted key path");
    println!("  len [path]    sequence length of the table at the path");
    println!("  ls [path]     list the entries of the table at the path");
    println!("  dump [path]   print the table at the path in full");
    println!("  help          this help");
    println!("  exit          quit\n");
    println!("Paths are dotted; integer-looking segments index sequences,");
    println!("e.g. 'get servers.1.host'.\n");
}
