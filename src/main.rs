//! exdb CLI - inspect table databases built by isolated scripts

use clap::Parser;

use exdb::cli::{resolve_path, Args, SubCommand};
use exdb::script::{has_errors, read_program, validate_program, ValidationOptions, ValidationSeverity};
use exdb::{format_value, ExdbError, OutputFormat, Runtime, Value};

fn main() {
    let args = Args::parse();

    if args.verbose {
        init_tracing();
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> exdb::Result<()> {
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match args.command {
        SubCommand::Get { script, path } => {
            let runtime = Runtime::new();
            let session = runtime.session();
            let db = session.open(&script)?;
            let value = resolve_path(&db, &path)?;
            println!("{}", format_value(&value, &format)?);
            Ok(())
        }

        SubCommand::Len { script, path } => {
            let runtime = Runtime::new();
            let session = runtime.session();
            let db = session.open(&script)?;
            match resolve_path(&db, &path)? {
                Value::Table(p) => {
                    println!("{}", p.len()?);
                    Ok(())
                }
                other => Err(ExdbError::NotContainer(format!(
                    "{} ({})",
                    path.join("."),
                    other.type_name()
                ))),
            }
        }

        SubCommand::Dump { script } => {
            let runtime = Runtime::new();
            let session = runtime.session();
            let db = session.open(&script)?;
            println!("{}", format_value(&Value::Table(db), &format)?);
            Ok(())
        }

        SubCommand::Check { script, max_depth } => {
            let program = read_program(&script)?;
            let options = ValidationOptions {
                max_nesting_depth: max_depth,
            };
            let issues = validate_program(&program, &options);

            for issue in issues
                .iter()
                .filter(|i| i.severity == ValidationSeverity::Warning)
            {
                eprintln!("Warning: {}", issue);
            }

            if has_errors(&issues) {
                for issue in issues
                    .iter()
                    .filter(|i| i.severity == ValidationSeverity::Error)
                {
                    eprintln!("Error: {}", issue);
                }
                return Err(ExdbError::Script("script validation failed".to_string()));
            }

            if args.verbose {
                println!("OK: {} statements", program.statements.len());
            } else {
                println!("OK");
            }
            Ok(())
        }

        #[cfg(feature = "repl")]
        SubCommand::Repl { script } => exdb::repl::run_repl(&script),

        #[cfg(not(feature = "repl"))]
        SubCommand::Repl { .. } => {
            eprintln!("REPL support not enabled. Rebuild with --features repl");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("exdb=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
