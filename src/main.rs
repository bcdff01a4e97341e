use std::{fs, io, path::PathBuf, process::ExitCode};

use clap::Parser;
use kiln::{
    interpreter::value::core::Value,
    library::{self, LibraryConfig},
    session::Session,
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing_subscriber::EnvFilter;

/// kiln is a small scripting language with structural types and open type
/// extension.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Tells kiln to read the program from the file named by the contents.
    #[arg(short, long)]
    file: bool,

    /// Script mode prints the value of every top-level statement.
    #[arg(short, long)]
    script_mode: bool,

    /// Loads every library source under this directory before running.
    #[arg(short, long, value_name = "DIR")]
    lib: Option<PathBuf>,

    /// Reads the program from standard input, parsing while it arrives.
    #[arg(long, conflicts_with = "contents")]
    stdin: bool,

    /// Logs stage timings and loader activity. `KILN_LOG` takes precedence.
    #[arg(short, long)]
    verbose: bool,

    /// The program, or a path to it with `--file`. Starts a REPL when absent.
    contents: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut session = match Session::new() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        },
    };

    if let Some(root) = &args.lib
       && let Err(e) = library::load(&mut session, &LibraryConfig::new(root))
    {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    if args.stdin {
        let input = io::BufReader::new(io::stdin());
        return match session.execute_stream("stdin", input, args.script_mode) {
            Ok(Ok(_)) => ExitCode::SUCCESS,
            Ok(Err(e)) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            },
            Err(e) => {
                eprintln!("Failed to read standard input: {e}");
                ExitCode::FAILURE
            },
        };
    }

    let Some(contents) = args.contents else {
        return repl(&mut session);
    };

    let (source_name, script) = if args.file {
        match fs::read_to_string(&contents) {
            Ok(script) => (contents, script),
            Err(_) => {
                eprintln!("Failed to read the input file '{contents}'. Perhaps this file does not exist?");
                return ExitCode::FAILURE;
            },
        }
    } else {
        ("input".to_string(), contents)
    };

    match session.execute(&source_name, &script, args.script_mode) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "kiln=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter)
                             .with_writer(io::stderr)
                             .init();
}

/// Reads one unit per line until end of input. Declarations persist between
/// lines.
fn repl(session: &mut Session) -> ExitCode {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to start the REPL: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut line_number = 0usize;
    loop {
        match editor.readline("kiln> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                line_number += 1;
                match session.execute(&format!("repl:{line_number}"), &line, false) {
                    Ok(report) => {
                        if let Some(value) = report.last()
                           && *value != Value::Unit
                        {
                            println!("{value}");
                        }
                    },
                    Err(e) => eprintln!("{e}"),
                }
            },
            Err(ReadlineError::Interrupted) => {},
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            },
        }
    }
    ExitCode::SUCCESS
}
