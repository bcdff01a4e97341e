use std::{
    cell::RefCell,
    io::{self, BufRead, Write},
    rc::Rc,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{
    error::ExecuteError,
    interpreter::{
        command::Command,
        context::Context,
        evaluator::core::{Evaluator, Flow},
        lexer::TokenStream,
        lowering::lower_program,
        parser::core::{ParseOutcome, Parser},
        pipeline::parse_lines,
        tape::TokenTape,
        value::core::Value,
    },
};

/// What running one source unit produced.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// One value per executed top-level statement, in source order.
    /// Statements without a value contribute unit.
    pub results:        Vec<Value>,
    /// Time spent lexing.
    pub lex_duration:   Duration,
    /// Time spent parsing.
    pub parse_duration: Duration,
    /// Time spent lowering and executing.
    pub exec_duration:  Duration,
}

impl ExecutionReport {
    /// The value of the last executed statement.
    #[must_use]
    pub fn last(&self) -> Option<&Value> {
        self.results.last()
    }
}

/// A shared in-memory output sink.
///
/// Clones write to the same buffer, so one clone can be handed to a
/// [`Session`] while another reads what the program printed.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    /// Returns everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A long-lived evaluation context.
///
/// Every unit executed through a session runs in the same global scope, so
/// declarations made by one are visible to the next. This is what the REPL
/// and the library loader build on.
///
/// # Example
/// ```
/// use kiln::{interpreter::value::core::Value, session::Session};
///
/// let mut session = Session::new().unwrap();
/// session.execute("first", "let a = 3", false).unwrap();
/// let report = session.execute("second", "a * 2", false).unwrap();
///
/// assert_eq!(report.results, vec![Value::Int(6)]);
/// ```
pub struct Session {
    evaluator: Evaluator,
    root:      Rc<Context>,
}

impl Session {
    /// Creates a session writing program output to standard output.
    ///
    /// # Errors
    /// Fails only if the global scope cannot be prepared.
    pub fn new() -> Result<Self, ExecuteError> {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates a session writing program output to `output`.
    ///
    /// # Errors
    /// Fails only if the global scope cannot be prepared.
    pub fn with_output(output: Box<dyn Write>) -> Result<Self, ExecuteError> {
        let mut evaluator = Evaluator::new(output);
        let root = evaluator.global_scope()?;
        Ok(Self { evaluator, root })
    }

    /// Lexes, parses and runs one source unit.
    ///
    /// A unit with syntax errors is not run at all. A runtime error stops the
    /// unit; declarations made before it stay in the session. In script mode
    /// every statement's result, unit included, is written to the output as
    /// it is produced.
    ///
    /// # Errors
    /// - [`ExecuteError::Syntax`] with every collected syntax error.
    /// - [`ExecuteError::Runtime`] with the error that stopped execution.
    pub fn execute(&mut self,
                   source_name: &str,
                   source: &str,
                   script_mode: bool)
                   -> Result<ExecutionReport, ExecuteError> {
        let started = Instant::now();
        let tokens = TokenStream::tokenize(source_name, source);
        let lex_duration = started.elapsed();
        debug!(source = source_name, tokens = tokens.len(), ?lex_duration, "lexed");

        let started = Instant::now();
        let outcome = Parser::new(TokenTape::from_tokens(tokens)).parse_program();
        let parse_duration = started.elapsed();

        let mut report = self.execute_parsed(source_name, outcome, script_mode)?;
        report.lex_duration = lex_duration;
        report.parse_duration = parse_duration;
        Ok(report)
    }

    /// Runs source text read line by line from `reader`, parsing while the
    /// input is still arriving. Lexing and parsing overlap, so their combined
    /// time is reported as parse time.
    ///
    /// # Errors
    /// The outer result fails if reading fails; the inner one as
    /// [`Session::execute`].
    pub fn execute_stream<R: BufRead + Send>(&mut self,
                                             source_name: &str,
                                             reader: R,
                                             script_mode: bool)
                                             -> io::Result<Result<ExecutionReport, ExecuteError>> {
        let started = Instant::now();
        let outcome = parse_lines(source_name, reader)?;
        let parse_duration = started.elapsed();

        Ok(self.execute_parsed(source_name, outcome, script_mode)
               .map(|mut report| {
                   report.parse_duration = parse_duration;
                   report
               }))
    }

    /// Runs an already parsed unit. Only execution time is reported.
    ///
    /// # Errors
    /// As [`Session::execute`].
    pub fn execute_parsed(&mut self,
                          source_name: &str,
                          outcome: ParseOutcome,
                          script_mode: bool)
                          -> Result<ExecutionReport, ExecuteError> {
        if !outcome.is_clean() {
            return Err(ExecuteError::Syntax { source_name: source_name.to_string(),
                                              errors:      outcome.errors, });
        }

        let started = Instant::now();
        let commands = lower_program(&outcome.statements);
        let results = self.run_commands(&commands, script_mode)?;
        let exec_duration = started.elapsed();
        debug!(source = source_name, results = results.len(), ?exec_duration, "executed");

        Ok(ExecutionReport { results,
                             exec_duration,
                             ..ExecutionReport::default() })
    }

    fn run_commands(&mut self, commands: &[Command], script_mode: bool) -> Result<Vec<Value>, ExecuteError> {
        // Every unit starts outside any namespace.
        self.root.set_namespace(None);
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            let flow = self.evaluator.execute(command, &self.root)?;
            let finished = matches!(flow, Flow::Return(_));
            let value = flow.into_value();
            if script_mode {
                self.evaluator.write_output(&value.to_string());
            }
            results.push(value);
            if finished {
                break;
            }
        }
        Ok(results)
    }

    /// Returns `true` once some executed unit has declared `namespace`.
    #[must_use]
    pub fn knows_namespace(&self, namespace: &str) -> bool {
        self.evaluator.knows_namespace(namespace)
    }

    /// Names declared in the global scope, sorted.
    #[must_use]
    pub fn globals(&self) -> Vec<String> {
        self.root.variable_names()
    }

    /// Number of scopes waiting in the reuse pool.
    #[must_use]
    pub fn pooled_frames(&self) -> usize {
        self.evaluator.pool_available()
    }
}
