use std::{
    io::{self, BufRead},
    sync::{Arc, mpsc},
    thread,
};

use tracing::debug;

use crate::interpreter::{
    lexer::{Token, TokenStream},
    parser::core::{ParseOutcome, Parser},
    tape::TokenTape,
};

/// Parses a complete source unit with lexing and parsing running as two
/// tasks.
///
/// The lexer thread sends tokens through a queue the parser reads from; the
/// parser sends statements and errors through two more queues, each drained
/// by its own collector. The parse is complete once both collectors have
/// been joined, in whichever order their queues close.
///
/// # Example
/// ```
/// use kiln::interpreter::{parser::core::parse_source, pipeline::parse_concurrently};
///
/// let source = "let a = 1\nlet b = a +\na * 2";
///
/// assert_eq!(parse_concurrently("demo", source), parse_source("demo", source));
/// ```
#[must_use]
pub fn parse_concurrently(source_name: &str, source: &str) -> ParseOutcome {
    let outcome = run(source_name, |tokens| {
        let mut count = 0usize;
        for token in TokenStream::new(source_name, source) {
            count += 1;
            if tokens.send(token).is_err() {
                break;
            }
        }
        debug!(tokens = count, "lexer finished");
        Ok(())
    });
    // Lexing an in-memory string cannot fail.
    outcome.unwrap_or_default()
}

/// Parses source text that arrives line by line, for instance from standard
/// input.
///
/// Each line is lexed as soon as it is read, so parsing of earlier lines is
/// under way while later ones are still arriving. A token inside a line never
/// spans into the next one.
///
/// # Errors
/// Returns the first error raised while reading.
///
/// # Example
/// ```
/// use kiln::interpreter::pipeline::parse_lines;
///
/// let input = "let a = 2\na * 3\n".as_bytes();
/// let outcome = parse_lines("stdin", input).unwrap();
///
/// assert!(outcome.is_clean());
/// assert_eq!(outcome.statements.len(), 2);
/// ```
pub fn parse_lines<R: BufRead + Send>(source_name: &str, mut reader: R) -> io::Result<ParseOutcome> {
    let name: Arc<str> = Arc::from(source_name);
    run(source_name, move |tokens| {
        let mut line = String::new();
        let mut offset = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            for token in TokenStream::fragment(Arc::clone(&name), &line, offset) {
                if tokens.send(token).is_err() {
                    return Ok(());
                }
            }
            offset += 1;
        }
        debug!(lines = offset, "input exhausted");
        Ok(())
    })
}

/// Wires a token producer to a parser and the two result collectors.
fn run<P>(source_name: &str, produce: P) -> io::Result<ParseOutcome>
    where P: FnOnce(mpsc::Sender<Token>) -> io::Result<()> + Send
{
    let (token_tx, token_rx) = mpsc::channel();
    let (statement_tx, statement_rx) = mpsc::channel();
    let (error_tx, error_rx) = mpsc::channel();

    thread::scope(|scope| {
        let producer = scope.spawn(move || produce(token_tx));
        let statements = scope.spawn(move || statement_rx.iter().collect::<Vec<_>>());
        let errors = scope.spawn(move || error_rx.iter().collect::<Vec<_>>());

        Parser::new(TokenTape::from_receiver(token_rx, source_name)).parse_into(statement_tx, error_tx);

        let outcome = ParseOutcome { statements: join(statements),
                                     errors:     join(errors), };
        debug!(statements = outcome.statements.len(),
               errors = outcome.errors.len(),
               "pipeline joined");
        join(producer).map(|()| outcome)
    })
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join()
          .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}
