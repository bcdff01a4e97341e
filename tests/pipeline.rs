use std::io::Cursor;

use kiln::{
    interpreter::{
        parser::core::parse_source,
        pipeline::{parse_concurrently, parse_lines},
        value::core::Value,
    },
    session::{OutputBuffer, Session},
};

const PROGRAM: &str = "struct Point {\nInt x\nInt y\n}\n\
                       let norm = (Point p) Int => {\n\
                           if p.x < 0 => return -p.x + p.y\n\
                           p.x + p.y\n\
                       }\n\
                       let points = [Point(1, 2), Point(-3, 4)]\n\
                       let mut i = 0\n\
                       while i < points.size() {\n\
                           print(norm(points[i]))\n\
                           i = i + 1\n\
                       }";

#[test]
fn concurrent_parse_matches_batch_parse() {
    assert_eq!(parse_concurrently("demo", PROGRAM), parse_source("demo", PROGRAM));
}

#[test]
fn concurrent_parse_collects_errors_in_order() {
    let source = "let = 1\nlet ok = 2\nlet b = $\nlet c = (";
    let concurrent = parse_concurrently("demo", source);
    let batch = parse_source("demo", source);

    assert_eq!(concurrent.errors.len(), 3);
    assert_eq!(concurrent, batch);
}

#[test]
fn empty_input() {
    let outcome = parse_concurrently("empty", "");
    assert!(outcome.is_clean());
    assert!(outcome.statements.is_empty());
}

#[test]
fn line_fed_parse_matches_batch_parse() {
    let streamed = parse_lines("demo", Cursor::new(PROGRAM)).unwrap();
    let batch = parse_source("demo", PROGRAM);

    assert!(streamed.is_clean(), "unexpected errors: {:?}", streamed.errors);
    assert_eq!(streamed.statements, batch.statements);
}

#[test]
fn line_fed_errors_keep_their_lines() {
    let outcome = parse_lines("stdin", Cursor::new("let a = 1\n\nlet = 2\n")).unwrap();
    assert_eq!(outcome.statements.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].token().position.line, 3);
}

#[test]
fn streamed_source_runs_in_a_session() {
    let buffer = OutputBuffer::default();
    let mut session = Session::with_output(Box::new(buffer.clone())).unwrap();
    let report = session.execute_stream("stdin", Cursor::new(PROGRAM), false)
                        .unwrap()
                        .unwrap();

    assert_eq!(report.last(), Some(&Value::Unit));
    assert_eq!(buffer.contents(), "3\n7\n");
}
