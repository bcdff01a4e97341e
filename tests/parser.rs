use kiln::{
    ast::{Expression, Statement},
    error::SyntaxError,
    interpreter::parser::core::parse_source,
};

fn render(src: &str) -> Vec<String> {
    let outcome = parse_source("test", src);
    assert!(outcome.is_clean(), "unexpected errors: {:?}", outcome.errors);
    outcome.statements.iter().map(ToString::to_string).collect()
}

fn single(src: &str) -> Statement {
    let mut outcome = parse_source("test", src);
    assert!(outcome.is_clean(), "unexpected errors: {:?}", outcome.errors);
    assert_eq!(outcome.statements.len(), 1);
    outcome.statements.remove(0)
}

fn expression(src: &str) -> Expression {
    match single(src) {
        Statement::Expression { expr, .. } => expr,
        other => panic!("expected an expression statement, got {other}"),
    }
}

#[test]
fn precedence_and_associativity() {
    assert_eq!(render("1 + 2 * 3"), vec!["(1 + (2 * 3))"]);
    assert_eq!(render("a - b - c"), vec!["((a - b) - c)"]);
    assert_eq!(render("a || b && c == d + e * -f"),
               vec!["(a || (b && (c == (d + (e * (-f))))))"]);
    assert_eq!(render("(1 + 2) * 3"), vec!["((1 + 2) * 3)"]);
    assert_eq!(render("!a.b(c)[0]"), vec!["(!a.b(c)[0])"]);
}

#[test]
fn type_operators_bind_between_comparison_and_arithmetic() {
    assert_eq!(render("a + 1 is Int == true"), vec!["(((a + 1) is Int) == true)"]);
    assert_eq!(render("x as Float | Int"), vec!["(x as (Float | Int))"]);
}

#[test]
fn function_literal_versus_group() {
    assert!(matches!(expression("(Int n) => n"), Expression::Function(_)));
    assert!(matches!(expression("(n)"), Expression::Identifier { .. }));
    assert!(matches!(expression("() => 1"), Expression::Function(_)));
    assert!(matches!(expression("(Int a, Int b) Int => a + b"), Expression::Function(_)));

    let Expression::Function(function) = expression("(Int a, [String] b) Int => a") else {
        panic!("expected a function literal");
    };
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameters[1].ty.to_string(), "[String]");
    assert_eq!(function.return_type.as_ref().map(ToString::to_string).as_deref(), Some("Int"));
}

#[test]
fn declarations_with_modifiers() {
    let Statement::Declaration(declaration) = single("let mut lazy x: Int | String = 1") else {
        panic!("expected a declaration");
    };
    assert!(declaration.mutable && declaration.lazy && !declaration.restricted);
    assert_eq!(declaration.declared_type.map(|ty| ty.to_string()).as_deref(),
               Some("(Int | String)"));
}

#[test]
fn repeated_modifier_is_an_error() {
    let outcome = parse_source("test", "let mut mut x = 1");
    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(outcome.errors[0], SyntaxError::Other { .. }));
}

#[test]
fn collections_maps_and_indexing() {
    assert_eq!(render("[1, 2, 3]"), vec!["[1, 2, 3]"]);
    assert_eq!(render("[\"a\": 1, \"b\": 2]"), vec!["[\"a\": 1, \"b\": 2]"]);
    assert_eq!(render("[:]"), vec!["[:]"]);
    assert_eq!(render("[]"), vec!["[]"]);
    assert_eq!(render("m[k + 1]"), vec!["m[(k + 1)]"]);
}

#[test]
fn if_else_chains_and_loops() {
    let rendered = render("if a => b\nelse if c => d\nelse {\ne\n}");
    assert_eq!(rendered, vec!["if a {\nb\n} else if c {\nd\n} else {\ne\n}"]);

    let Statement::While { body, .. } = single("while i < 3 {\ni = i + 1\n}") else {
        panic!("expected a loop");
    };
    assert_eq!(body.statements.len(), 1);
}

#[test]
fn struct_extend_namespace_and_import() {
    let statements = render("struct P {\nString name, age = 3\n}\n\
                             extend P as p {\nlet f = () => p\n}\n\
                             namespace geo\n\
                             import geo");
    assert_eq!(statements,
               vec!["struct P {\nString name\nage = 3\n}",
                    "extend P as p {\nlet f = (() => {\np\n})\n}",
                    "namespace geo",
                    "import geo"]);
}

#[test]
fn assignment_targets() {
    assert!(matches!(single("a = 1"), Statement::Assignment { .. }));
    assert!(matches!(single("a.b = 1"), Statement::Assignment { .. }));

    let outcome = parse_source("test", "f() = 1");
    assert!(matches!(outcome.errors.as_slice(), [SyntaxError::InvalidAssignmentTarget { .. }]));
}

#[test]
fn rendering_parses_back_to_the_same_tree() {
    let src = "let fact = (Int n) Int => {\n\
                   if n <= 1 => return 1\n\
                   return n * fact(n - 1)\n\
               }\n\
               struct Pair {\nInt left\nright = \"r\"\n}\n\
               let lookup: [String: (Int) => Bool] = [:]\n\
               let mut xs = [1.5, -2.0, 3.0]\n\
               while !(xs.size() > 5) {\nxs.add(0.5)\n}\n\
               if xs[0] is Float => print(\"tab\\there\")\n\
               p.left = fact(3) as Float";
    let first = parse_source("first", src);
    assert!(first.is_clean(), "unexpected errors: {:?}", first.errors);

    let rendered = first.statements
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n");
    let second = parse_source("second", &rendered);
    assert!(second.is_clean(), "rendered source did not parse:\n{rendered}\n{:?}", second.errors);

    let rerendered = second.statements
                           .iter()
                           .map(ToString::to_string)
                           .collect::<Vec<_>>()
                           .join("\n");
    assert_eq!(rendered, rerendered);
}

#[test]
fn illegal_character_reports_one_error_and_recovers() {
    let outcome = parse_source("test", "let a = 1 $ 2\nlet b = 3");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.statements.len(), 1);
    assert_eq!(outcome.statements[0].to_string(), "let b = 3");

    let error = &outcome.errors[0];
    assert!(matches!(error, SyntaxError::IllegalCharacter { .. }));
    assert_eq!(error.token().literal, "$");
    assert_eq!(error.token().position.line, 1);
}

#[test]
fn errors_inside_brackets_skip_the_whole_statement() {
    let outcome = parse_source("test", "let f = (Int n) => {\nn +\n}\nlet ok = 1");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.statements.len(), 1);
    assert_eq!(outcome.statements[0].to_string(), "let ok = 1");
}

#[test]
fn every_error_is_collected() {
    let outcome = parse_source("test", "let = 1\nlet b = 2\n)\nlet c 3");
    assert_eq!(outcome.errors.len(), 3);
    assert_eq!(outcome.statements.len(), 1);
}

#[test]
fn statements_need_separators() {
    let outcome = parse_source("test", "let a = 1 let b = 2");
    assert!(!outcome.is_clean());
}

#[test]
fn unexpected_end_of_input() {
    let outcome = parse_source("test", "let a = (1 +");
    assert!(matches!(outcome.errors.as_slice(), [SyntaxError::UnexpectedEndOfInput { .. }]));
}

#[test]
fn integer_literal_out_of_range() {
    let outcome = parse_source("test", "99999999999999999999");
    assert!(matches!(outcome.errors.as_slice(), [SyntaxError::LiteralOutOfRange { .. }]));
}

#[test]
fn error_at_a_line_break_keeps_the_next_statement() {
    let outcome = parse_source("test", "let a = 1 +\nlet b = 2\nb");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].token().position.line, 1);
    let rendered = outcome.statements.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(rendered, vec!["let b = 2", "b"]);

    let outcome = parse_source("test", "let a: \nlet b = 2");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.statements.len(), 1);
    assert_eq!(outcome.statements[0].to_string(), "let b = 2");
}

#[test]
fn less_than_after_a_type_is_a_comparison() {
    assert_eq!(render("a as Int < 6"), vec!["((a as Int) < 6)"]);
    assert_eq!(render("a is Float < b"), vec!["((a is Float) < b)"]);

    let Statement::Declaration(declaration) = single("let x: Box<Int, [String]> = 1") else {
        panic!("expected a declaration");
    };
    assert_eq!(declaration.declared_type.map(|ty| ty.to_string()).as_deref(),
               Some("Box<Int, [String]>"));
}

#[test]
fn line_breaks_inside_brackets_continue_the_expression() {
    assert_eq!(render("(1 +\n2)"), vec!["(1 + 2)"]);
    assert_eq!(render("(1\n* 2)"), vec!["(1 * 2)"]);
    assert_eq!(render("[1 +\n2, 3]"), vec!["[(1 + 2), 3]"]);
    assert_eq!(render("xs[i +\n1]"), vec!["xs[(i + 1)]"]);

    let outcome = parse_source("test", "f(() => {\na\nb\n})");
    assert!(outcome.is_clean(), "unexpected errors: {:?}", outcome.errors);
    let Statement::Expression { expr: Expression::Call { arguments, .. }, .. } = &outcome.statements[0] else {
        panic!("expected a call");
    };
    let Expression::Function(function) = &arguments[0] else {
        panic!("expected a function literal");
    };
    assert_eq!(function.body.statements.len(), 2);

    assert!(!parse_source("test", "1 +\n2").is_clean());
}
