use std::fs;

use kiln::{
    error::{ExecuteError, RuntimeError},
    execute,
    interpreter::value::core::Value,
    session::{OutputBuffer, Session},
};
use walkdir::WalkDir;

#[test]
fn example_scripts_work() {
    let mut count = 0;

    for entry in
        WalkDir::new("tests/scripts").sort_by_file_name()
                                     .into_iter()
                                     .filter_map(Result::ok)
                                     .filter(|e| e.path().extension().is_some_and(|ext| ext == "kiln"))
    {
        let path = entry.path();
        let content =
            fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"));

        count += 1;
        if let Err(e) = execute(&path.display().to_string(), &content, false) {
            panic!("Script {path:?} failed:\n{content}\nError: {e}");
        }
    }

    assert!(count > 0, "No scripts found in tests/scripts");
}

fn results(src: &str) -> Vec<Value> {
    match execute("test", src, false) {
        Ok(report) => report.results,
        Err(e) => panic!("Script failed: {e}"),
    }
}

fn last(src: &str) -> Value {
    results(src).pop().unwrap_or(Value::Unit)
}

fn assert_success(src: &str) {
    if let Err(e) = execute("test", src, false) {
        panic!("Script failed: {e}");
    }
}

fn assert_failure(src: &str) {
    if execute("test", src, false).is_ok() {
        panic!("Script succeeded but was expected to fail")
    }
}

fn runtime_error(src: &str) -> RuntimeError {
    match execute("test", src, false) {
        Err(ExecuteError::Runtime(e)) => e,
        Err(e) => panic!("Expected a runtime error, got: {e}"),
        Ok(report) => panic!("Script succeeded with {:?}", report.results),
    }
}

/// Runs `src` in a session whose output is captured.
fn output_of(src: &str) -> String {
    let buffer = OutputBuffer::default();
    let mut session = Session::with_output(Box::new(buffer.clone())).unwrap();
    if let Err(e) = session.execute("test", src, false) {
        panic!("Script failed: {e}");
    }
    buffer.contents()
}

#[test]
fn one_result_per_statement() {
    assert_eq!(results("let a = 3\na"), vec![Value::Unit, Value::Int(3)]);
    assert_eq!(results("1 + 2\n\n\n3 * 4"), vec![Value::Int(3), Value::Int(12)]);
}

#[test]
fn assignment_and_basic_arithmetic() {
    assert_success("let x = 1 + 2\nassert(x == 3)");
    assert_success("let x = 7 * 9\nassert(x == 63)");
    assert_success("let x = 8 - 5\nassert(x == 3)");
    assert_success("let x = 10 / 2\nassert(x == 5)");
    assert_eq!(last("1 + 2 * 3"), Value::Int(7));
    assert_eq!(last("(1 + 2) * 3"), Value::Int(9));
    assert_eq!(last("10 - 4 - 3"), Value::Int(3));
    assert_eq!(last("-(2 + 3)"), Value::Int(-5));
}

#[test]
fn mixed_numbers_promote_to_float() {
    assert_eq!(last("1 + 0.5"), Value::Float(1.5));
    assert_eq!(last("3 / 2.0"), Value::Float(1.5));
    assert_eq!(last("7 / 2"), Value::Int(3));
    assert_eq!(last("1 == 1.0"), Value::Bool(true));
    assert_eq!(last("2.5 < 3"), Value::Bool(true));
}

#[test]
fn arithmetic_errors() {
    assert!(matches!(runtime_error("1 / 0"), RuntimeError::DivisionByZero { line: 1 }));
    assert!(matches!(runtime_error("9223372036854775807 + 1"), RuntimeError::Overflow { .. }));
    assert_eq!(last("1.0 / 0"), Value::Float(f64::INFINITY));
}

#[test]
fn declared_type_is_enforced() {
    assert_eq!(results("let a: Int = 3\na"), vec![Value::Unit, Value::Int(3)]);
    assert!(matches!(runtime_error("let a: Int = 3.5"), RuntimeError::TypeMismatch { .. }));
    assert_success("let a: Float | Int = 3\nlet b: Any = \"x\"");
}

#[test]
fn failed_declaration_leaves_no_binding() {
    let mut session = Session::with_output(Box::new(std::io::sink())).unwrap();
    assert!(session.execute("first", "let a: Int = 3.5", false).is_err());
    assert!(!session.globals().contains(&"a".to_string()));
    assert!(matches!(session.execute("second", "a", false),
                     Err(ExecuteError::Runtime(RuntimeError::UnknownName { .. }))));
}

#[test]
fn mutability() {
    assert_eq!(results("let mut a = 3\na = 4\na"),
               vec![Value::Unit, Value::Unit, Value::Int(4)]);
    assert!(matches!(runtime_error("let a = 3\na = 4"),
                     RuntimeError::ImmutableAssignment { line: 2, .. }));
    assert!(matches!(runtime_error("let mut a = 3\na = \"four\""),
                     RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("b = 1"), RuntimeError::UnknownName { .. }));
}

#[test]
fn redeclaration_in_same_scope_fails() {
    assert!(matches!(runtime_error("let a = 1\nlet a = 2"), RuntimeError::Redeclaration { .. }));
    assert_eq!(last("let a = 1\nlet f = () => {\nlet a = 2\na\n}\nf() + a"), Value::Int(3));
}

#[test]
fn unknown_names_and_types() {
    assert!(matches!(runtime_error("x + 1"), RuntimeError::UnknownName { .. }));
    assert!(matches!(runtime_error("let a: Nope = 1"), RuntimeError::UnknownType { .. }));
    assert!(matches!(runtime_error("3.foo()"), RuntimeError::UnknownMember { .. }));
    assert!(matches!(runtime_error("let a = 3\na(1)"), RuntimeError::NotCallable { .. }));
}

#[test]
fn recursive_function() {
    let src = "let fact = (Int n) Int => {\n\
                   if n <= 1 => return 1\n\
                   return n * fact(n - 1)\n\
               }\n\
               fact(8)";
    assert_eq!(last(src), Value::Int(40320));
}

#[test]
fn function_arguments_are_checked() {
    assert!(matches!(runtime_error("let f = (Int n) => n\nf(\"x\")"),
                     RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("let f = (Int n) => n\nf(1, 2)"),
                     RuntimeError::ArgumentCountMismatch { expected: 1, found: 2, .. }));
    assert!(matches!(runtime_error("let f = (Int n) String => n\nf(1)"),
                     RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("let f = (Int n) => n\nn = 2"), RuntimeError::UnknownName { .. }));
}

#[test]
fn parameters_are_immutable() {
    assert!(matches!(runtime_error("let f = (Int n) => {\nn = 2\n}\nf(1)"),
                     RuntimeError::ImmutableAssignment { .. }));
}

#[test]
fn return_leaves_nested_blocks_and_loops() {
    let src = "let find = (Int limit) Int => {\n\
                   let mut i = 0\n\
                   while true {\n\
                       if i * i > limit => return i\n\
                       i = i + 1\n\
                   }\n\
                   return -1\n\
               }\n\
               find(50)";
    assert_eq!(last(src), Value::Int(8));
}

#[test]
fn closures_see_their_defining_scope() {
    let src = "let makeAdder = (Int n) => (Int x) => x + n\n\
               let addFive = makeAdder(5)\n\
               addFive(10)";
    assert_eq!(last(src), Value::Int(15));
}

#[test]
fn higher_order_functions_check_signatures() {
    let src = "let apply = ((Int) => Int f, Int x) => f(x)\n\
               apply((Int n) Int => n * 2, 21)";
    assert_eq!(last(src), Value::Int(42));
    assert!(matches!(runtime_error("let apply = ((Int) => Int f) => f(1)\napply((String s) Int => 1)"),
                     RuntimeError::TypeMismatch { .. }));
}

#[test]
fn declared_function_types_bind_unannotated_returns() {
    assert!(matches!(runtime_error("let f: (Int) => Int = (Int n) => \"oops\"\nf(1)"),
                     RuntimeError::TypeMismatch { .. }));
    assert_eq!(last("let f: (Int) => Int = (Int n) => n + 1\nf(1)"), Value::Int(2));

    let src = "let apply = ((Int) => Int f, Int x) => f(x)\n\
               apply((Int n) => n * 2, 21)";
    assert_eq!(last(src), Value::Int(42));
    assert!(matches!(runtime_error("let apply = ((Int) => Int f) => f(1)\napply((Int n) => \"one\")"),
                     RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("let f: (Int) => Int = (Int n) String => \"x\""),
                     RuntimeError::TypeMismatch { .. }));
}

#[test]
fn empty_literals_take_the_declared_element_type() {
    assert!(matches!(runtime_error("let xs = []\nlet ys: [Int] = xs\nxs.add(\"s\")"),
                     RuntimeError::TypeMismatch { .. }));
    assert_eq!(last("let m: [String: Int] = [:]\nm.set(\"a\", 1)\nm[\"a\"]"), Value::Int(1));
    assert!(matches!(runtime_error("let m: [String: Int] = [:]\nm.set(\"a\", true)"),
                     RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("let xs: [Int] = [1]\nlet ys: [String] = xs"),
                     RuntimeError::TypeMismatch { .. }));
}

#[test]
fn variables_win_over_parameters() {
    assert_eq!(last("let n = 1\nlet f = (Int n) => n\nf(5)"), Value::Int(1));
    assert_eq!(last("let f = (Int n) => {\nlet m = n\nm\n}\nf(5)"), Value::Int(5));
    assert_eq!(last("let outer = (Int a) => (Int b) => a + b\nouter(1)(2)"), Value::Int(3));
}

#[test]
fn tail_if_is_an_expression() {
    let src = "let sign = (Int n) => {\n\
                   if n < 0 => \"negative\"\n\
                   else if n == 0 => \"zero\"\n\
                   else => \"positive\"\n\
               }\n\
               sign(-3) + \" \" + sign(0) + \" \" + sign(7)";
    assert_eq!(last(src), Value::from("negative zero positive"));
}

#[test]
fn conditions_must_be_boolean() {
    assert!(matches!(runtime_error("if 1 => 2"), RuntimeError::ExpectedBoolean { .. }));
    assert!(matches!(runtime_error("while \"yes\" { }"), RuntimeError::ExpectedBoolean { .. }));
}

#[test]
fn logic_short_circuits() {
    assert_eq!(last("false && undefined"), Value::Bool(false));
    assert_eq!(last("true || undefined"), Value::Bool(true));
    assert_eq!(last("1 < 2 && 2 < 3"), Value::Bool(true));
    assert_eq!(last("!(1 != 1)"), Value::Bool(true));
}

#[test]
fn while_loop() {
    let src = "let mut total = 0\n\
               let mut i = 1\n\
               while i <= 10 {\n\
                   total = total + i\n\
                   i = i + 1\n\
               }\n\
               total";
    assert_eq!(last(src), Value::Int(55));
}

#[test]
fn struct_construction_and_fields() {
    let src = "struct Person {\nString name\nInt age\n}\nPerson(\"Dave\", 50).name";
    assert_eq!(last(src), Value::from("Dave"));

    let src = "struct Point {\nx = 0\ny = 0\n}\nlet p = Point(3)\np.x + p.y";
    assert_eq!(last(src), Value::Int(3));

    assert!(matches!(runtime_error("struct P {\nInt x\n}\nP()"), RuntimeError::MissingField { .. }));
    assert!(matches!(runtime_error("struct P {\nInt x\n}\nP(\"x\")"), RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("struct P {\nInt x\n}\nP(1, 2)"),
                     RuntimeError::ArgumentCountMismatch { .. }));
}

#[test]
fn instances_are_shared() {
    let src = "struct Counter {\nInt count\n}\n\
               let a = Counter(1)\n\
               let b = a\n\
               b.count = 5\n\
               a.count";
    assert_eq!(last(src), Value::Int(5));
    assert!(matches!(runtime_error("struct C {\nInt count\n}\nlet c = C(1)\nc.count = \"x\""),
                     RuntimeError::TypeMismatch { .. }));
}

#[test]
fn structs_are_structural() {
    let src = "struct Named {\nString name\n}\n\
               struct Person {\nString name\nInt age\n}\n\
               let greet = (Named n) => \"Hello, \" + n.name\n\
               greet(Person(\"Ada\", 36))";
    assert_eq!(last(src), Value::from("Hello, Ada"));
    assert_eq!(last("struct A {\nInt x\n}\nstruct B {\nString y\n}\nA(1) is B"), Value::Bool(false));
}

#[test]
fn extend_adds_methods_to_existing_instances() {
    let src = "struct Person {\nString name\nInt age\n}\n\
               let dave = Person(\"Dave\", 50)\n\
               extend Person as p {\n\
                   let greet = () => \"Hi, \" + name\n\
                   let older = (Int years) => p.age + years\n\
                   let self = () => this\n\
               }\n\
               assert(dave.older(5) == 55)\n\
               assert(dave.self().age == 50)\n\
               dave.greet()";
    assert_eq!(last(src), Value::from("Hi, Dave"));
}

#[test]
fn extend_builtin_types() {
    let src = "extend Int as n {\n\
                   let squared = () => n * n\n\
               }\n\
               7.squared()";
    assert_eq!(last(src), Value::Int(49));
    assert_eq!(last("extend String {\nlet shout = () => this + \"!\"\n}\n\"hey\".shout()"),
               Value::from("hey!"));
    assert!(matches!(runtime_error("extend Nope {\n}"), RuntimeError::UnknownType { .. }));
}

#[test]
fn extension_can_assign_receiver_fields() {
    let src = "struct Counter {\nInt count\n}\n\
               extend Counter {\n\
                   let bump = () => {\n\
                       count = count + 1\n\
                   }\n\
               }\n\
               let c = Counter(0)\n\
               c.bump()\n\
               c.bump()\n\
               c.count";
    assert_eq!(last(src), Value::Int(2));
}

#[test]
fn lazy_declarations_run_on_first_read() {
    let src = "let lazy answer = {\n\
                   print(\"computing\")\n\
                   42\n\
               }\n\
               print(\"declared\")\n\
               print(answer)\n\
               print(answer)";
    assert_eq!(output_of(src), "declared\ncomputing\n42\n42\n");

    assert_success("let lazy never = undefined + 1");
    assert!(matches!(runtime_error("let lazy a: Int = \"text\"\na"), RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("let lazy a = a + 1\na"),
                     RuntimeError::CyclicInitialization { .. }));
}

#[test]
fn restricted_bindings_stay_in_their_namespace() {
    let mut session = Session::with_output(Box::new(std::io::sink())).unwrap();
    session.execute("library", "namespace geometry\nlet restricted scale = 2\nlet area = (Int w, Int h) => w * h * scale", false)
           .unwrap();

    let report = session.execute("user", "area(2, 3)", false).unwrap();
    assert_eq!(report.results, vec![Value::Int(12)]);

    assert!(matches!(session.execute("user", "scale", false),
                     Err(ExecuteError::Runtime(RuntimeError::RestrictedAccess { .. }))));

    let report = session.execute("same", "namespace geometry\nscale", false).unwrap();
    assert_eq!(report.last(), Some(&Value::Int(2)));
}

#[test]
fn restricted_outside_a_namespace_is_unrestricted() {
    assert_eq!(last("let restricted a = 1\na"), Value::Int(1));
}

#[test]
fn imports_require_a_declared_namespace() {
    assert!(matches!(runtime_error("import missing"), RuntimeError::UnknownNamespace { .. }));

    let mut session = Session::with_output(Box::new(std::io::sink())).unwrap();
    session.execute("provider", "namespace shapes\nlet base = 1", false).unwrap();
    assert!(session.knows_namespace("shapes"));
    let report = session.execute("consumer", "import shapes\nbase + 1", false).unwrap();
    assert_eq!(report.last(), Some(&Value::Int(2)));
}

#[test]
fn collections() {
    assert_eq!(last("let xs = [1, 2, 3]\nxs[1]"), Value::Int(2));
    assert_eq!(last("let xs = [1, 2, 3]\nxs.size()"), Value::Int(3));
    assert_eq!(last("let xs = [1, 2]\nlet ys = xs\nys.add(3)\nxs.size()"), Value::Int(3));
    assert_eq!(last("[1, 2] == [1, 2]"), Value::Bool(true));
    assert_eq!(last("let xs: [Int] = []\nxs.add(4)\nxs[0]"), Value::Int(4));
    assert!(matches!(runtime_error("[1, 2][5]"), RuntimeError::IndexOutOfBounds { size: 2, .. }));
    assert!(matches!(runtime_error("let xs = [1, 2]\nxs.add(\"three\")"),
                     RuntimeError::TypeMismatch { .. }));
    assert!(matches!(runtime_error("let xs: [String] = [1]"), RuntimeError::TypeMismatch { .. }));
}

#[test]
fn maps() {
    assert_eq!(last("let ages = [\"ada\": 36, \"alan\": 41]\nages[\"alan\"]"), Value::Int(41));
    assert_eq!(last("let m = [:]\nm.set(1.5, \"x\")\nm.get(1.5)"), Value::from("x"));
    assert_eq!(last("let m = [true: 1]\nm.contains(false)"), Value::Bool(false));
    assert_eq!(last("let m = [1: 1]\nm.set(2, 4)\nm.size()"), Value::Int(2));
    assert!(matches!(runtime_error("let m = [1: 1]\nm[2]"), RuntimeError::MissingKey { .. }));
    assert!(matches!(runtime_error("[[1]: 1]"), RuntimeError::InvalidMapKey { .. }));
    assert!(matches!(runtime_error("let m = [1: 1]\nm.set(\"a\", 1)"), RuntimeError::TypeMismatch { .. }));
}

#[test]
fn type_tests_and_conversions() {
    assert_eq!(last("3 is Int"), Value::Bool(true));
    assert_eq!(last("3 is Float"), Value::Bool(false));
    assert_eq!(last("3 is Int | String"), Value::Bool(true));
    assert_eq!(last("[1, 2] is [Int]"), Value::Bool(true));
    assert_eq!(last("\"x\" is Any"), Value::Bool(true));
    assert_eq!(last("3 as Float"), Value::Float(3.0));
    assert_eq!(last("4.0 as Int"), Value::Int(4));
    assert!(matches!(runtime_error("3.9 as Int"), RuntimeError::InvalidConversion { .. }));
    assert_eq!(last("42 as String"), Value::from("42"));
    assert_eq!(last("\" 17 \" as Int"), Value::Int(17));
    assert!(matches!(runtime_error("\"abc\" as Int"), RuntimeError::InvalidConversion { .. }));
    assert!(matches!(runtime_error("true as Int"), RuntimeError::InvalidConversion { .. }));
}

#[test]
fn strings() {
    assert_eq!(last("\"a\" + 1 + true"), Value::from("a1true"));
    assert_eq!(last("\"héllo\".size()"), Value::Int(5));
    assert_eq!(last("\"tab\\there\""), Value::from("tab\there"));
    assert_eq!(last("12.toString() + \"!\""), Value::from("12!"));
    assert_eq!(last("\"a\" == \"a\""), Value::Bool(true));
}

#[test]
fn print_and_script_mode() {
    assert_eq!(output_of("print(1 + 1)\nprint(\"two\")\nprint([1, \"a\"])"),
               "2\ntwo\n[1, \"a\"]\n");

    let buffer = OutputBuffer::default();
    let mut session = Session::with_output(Box::new(buffer.clone())).unwrap();
    session.execute("script", "let a = 2\na * 3\nprint(a)", true).unwrap();
    assert_eq!(buffer.contents(), "unit\n6\n2\nunit\n");
}

#[test]
fn top_level_return_ends_the_unit() {
    assert_eq!(results("1\nreturn 2\n3"), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn assertions() {
    assert_success("assert(1 < 2)");
    assert!(matches!(runtime_error("assert(2 < 1)"), RuntimeError::AssertionFailed { line: 1 }));
}

#[test]
fn builtins_can_be_shadowed() {
    assert_eq!(last("let print = (Int n) => n * 2\nprint(4)"), Value::Int(8));
}

#[test]
fn syntax_errors_prevent_execution() {
    let buffer = OutputBuffer::default();
    let mut session = Session::with_output(Box::new(buffer.clone())).unwrap();
    let result = session.execute("broken", "print(1)\nlet = 2\nlet b = (", false);

    match result {
        Err(ExecuteError::Syntax { errors, .. }) => assert_eq!(errors.len(), 2),
        other => panic!("Expected syntax errors, got {other:?}"),
    }
    assert_eq!(buffer.contents(), "");
    assert_failure("let a = 1 +");
}

#[test]
fn runtime_errors_keep_earlier_declarations() {
    let mut session = Session::with_output(Box::new(std::io::sink())).unwrap();
    assert!(session.execute("unit", "let a = 1\nlet b = a / 0\nlet c = 3", false)
                   .is_err());
    let globals = session.globals();
    assert!(globals.contains(&"a".to_string()));
    assert!(!globals.contains(&"c".to_string()));
}

#[test]
fn call_frames_are_pooled() {
    let mut session = Session::with_output(Box::new(std::io::sink())).unwrap();
    assert_eq!(session.pooled_frames(), 0);

    session.execute("unit", "let inc = (Int n) => n + 1\ninc(1)", false)
           .unwrap();
    let after_one = session.pooled_frames();
    assert!(after_one >= 1);

    let report = session.execute("unit", "inc(inc(inc(1)))", false).unwrap();
    assert_eq!(report.last(), Some(&Value::Int(4)));
    assert_eq!(session.pooled_frames(), after_one);
}

#[test]
fn reports_stage_durations() {
    let report = execute("timed", "let a = 1\na + 1", false).unwrap();
    assert_eq!(report.last(), Some(&Value::Int(2)));
    assert!(report.exec_duration >= std::time::Duration::ZERO);
}
