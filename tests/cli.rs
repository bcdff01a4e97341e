use std::{
    io::Write,
    process::{Command, Output, Stdio},
};

fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_kiln")).args(args)
                                                            .stdin(Stdio::piped())
                                                            .stdout(Stdio::piped())
                                                            .stderr(Stdio::piped())
                                                            .spawn()
                                                            .unwrap();
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn streams_standard_input() {
    let output = run_with_stdin(&["--stdin"], "let a = 2\nprint(a * 3)\n");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "6\n");
}

#[test]
fn standard_input_errors_fail_the_run() {
    let output = run_with_stdin(&["--stdin"], "let a = 1\na / 0\n");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn inline_contents_in_script_mode() {
    let output = Command::new(env!("CARGO_BIN_EXE_kiln")).args(["--script-mode", "1 + 2"])
                                                         .output()
                                                         .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "3\n");
}
