//! Integration tests for the gridcalc binary

use std::io::Write;
use std::process::{Command, Stdio};

fn gridcalc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridcalc"));
    // Tests must not depend on a user's config.toml or default.rhai.
    cmd.arg("--no-config").arg("--no-default-functions");
    cmd.env_remove("GRIDCALC_LOG");
    cmd
}

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = gridcalc()
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn run_stdin(args: &[&str], input: &str) -> (String, String, i32) {
    let mut child = gridcalc()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn gridcalc");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for gridcalc");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn test_basic_arithmetic() {
    let (stdout, _, code) = run_command(&["-c", "set A1 =5 + 3", "-c", "get A1"]);
    assert_eq!(stdout, "8\n");
    assert_eq!(code, 0);
}

#[test]
fn test_integer_division_is_exact() {
    let (stdout, _, code) = run_command(&["-c", "set A1 =1/2", "-c", "get A1"]);
    assert_eq!(stdout, "0.5\n");
    assert_eq!(code, 0);
}

#[test]
fn test_dependents_follow_edits() {
    let (stdout, _, code) = run_command(&[
        "-c", "set A1 =B1 * 2",
        "-c", "set B1 4",
        "-c", "get A1",
        "-c", "set B1 =C1 + 1",
        "-c", "set C1 9",
        "-c", "get A1",
    ]);
    assert_eq!(stdout, "8\n20\n");
    assert_eq!(code, 0);
}

#[test]
fn test_division_by_zero_is_a_value() {
    let (stdout, _, code) = run_command(&["-c", "set A1 =1/0", "-c", "get A1"]);
    assert_eq!(stdout, "#DIV/0!\n");
    assert_eq!(code, 0);
}

#[test]
fn test_text_and_escape() {
    let (stdout, _, code) = run_command(&[
        "-c", "set A1 '=not a formula",
        "-c", "get A1",
        "-c", "text A1",
    ]);
    assert_eq!(stdout, "=not a formula\n'=not a formula\n");
    assert_eq!(code, 0);
}

#[test]
fn test_cycle_fails_but_keeps_going() {
    let (stdout, stderr, code) = run_command(&[
        "-c", "set A1 =B1",
        "-c", "set B1 =A1",
        "-c", "text B1",
    ]);
    assert_eq!(stdout, "\n");
    assert!(stderr.contains("Circular dependency"));
    assert_eq!(code, 1);
}

#[test]
fn test_malformed_formula_exit_code() {
    let (_, stderr, code) = run_command(&["-c", "set A1 =1 +"]);
    assert!(stderr.contains("Formula error"));
    assert_eq!(code, 1);
}

#[test]
fn test_unknown_command_exit_code() {
    let (_, stderr, code) = run_command(&["-c", "frobnicate"]);
    assert!(stderr.contains("Unknown command"));
    assert_eq!(code, 1);
}

#[test]
fn test_script_from_stdin_with_output_mode() {
    let script = "# totals\nset A1 1\nset B1 2\nset A2 =A1 + B1\n";
    let (stdout, _, code) = run_stdin(&["-o", "values"], script);
    assert_eq!(stdout, "1\t2\n3\t\n");
    assert_eq!(code, 0);

    let (stdout, _, code) = run_stdin(&["-o", "texts"], script);
    assert_eq!(stdout, "1\t2\n=A1 + B1\t\n");
    assert_eq!(code, 0);
}

#[test]
fn test_custom_functions_file() {
    let dir = std::env::temp_dir().join(format!("gridcalc-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("funcs.rhai");
    std::fs::write(&path, "fn double(x) { x * 2 }\n").unwrap();

    let (stdout, stderr, code) = run_command(&[
        "-f",
        path.to_str().unwrap(),
        "-c",
        "set A1 3",
        "-c",
        "set B1 =double(A1)",
        "-c",
        "get B1",
    ]);
    let _ = std::fs::remove_dir_all(&dir);
    assert_eq!(stdout, "6\n", "stderr: {}", stderr);
    assert_eq!(code, 0);
}

#[test]
fn test_bad_output_mode() {
    let (_, stderr, code) = run_command(&["-o", "pretty"]);
    assert!(stderr.contains("Unknown output mode"));
    assert_eq!(code, 1);
}
