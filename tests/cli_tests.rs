//! Integration tests for the paramdup CLI: exit codes and reported messages.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Test helper to get the CLI binary
fn paramdup_cmd() -> Command {
    let mut cmd = Command::cargo_bin("paramdup").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/csharp")
        .join(name)
}

/// Similarity-based configuration whose API key variable is never set
fn create_unset_key_config() -> String {
    r#"
naming:
  strategy: similarity-based
index:
  backend: pinecone
  host: index.example.invalid
  api_key_env: PARAMDUP_CLI_TEST_UNSET_KEY
"#
    .to_string()
}

#[test]
fn help_exits_successfully() {
    paramdup_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transform"));
}

#[test]
fn missing_arguments_exit_with_one() {
    paramdup_cmd().assert().code(1);
    paramdup_cmd().arg("transform").assert().code(1);
}

#[test]
fn unknown_strategy_exits_with_one() {
    paramdup_cmd()
        .args(["transform", "Program.cs", "--strategy", "random"])
        .assert()
        .code(1);
}

#[test]
fn missing_input_exits_with_two() {
    let dir = tempdir().unwrap();
    paramdup_cmd()
        .arg("transform")
        .arg(dir.path().join("Missing.cs"))
        .args(["--strategy", "deterministic"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn rewrites_into_output_file() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("Calculator.out.cs");

    paramdup_cmd()
        .arg("transform")
        .arg(fixture("Calculator.cs"))
        .arg(&output)
        .args(["--strategy", "deterministic"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Processed file. Methods changed: 4. Output written to: {}",
            output.display()
        )));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("public int Abs(int value, int value2)"));
}

#[test]
fn overwrites_input_without_output_argument() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("Collisions.cs");
    fs::copy(fixture("Collisions.cs"), &input).unwrap();

    paramdup_cmd()
        .arg("transform")
        .arg(&input)
        .args(["--strategy", "deterministic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Methods changed: 2"));

    assert!(fs::read_to_string(&input)
        .unwrap()
        .contains("Measure(this string text, string text_copy)"));
}

#[test]
fn nothing_eligible_is_success() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("NoSingle.cs");
    fs::copy(fixture("NoSingle.cs"), &input).unwrap();

    paramdup_cmd()
        .arg("transform")
        .arg(&input)
        .args(["--strategy", "deterministic"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No method declarations with a single parameter were found. No changes made.",
        ));
}

#[test]
fn missing_credential_exits_with_one_before_reading_input() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("paramdup.yml");
    fs::write(&config_path, create_unset_key_config()).unwrap();

    paramdup_cmd()
        .arg("transform")
        .arg(dir.path().join("Missing.cs"))
        .arg("--config")
        .arg(&config_path)
        .env_remove("PARAMDUP_CLI_TEST_UNSET_KEY")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PARAMDUP_CLI_TEST_UNSET_KEY"));
}

#[test]
fn unreadable_config_exits_with_one() {
    let dir = tempdir().unwrap();
    paramdup_cmd()
        .arg("transform")
        .arg(fixture("Calculator.cs"))
        .arg("--config")
        .arg(dir.path().join("absent.yml"))
        .assert()
        .code(1);
}

#[test]
fn print_default_config_emits_yaml() {
    paramdup_cmd()
        .arg("print-default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("strategy: similarity-based"))
        .stdout(predicate::str::contains("namespace: code-contexts"));
}

#[test]
fn harvest_writes_batch_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("src");
    fs::create_dir_all(&root).unwrap();
    fs::copy(fixture("Calculator.cs"), root.join("Calculator.cs")).unwrap();
    let out = dir.path().join("contexts");

    paramdup_cmd()
        .arg("harvest")
        .arg(&root)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("parameter contexts to 1 batch file(s)"));

    let batch = fs::read_to_string(out.join("contexts_0.json")).unwrap();
    assert!(batch.contains("\"paramName\": \"value\""));
    assert!(batch.contains("Absolute value of an integer."));
}
