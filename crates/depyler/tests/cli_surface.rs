//! End-to-end checks of the §6 command-line surface that don't require a
//! live decompiler or oracle endpoint: argument validation and help text.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_required_arguments_exit_with_code_two() {
    let mut cmd = Command::cargo_bin("depyler").unwrap();
    cmd.arg("--target").arg("/bin/ls");
    cmd.assert().failure().code(2);
}

#[test]
fn help_documents_the_required_flags() {
    let mut cmd = Command::cargo_bin("depyler").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--ghidra-path"))
        .stdout(predicate::str::contains("--goal"));
}

#[test]
fn unreachable_oracle_endpoint_exits_with_code_four() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("binary");
    std::fs::write(&target, b"not a real binary").unwrap();

    let mut cmd = Command::cargo_bin("depyler").unwrap();
    cmd.arg("--target")
        .arg(&target)
        .arg("--ghidra-path")
        .arg(dir.path().join("ghidra"))
        .arg("--goal")
        .arg("find the login flow")
        .arg("--output")
        .arg(dir.path().join("out"))
        .env("REFACTORY_ORACLE_ENDPOINT_URL", "http://127.0.0.1:1/unreachable");
    cmd.assert().failure().code(4);
}
