use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, diff};

fn ciasm() -> Command {
    Command::cargo_bin("ciasm").unwrap()
}

#[test]
fn runs_without_arguments() {
    ciasm().assert().success().stdout(contains("ciasm"));
}

#[test]
fn runs_hello() {
    ciasm()
        .arg("run")
        .arg("tests/files/hello.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff("Hi"))
        .stderr(contains("Program Halted: reached END"))
        .stderr(contains("5 instructions executed"))
        .stderr(contains("ACC : 105"));
}

#[test]
fn runs_path_without_subcommand() {
    ciasm()
        .arg("tests/files/hello.asm")
        .assert()
        .success()
        .stdout(contains("Hi"))
        .stdout(contains("Completed"));
}

#[test]
fn counts_down() {
    ciasm()
        .arg("run")
        .arg("tests/files/countdown.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff("***"))
        .stderr(contains("25 instructions executed"))
        .stderr(contains("Program Counter: 11"))
        .stderr(contains("ACC : 0"))
        .stderr(contains("EQ : true"));
}

#[test]
fn grows_memory_for_indexed_store() {
    ciasm()
        .arg("run")
        .arg("tests/files/indexed.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stderr(contains("ACC : 20"))
        .stderr(contains("IX : 1"));
}

#[test]
fn shows_binary_registers() {
    ciasm()
        .arg("run")
        .arg("tests/files/hello.asm")
        .arg("--minimal")
        .arg("--binary")
        .assert()
        .success()
        .stderr(contains("ACC : 0000000001101001"))
        .stderr(contains("EQ : 0"));
}

#[test]
fn reads_scripted_input() {
    ciasm()
        .arg("run")
        .arg("tests/files/echo.asm")
        .arg("--minimal")
        .arg("--input")
        .arg("ok")
        .assert()
        .success()
        .stdout(diff("ok"));
}

#[test]
fn fails_when_input_runs_out() {
    ciasm()
        .arg("run")
        .arg("tests/files/echo.asm")
        .arg("--minimal")
        .arg("--input")
        .arg("o")
        .assert()
        .failure()
        .stdout(diff("o"))
        .stderr(contains("no input left to read"));
}

#[test]
fn stops_at_step_limit() {
    ciasm()
        .arg("run")
        .arg("tests/files/forever.asm")
        .arg("--minimal")
        .arg("--limit")
        .arg("10")
        .assert()
        .success()
        .stderr(contains("step limit reached"))
        .stderr(contains("10 instructions executed"));
}

#[test]
fn step_limit_from_environment() {
    ciasm()
        .env("CIASM_LIMIT", "4")
        .arg("run")
        .arg("tests/files/forever.asm")
        .arg("--minimal")
        .assert()
        .success()
        .stderr(contains("4 instructions executed"));
}

#[test]
fn undefined_label_stops_before_running() {
    ciasm()
        .arg("run")
        .arg("tests/files/undefined.asm")
        .arg("--minimal")
        .assert()
        .failure()
        .stderr(contains("NOWHERE"))
        .stderr(contains("instructions executed").not());
}

#[test]
fn reports_bad_operand() {
    ciasm()
        .arg("run")
        .arg("tests/files/bad_operand.asm")
        .arg("--minimal")
        .assert()
        .failure()
        .stderr(contains("parse::operand"));
}

#[test]
fn reports_data_executed_as_code() {
    ciasm()
        .arg("run")
        .arg("tests/files/data_as_code.asm")
        .arg("--minimal")
        .assert()
        .failure()
        .stderr(contains("address 1"));
}

#[test]
fn checks_without_running() {
    ciasm()
        .arg("check")
        .arg("tests/files/hello.asm")
        .assert()
        .success()
        .stdout(contains("no errors found!"))
        .stdout(contains("Hi").not());

    ciasm()
        .arg("check")
        .arg("tests/files/undefined.asm")
        .assert()
        .failure()
        .stderr(contains("NOWHERE"));
}

#[test]
fn missing_file_fails() {
    ciasm()
        .arg("run")
        .arg("tests/files/does_not_exist.asm")
        .assert()
        .failure();
}
