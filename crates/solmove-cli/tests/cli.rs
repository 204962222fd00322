use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const COUNTER: &str = r#"
pragma solidity ^0.8.0;

contract Counter {
    uint256 count;

    function increment() public {
        count += 1;
    }

    function getCount() public view returns (uint256) {
        return count;
    }
}
"#;

fn solmove() -> Command {
    Command::cargo_bin("solmove").unwrap()
}

#[test]
fn test_transpile_prints_module_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.sol");
    fs::write(&input, COUNTER).unwrap();

    solmove()
        .arg("transpile")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("module solmove::counter {"))
        .stdout(predicate::str::contains("public entry fun increment("));
}

#[test]
fn test_transpile_writes_module_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.sol");
    fs::write(&input, COUNTER).unwrap();
    let out = dir.path().join("out");

    solmove()
        .args(["transpile", "--address", "counter_addr", "-o"])
        .arg(&out)
        .arg(&input)
        .assert()
        .success();

    let written = fs::read_to_string(out.join("counter.move")).unwrap();
    assert!(written.contains("module counter_addr::counter {"));
}

#[test]
fn test_json_result_lists_modules_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Mixed.sol");
    fs::write(
        &input,
        r#"
contract Good {
    uint256 x;
    function set(uint256 v) public { x = v; }
}

contract Bad {
    function oops() public {
        uint256 y = ;
    }
}
"#,
    )
    .unwrap();

    let output = solmove()
        .args(["transpile", "--json"])
        .arg(&input)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["modules"][0]["contract"], "Good");
    assert_eq!(result["errors"][0]["contract"], "Bad");
    assert_eq!(result["errors"][0]["kind"], "parse");
}

#[test]
fn test_config_file_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.sol");
    fs::write(&input, COUNTER).unwrap();
    let config = dir.path().join("solmove.json");
    fs::write(&config, r#"{ "module_address": "from_file" }"#).unwrap();

    solmove()
        .args(["transpile", "--config"])
        .arg(&config)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("module from_file::counter {"));
}

#[test]
fn test_inspect_lists_variables() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.sol");
    fs::write(&input, COUNTER).unwrap();

    solmove()
        .arg("inspect")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Counter -> counter"))
        .stdout(predicate::str::contains("count"));
}

#[test]
fn test_missing_verifier_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.sol");
    fs::write(&input, COUNTER).unwrap();

    solmove()
        .args([
            "transpile",
            "--verify",
            "--aptos-bin",
            "solmove-no-such-aptos-binary",
        ])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("SKIPPED:"));
}

#[test]
fn test_missing_input_fails() {
    solmove()
        .args(["transpile", "/definitely/not/here.sol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
