//! End-to-end tests of the `wc-distributed` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn wc() -> Command {
    Command::cargo_bin("wc-distributed").unwrap()
}

#[test]
fn generate_and_report() {
    let dir = TempDir::new().unwrap();
    let dataset = dir.path().join("logs.txt");
    let output = dir.path().join("out.json");

    wc().arg("--dataset")
        .arg(&dataset)
        .arg("--output")
        .arg(&output)
        .args(["--generate", "--lines", "300", "--chunk-size", "50", "--top", "3"])
        .args(["--log-level", "off"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Top tokens"))
        .stdout(predicate::str::contains("event           300"))
        .stdout(predicate::str::contains("Distributed analysis time:"))
        .stdout(predicate::str::contains("Wrote"));

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(report["lines"], 300);
    assert_eq!(report["tasks"], 6);
    assert_eq!(report["top"].as_array().unwrap().len(), 3);
}

#[test]
fn zero_chunk_size_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.json");

    wc().current_dir(dir.path())
        .arg("--output")
        .arg(&output)
        .args(["--generate", "--chunk-size", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("chunk size must be positive"));

    assert!(!output.exists());
    assert!(!dir.path().join("telemetry_logs.txt").exists());
}

#[test]
fn missing_dataset_fails() {
    let dir = TempDir::new().unwrap();

    wc().current_dir(dir.path())
        .args(["--log-level", "off"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));

    assert!(!dir.path().join("final_wordcount.json").exists());
}

#[test]
fn version_flag() {
    wc().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
