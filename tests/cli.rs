// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn freezerun(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("freezerun").unwrap();
    cmd.arg("-C").arg(dir.path()).env("NO_COLOR", "1");
    cmd
}

#[test]
fn plan_lists_stages_in_order() {
    let dir = TempDir::new().unwrap();

    let output = freezerun(&dir).arg("plan").assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();

    let upgrade = stdout.find(". upgrade-pip").unwrap();
    let rewrite = stdout.find(". rewrite-imports").unwrap();
    let freeze = stdout.find(". freeze ").unwrap();
    assert!(upgrade < rewrite && rewrite < freeze);
    assert!(stdout.contains("-m PyInstaller --onefile"));
}

#[test]
fn plan_json_is_machine_readable() {
    let dir = TempDir::new().unwrap();

    let output = freezerun(&dir)
        .args(["plan", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    let stages = json["stages"].as_array().unwrap();
    assert_eq!(stages.first().unwrap()["name"], "configure-environment");
    assert_eq!(stages.last().unwrap()["name"], "freeze");
}

#[test]
fn build_dry_run_prints_plan_only() {
    let dir = TempDir::new().unwrap();

    freezerun(&dir)
        .args(["build", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution plan"));
}

#[test]
fn rewrite_updates_files_in_place() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg/app.py"), "from .core import run\nimport os\n").unwrap();

    freezerun(&dir)
        .args(["rewrite", "pkg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rewrote 1 line in 1 of 1 files"));

    assert_eq!(
        fs::read_to_string(dir.path().join("pkg/app.py")).unwrap(),
        "from core import run\nimport os\n"
    );
}

#[test]
fn rewrite_missing_directory_fails() {
    let dir = TempDir::new().unwrap();

    freezerun(&dir).args(["rewrite", "nope"]).assert().failure();
}

#[test]
fn init_writes_config_once() {
    let dir = TempDir::new().unwrap();

    freezerun(&dir).arg("init").assert().success();
    let written = fs::read_to_string(dir.path().join(".freezerun.yaml")).unwrap();
    assert!(written.contains("whisper-ctranslate2"));

    freezerun(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    freezerun(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn validate_without_config_suggests_init() {
    let dir = TempDir::new().unwrap();

    freezerun(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("freezerun init"));
}

#[test]
fn validate_rejects_overlapping_paths() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".freezerun.yaml"),
        "paths:\n  staging_root: work\n  scratch_dir: work/clone\n",
    )
    .unwrap();

    freezerun(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("overlap"));
}

#[test]
fn explicit_missing_config_is_error() {
    let dir = TempDir::new().unwrap();

    freezerun(&dir)
        .args(["--config", "other.yaml", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("other.yaml"));
}

#[test]
fn release_requires_credentials_before_building() {
    let dir = TempDir::new().unwrap();

    freezerun(&dir)
        .arg("release")
        .env_remove("USERNAME")
        .env_remove("TOKEN")
        .env_remove("BUILD_VERSION")
        .assert()
        .failure()
        .stderr(predicate::str::contains("USERNAME"));

    assert!(!dir.path().join(".freezerun.yaml").exists());
}
