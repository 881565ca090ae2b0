#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const QUESTION: &str = "How many vacation days do employees get?";

fn write_fixture_workspace() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("ragbench.yaml"),
        r#"version: 1
database: bench.db
knowledge_bases:
  handbook:
    model: fake-model
    max_results: 3
retrieval:
  fixtures: retrieval.yaml
generation:
  provider: fake
  fake_response: 25 vacation days
judge:
  enabled: true
  provider: fake
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("retrieval.yaml"),
        format!(
            r#"queries:
  "{}":
    - {{ id: c1, title: Leave policy, content: "Employees receive 25 vacation days per year.", score: 0.92 }}
"#,
            QUESTION
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("questions.yaml"),
        format!(
            r#"name: hr-handbook
questions:
  - question: "{}"
    expected_answer: 25 vacation days
    expected_context_ids: [c1]
"#,
            QUESTION
        ),
    )
    .unwrap();
    dir
}

fn ragbench(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ragbench").unwrap();
    cmd.current_dir(dir)
        .env("RUST_LOG", "warn")
        .env_remove("RAGBENCH_DB")
        .env_remove("RAGBENCH_CONFIG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout must be JSON")
}

fn import_and_create(dir: &Path) -> String {
    let imported = json_stdout(ragbench(dir).args([
        "dataset",
        "import",
        "--file",
        "questions.yaml",
        "--kb",
        "handbook",
    ]));
    assert_eq!(imported["questions"], 1);
    assert_eq!(imported["dataset"]["name"], "hr-handbook");
    let dataset_id = imported["dataset"]["id"].as_str().unwrap().to_string();

    let run = json_stdout(ragbench(dir).args([
        "run",
        "create",
        "--kb",
        "handbook",
        "--dataset",
        &dataset_id,
    ]));
    assert_eq!(run["status"], "pending");
    assert_eq!(run["rag_config_snapshot"]["model"], "fake-model");
    run["id"].as_str().unwrap().to_string()
}

#[test]
fn init_writes_sample_config_and_database() {
    let dir = tempdir().unwrap();
    let v = json_stdout(ragbench(dir.path()).arg("init"));
    assert_eq!(v["config_created"], true);
    assert!(dir.path().join("ragbench.yaml").exists());
    assert!(dir.path().join(".ragbench/bench.db").exists());

    // second init keeps the existing file
    let v = json_stdout(ragbench(dir.path()).arg("init"));
    assert_eq!(v["config_created"], false);
}

#[test]
fn full_run_lifecycle_over_fixtures() {
    let dir = write_fixture_workspace();
    let run_id = import_and_create(dir.path());

    let summary = json_stdout(ragbench(dir.path()).args(["run", "start", &run_id, "--quiet"]));
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["aggregate_metrics"]["success_rate"], 1.0);
    assert_eq!(summary["aggregate_metrics"]["retrieval"]["mrr"], 1.0);
    assert_eq!(summary["aggregate_metrics"]["generation"]["overall_score"], 1.0);

    let results = json_stdout(ragbench(dir.path()).args(["run", "results", &run_id]));
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["generated_answer"], "25 vacation days");
    assert_eq!(results[0]["metrics"]["retrieval"]["ndcg"], 1.0);

    let run = json_stdout(ragbench(dir.path()).args(["run", "get", &run_id]));
    assert_eq!(run["progress"], 100);

    // starting a completed run is a precondition error and changes nothing
    ragbench(dir.path())
        .args(["run", "start", &run_id])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("already completed"));
    let again = json_stdout(ragbench(dir.path()).args(["run", "get", &run_id]));
    assert_eq!(again, run);

    let listed = json_stdout(ragbench(dir.path()).args([
        "run", "list", "--kb", "handbook", "--status", "completed",
    ]));
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn compare_requires_completed_runs() {
    let dir = write_fixture_workspace();
    let run_a = import_and_create(dir.path());
    let run_b = import_and_create(dir.path());
    ragbench(dir.path())
        .args(["run", "start", &run_a, "--quiet"])
        .assert()
        .success();

    ragbench(dir.path())
        .args(["compare", &run_a, &run_b])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("must be completed"));

    ragbench(dir.path())
        .args(["run", "start", &run_b, "--quiet"])
        .assert()
        .success();
    let cmp = json_stdout(ragbench(dir.path()).args(["compare", &run_a, &run_b]));
    assert_eq!(cmp["run_a"]["id"], run_a.as_str());
    assert_eq!(cmp["metrics"].as_array().unwrap().len(), 10);
    assert!(cmp["winner"].is_string());
}

#[test]
fn cancel_and_delete() {
    let dir = write_fixture_workspace();
    let run_id = import_and_create(dir.path());

    let cancelled = json_stdout(ragbench(dir.path()).args(["run", "cancel", &run_id]));
    assert_eq!(cancelled["status"], "cancelled");
    ragbench(dir.path())
        .args(["run", "start", &run_id])
        .assert()
        .code(3);

    ragbench(dir.path())
        .args(["run", "delete", &run_id])
        .assert()
        .success();
    ragbench(dir.path())
        .args(["run", "get", &run_id])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("run not found"));
}

#[test]
fn config_errors_exit_with_two() {
    let dir = tempdir().unwrap();
    ragbench(dir.path())
        .args(["--config", "missing.yaml", "run", "list", "--kb", "kb"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read config"));

    fs::write(dir.path().join("ragbench.yaml"), "version: 9\n").unwrap();
    ragbench(dir.path())
        .args(["run", "list", "--kb", "kb"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported config version"));
}
