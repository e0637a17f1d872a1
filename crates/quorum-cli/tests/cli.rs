//! End-to-end CLI contract tests, grounded on the teacher's
//! `assay-cli/tests/contract_*.rs` style: `assert_cmd::Command` driving the real
//! binary against a scratch working directory, asserting on exit status and the
//! JSON printed to stdout.

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn quorum(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("quorum").unwrap();
    cmd.env("DATABASE_PATH", db_path);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout must be valid JSON")
}

#[test]
fn ingest_then_status_reports_zero_jobs_before_a_run() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("quorum.db");

    let submissions = dir.path().join("submissions.json");
    fs::write(
        &submissions,
        serde_json::json!([
            {
                "id": "s1",
                "queue_id": "q1",
                "labeling_task_id": "t1",
                "created_at": 0,
                "questions": [{"id": "qa", "questionText": "Is this correct?"}],
                "answers": {"qa": "42"}
            }
        ])
        .to_string(),
    )
    .unwrap();

    let output = quorum(&db).args(["ingest"]).arg(&submissions).output().unwrap();
    assert!(output.status.success(), "ingest failed: {output:?}");
    let body = stdout_json(&output);
    assert_eq!(body["uploaded"], 1);

    let output = quorum(&db).args(["status", "q1"]).output().unwrap();
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["total"], 0);
}

#[test]
fn judges_upsert_then_list_round_trips() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("quorum.db");

    let output = quorum(&db)
        .args([
            "judges",
            "upsert",
            "j1",
            "--name",
            "Accuracy",
            "--system-prompt",
            "Be strict.",
            "--model",
            "llama-3.1-70b",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "judges upsert failed: {output:?}");

    let output = quorum(&db).args(["judges", "list"]).output().unwrap();
    assert!(output.status.success());
    let body = stdout_json(&output);
    let judges = body.as_array().unwrap();
    assert_eq!(judges.len(), 1);
    assert_eq!(judges[0]["id"], "j1");
    assert_eq!(judges[0]["model"], "llama-3.1-70b");
}

#[test]
fn run_materializes_jobs_for_assigned_questions() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("quorum.db");

    let submissions = dir.path().join("submissions.json");
    fs::write(
        &submissions,
        serde_json::json!([
            {
                "id": "s1",
                "queue_id": "q1",
                "labeling_task_id": "t1",
                "created_at": 0,
                "questions": [{"id": "qa", "questionText": "Is this correct?"}],
                "answers": {"qa": "42"}
            }
        ])
        .to_string(),
    )
    .unwrap();
    quorum(&db).args(["ingest"]).arg(&submissions).assert().success();

    quorum(&db)
        .args([
            "judges",
            "upsert",
            "j1",
            "--name",
            "Accuracy",
            "--system-prompt",
            "Be strict.",
            "--model",
            "llama-3.1-70b",
        ])
        .assert()
        .success();

    let assignments = dir.path().join("assignments.json");
    fs::write(
        &assignments,
        serde_json::json!([{"question_id": "qa", "judge_id": "j1"}]).to_string(),
    )
    .unwrap();
    quorum(&db)
        .args(["assignments", "save", "q1"])
        .arg(&assignments)
        .assert()
        .success();

    let output = quorum(&db).args(["run", "q1"]).output().unwrap();
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["enqueued"], 1);
    assert_eq!(body["submissions_count"], 1);
    assert_eq!(body["assignments_count"], 1);

    let output = quorum(&db).args(["status", "q1"]).output().unwrap();
    let body = stdout_json(&output);
    assert_eq!(body["counts"]["pending"], 1);
    assert_eq!(body["total"], 1);
}

#[test]
fn evaluations_list_is_empty_before_any_worker_dispatch() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("quorum.db");

    let output = quorum(&db)
        .args(["evaluations", "--queue-id", "q1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["total"], 0);
    assert!(body["evaluations"].as_array().unwrap().is_empty());
}

#[test]
fn ingest_rejects_an_empty_batch() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("quorum.db");

    let submissions = dir.path().join("submissions.json");
    fs::write(&submissions, "[]").unwrap();

    quorum(&db)
        .args(["ingest"])
        .arg(&submissions)
        .assert()
        .failure()
        .stderr(contains("non-empty array"));
}

#[test]
fn judges_get_on_an_unknown_id_fails_with_a_clear_message() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("quorum.db");

    quorum(&db)
        .args(["judges", "get", "no-such-judge"])
        .assert()
        .failure()
        .stderr(contains("not found"));
}
