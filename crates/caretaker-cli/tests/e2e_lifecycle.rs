//! E2E CLI lifecycle workflow tests.
//!
//! Each test runs `ct` as a subprocess in an isolated temp directory with a
//! fixed signing secret, logs in the actors it needs, and drives tasks through
//! the lifecycle with `--json` output.

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const SECRET: &str = "e2e-test-secret-0123456789abcdef";

/// Build a Command targeting the `ct` binary, rooted in `dir`.
fn ct_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ct"));
    cmd.current_dir(dir);
    cmd.env("CARETAKER_SECRET", SECRET);
    // Suppress tracing output that goes to stderr
    cmd.env("CARETAKER_LOG", "error");
    // Keep user config and FORMAT out of the picture
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("CARETAKER_TOKEN");
    cmd
}

fn init_project(dir: &Path) {
    ct_cmd(dir).args(["init"]).assert().success();
}

/// Issue a token for `user` with `role`.
fn login(dir: &Path, user: &str, role: &str) -> String {
    let output = ct_cmd(dir)
        .args(["login", "--user", user, "--role", role, "--format", "text"])
        .output()
        .expect("login should not crash");
    assert!(
        output.status.success(),
        "login failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Run `ct` with `token` and `--json`, expecting success.
fn ct_json(dir: &Path, token: &str, args: &[&str]) -> Value {
    let output = ct_cmd(dir)
        .args(args)
        .args(["--token", token, "--json"])
        .output()
        .expect("command should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

/// Run `ct` with `token` and `--json`, expecting failure; returns the error
/// object printed to stderr.
fn ct_json_err(dir: &Path, token: &str, args: &[&str]) -> Value {
    let output = ct_cmd(dir)
        .args(args)
        .args(["--token", token, "--json"])
        .output()
        .expect("command should not crash");
    assert!(
        !output.status.success(),
        "{args:?} unexpectedly succeeded: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    let json: Value =
        serde_json::from_slice(&output.stderr).expect("errors should be JSON in --json mode");
    json["error"].clone()
}

fn store_photo(dir: &Path, token: &str, name: &str, bytes: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write photo fixture");
    let json = ct_json(dir, token, &["photo", "add", path.to_str().expect("utf-8 path")]);
    json["reference"]
        .as_str()
        .expect("photo output should have 'reference'")
        .to_string()
}

struct Actors {
    manager: String,
    staff: String,
}

fn setup() -> (TempDir, Actors) {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    let actors = Actors {
        manager: login(dir.path(), "pm-1", "property_manager"),
        staff: login(dir.path(), "staff-1", "staff"),
    };
    (dir, actors)
}

fn create_task(dir: &Path, token: &str, title: &str) -> Value {
    ct_json(
        dir,
        token,
        &[
            "create",
            "--title",
            title,
            "--assignee",
            "staff-1",
            "--category",
            "plumbing",
            "--priority",
            "high",
        ],
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_with_photo_evidence() {
    let (dir, actors) = setup();
    let dir = dir.path();

    let task = create_task(dir, &actors.manager, "Fix leaking tap");
    assert_eq!(task["task_number"], "TSK-00001");
    assert_eq!(task["status"], "assigned");
    assert_eq!(task["assigner_id"], "pm-1");
    assert_eq!(task["assignee_id"], "staff-1");

    let accepted = ct_json(dir, &actors.staff, &["status", "TSK-00001", "accepted"]);
    assert_eq!(accepted["status"], "accepted");

    let err = ct_json_err(dir, &actors.staff, &["status", "TSK-00001", "in_progress"]);
    assert_eq!(err["error_code"], "E2002");
    assert_eq!(err["kind"], "invalid_transition");

    let before = store_photo(dir, &actors.staff, "before.jpg", b"tap dripping");
    assert!(before.starts_with("obj:"), "unexpected reference {before}");
    assert!(Path::new(&before).extension().is_some_and(|ext| ext == "jpg"));

    let started = ct_json(
        dir,
        &actors.staff,
        &["status", "TSK-00001", "in_progress", "--before", &before],
    );
    assert_eq!(started["status"], "in_progress");
    assert_eq!(started["before_pictures"][0], before.as_str());

    let halfway = ct_json(dir, &actors.staff, &["progress", "TSK-00001", "50%"]);
    assert_eq!(halfway["status"], "in_progress");
    assert_eq!(halfway["progress"], 50);

    let err = ct_json_err(dir, &actors.staff, &["progress", "TSK-00001", "100"]);
    assert_eq!(err["error_code"], "E2002");

    let after = store_photo(dir, &actors.staff, "after.jpg", b"tap fixed");
    let done = ct_json(
        dir,
        &actors.staff,
        &["progress", "TSK-00001", "100", "--after", &after],
    );
    assert_eq!(done["status"], "completed");
    assert_eq!(done["progress"], 100);

    let err = ct_json_err(dir, &actors.staff, &["status", "TSK-00001", "on_hold"]);
    assert_eq!(err["error_code"], "E2002");

    let detail = ct_json(dir, &actors.manager, &["show", "1"]);
    assert_eq!(detail["task"]["status"], "completed");
    let updates = detail["updates"].as_array().expect("updates array");
    // created, accepted, started, 50%, completed
    assert_eq!(updates.len(), 5, "updates: {updates:?}");
}

#[test]
fn wrong_side_is_forbidden() {
    let (dir, actors) = setup();
    let dir = dir.path();
    create_task(dir, &actors.manager, "Replace bulb");

    let err = ct_json_err(dir, &actors.manager, &["status", "TSK-00001", "accepted"]);
    assert_eq!(err["error_code"], "E4003");
    assert_eq!(err["kind"], "forbidden");

    let outsider = login(dir, "staff-2", "staff");
    let err = ct_json_err(dir, &outsider, &["show", "TSK-00001"]);
    assert_eq!(err["error_code"], "E4003");
}

#[test]
fn invalid_token_is_unauthorized() {
    let (dir, _actors) = setup();
    let err = ct_json_err(dir.path(), "ct1.pm-1.property_manager.1.forged", &["list"]);
    assert_eq!(err["error_code"], "E4001");
    assert_eq!(err["kind"], "unauthorized");
}

#[test]
fn missing_token_is_unauthorized() {
    let (dir, _actors) = setup();
    let output = ct_cmd(dir.path())
        .args(["list", "--json"])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stderr).expect("JSON error");
    assert_eq!(json["error"]["error_code"], "E4001");
}

#[test]
fn errors_are_reported_exactly_once() {
    let (dir, _actors) = setup();

    let output = ct_cmd(dir.path())
        .env_remove("RUST_BACKTRACE")
        .args(["show", "1", "--json"])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Error:"), "stderr: {stderr}");
    let mut documents = serde_json::Deserializer::from_slice(&output.stderr).into_iter::<Value>();
    let first = documents
        .next()
        .expect("one JSON document")
        .expect("valid JSON");
    assert_eq!(first["error"]["error_code"], "E4001");
    assert!(documents.next().is_none(), "stderr: {stderr}");

    let output = ct_cmd(dir.path())
        .args(["show", "1", "--format", "text"])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("unauthorized").count(), 1, "stderr: {stderr}");
    assert!(!stderr.contains("Error:"), "stderr: {stderr}");
}

#[test]
fn uninitialized_directory_reports_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    let output = ct_cmd(dir.path())
        .args(["list", "--json"])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stderr).expect("JSON error");
    assert_eq!(json["error"]["error_code"], "E1001");
}

#[test]
fn unknown_task_is_not_found() {
    let (dir, actors) = setup();
    let err = ct_json_err(dir.path(), &actors.manager, &["show", "TSK-00042"]);
    assert_eq!(err["error_code"], "E2001");
}

#[test]
fn dashboards_for_both_sides() {
    let (dir, actors) = setup();
    let dir = dir.path();
    create_task(dir, &actors.manager, "Fix leaking tap");
    create_task(dir, &actors.manager, "Paint hallway");
    ct_json(
        dir,
        &actors.manager,
        &["create", "--title", "Later", "--assignee", "staff-1", "--draft"],
    );
    ct_json(dir, &actors.staff, &["status", "2", "accepted"]);

    let mine = ct_json(dir, &actors.staff, &["list"]);
    assert_eq!(mine["kind"], "assignee");
    assert_eq!(mine["owner_id"], "staff-1");
    assert_eq!(mine["counts"]["total"], 2);
    assert_eq!(mine["counts"]["drafts"], 0);
    assert_eq!(mine["counts"]["new_tasks"], 1);
    assert_eq!(mine["counts"]["active_tasks"], 1);

    let assigned = ct_json(dir, &actors.manager, &["list"]);
    assert_eq!(assigned["kind"], "assigner");
    assert_eq!(assigned["owner_id"], "pm-1");
    assert_eq!(assigned["counts"]["total"], 3);
    assert_eq!(assigned["counts"]["drafts"], 1);

    let tasks = assigned["tasks"].as_array().expect("tasks array");
    assert_eq!(tasks.len(), 3);
}

#[test]
fn comments_checklist_and_notes() {
    let (dir, actors) = setup();
    let dir = dir.path();
    ct_json(
        dir,
        &actors.manager,
        &[
            "create", "--title", "Inspect roof", "--assignee", "staff-1", "--item", "Gutters",
            "--item", "Flashing",
        ],
    );

    let comment = ct_json(dir, &actors.staff, &["comment", "1", "On site tomorrow"]);
    assert_eq!(comment["author_id"], "staff-1");
    assert_eq!(comment["author_type"], "assignee");

    let checklist = ct_json(
        dir,
        &actors.staff,
        &["checklist", "1", "--check", "1", "--add", "Downpipes"],
    );
    assert_eq!(checklist["changed"], true);
    let items = checklist["items"].as_array().expect("items array");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["completed"], true);
    assert_eq!(items[2]["item"], "Downpipes");

    let err = ct_json_err(dir, &actors.staff, &["checklist", "1", "--check", "9"]);
    assert_eq!(err["error_code"], "E2005");

    let noted = ct_json(dir, &actors.manager, &["notes", "1", "Ladder in the shed"]);
    assert_eq!(noted["notes"], "Ladder in the shed");

    let detail = ct_json(dir, &actors.manager, &["show", "TSK-00001"]);
    assert_eq!(detail["comments"].as_array().map(Vec::len), Some(1));
    assert_eq!(detail["comments"][0]["body"], "On site tomorrow");
}

#[test]
fn delete_requires_admin() {
    let (dir, actors) = setup();
    let dir = dir.path();
    create_task(dir, &actors.manager, "Fix leaking tap");

    let err = ct_json_err(dir, &actors.staff, &["delete", "1"]);
    assert_eq!(err["error_code"], "E4003");

    let admin = login(dir, "admin-1", "senior_admin");
    let deleted = ct_json(dir, &admin, &["delete", "TSK-00001"]);
    assert_eq!(deleted["ok"], true);
    assert_eq!(deleted["task_number"], "TSK-00001");

    let err = ct_json_err(dir, &admin, &["show", "1"]);
    assert_eq!(err["error_code"], "E2001");
}

#[test]
fn text_output_is_one_line_per_task() {
    let (dir, actors) = setup();
    let dir = dir.path();
    create_task(dir, &actors.manager, "Fix leaking tap");

    ct_cmd(dir)
        .args(["show", "1", "--format", "text", "--token", &actors.staff])
        .assert()
        .success()
        .stdout(predicates::str::contains("TSK-00001"))
        .stdout(predicates::str::contains("Fix leaking tap"));
}
