use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

const FIRST: &str = "2031-03-03T09:00:00Z";

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new(exact_alarms_allowed: bool) -> Self {
        let root = std::env::temp_dir().join(format!("remindme-cli-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&root).expect("workspace should be creatable");
        let ws = Self { root };
        ws.write_config(exact_alarms_allowed);
        ws
    }

    fn db_path(&self) -> PathBuf {
        self.root.join("store/state.sqlite")
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    fn spool_dir(&self) -> PathBuf {
        self.root.join("spool")
    }

    fn write_config(&self, exact_alarms_allowed: bool) {
        let body = format!(
            "exact_alarms_allowed = {}\nspool_dir = \"{}\"\n",
            exact_alarms_allowed,
            self.spool_dir().display()
        );
        std::fs::write(self.config_path(), body).expect("config should be writable");
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_remindme"))
            .arg("--db")
            .arg(self.db_path())
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .expect("remindme command should run")
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = self.run(args);
        assert_success(&output);
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
    }

    fn spool_files(&self) -> Vec<String> {
        let Ok(dir) = std::fs::read_dir(self.spool_dir()) else {
            return Vec::new();
        };
        let mut names = dir
            .map(|entry| {
                entry
                    .expect("spool entry should be readable")
                    .file_name()
                    .to_string_lossy()
                    .to_string()
            })
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success but failed.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected failure but command succeeded.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn handles(listing: &Value) -> Vec<i64> {
    listing
        .as_array()
        .expect("listing should be an array")
        .iter()
        .map(|alarm| alarm["handle"].as_i64().expect("handle should be an integer"))
        .collect()
}

#[test]
fn add_list_and_cancel_round_trip() {
    let ws = Workspace::new(true);

    let added = ws.run_json(&[
        "add", "Meeting", "-m", "Standup", "--at", FIRST, "-w", "2", "--json",
    ]);
    assert_eq!(added["alarms"].as_array().map(Vec::len), Some(2));
    assert_eq!(added["alarms"][0]["registration"], "registered");
    assert_eq!(ws.spool_files(), vec!["1.json", "2.json"]);

    let listed = ws.run_json(&["ls", "--json"]);
    assert_eq!(handles(&listed), vec![1, 2]);
    assert_eq!(listed[0]["title"], "Meeting");
    assert_eq!(listed[0]["message"], "Standup");

    let output = ws.run(&["cancel", "2"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Canceled 1 alarms"));
    assert_eq!(handles(&ws.run_json(&["ls", "--json"])), vec![1]);
    assert_eq!(ws.spool_files(), vec!["1.json"]);
}

#[test]
fn cancelling_one_duplicate_cancels_both_unless_exact() {
    let ws = Workspace::new(true);
    for _ in 0..3 {
        assert_success(&ws.run(&["add", "Standup", "--at", FIRST]));
    }

    let exact = ws.run_json(&["cancel", "1", "--exact", "--json"]);
    assert_eq!(exact["cancelled"].as_array().map(Vec::len), Some(1));
    assert_eq!(handles(&ws.run_json(&["ls", "--json"])), vec![2, 3]);

    let by_content = ws.run_json(&["cancel", "2", "--json"]);
    assert_eq!(by_content["cancelled"].as_array().map(Vec::len), Some(2));
    assert!(handles(&ws.run_json(&["ls", "--json"])).is_empty());
    assert!(ws.spool_files().is_empty());
}

#[test]
fn class_titles_schedule_medication_reminders() {
    let ws = Workspace::new(true);
    let added = ws.run_json(&["add", "History class", "--at", FIRST, "--json"]);
    let alarms = added["alarms"].as_array().expect("alarms should be listed");
    assert_eq!(alarms.len(), 2);
    assert_eq!(alarms[1]["kind"], "medication");
    assert_eq!(alarms[1]["title"], "Medication time");
    assert_eq!(alarms[1]["message"], "For: History class");
    let fire_time = |alarm: &Value| alarm["fire_time"].as_i64().expect("fire time");
    assert_eq!(fire_time(&alarms[0]) - fire_time(&alarms[1]), 4 * 3_600_000);

    let skipped = ws.run_json(&[
        "add",
        "History class",
        "--at",
        FIRST,
        "--no-medication",
        "--json",
    ]);
    assert_eq!(skipped["alarms"].as_array().map(Vec::len), Some(1));
}

#[test]
fn denied_alarms_are_saved_and_registered_after_permission_returns() {
    let ws = Workspace::new(false);

    let output = ws.run(&["add", "Meeting", "--at", FIRST]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("exact alarms are not permitted"));
    assert!(ws.spool_files().is_empty());
    let listed = ws.run_json(&["ls", "--json"]);
    assert_eq!(listed[0]["registration"], "denied");

    ws.write_config(true);
    let summary = ws.run_json(&["reconcile", "--json"]);
    assert_eq!(summary["registered"], 1);
    assert_eq!(ws.spool_files(), vec!["1.json"]);
    let listed = ws.run_json(&["ls", "--json"]);
    assert_eq!(listed[0]["registration"], "registered");
}

#[test]
fn reconcile_rebuilds_a_wiped_spool_idempotently() {
    let ws = Workspace::new(true);
    assert_success(&ws.run(&["add", "Meeting", "--at", FIRST, "-w", "3"]));
    std::fs::remove_dir_all(ws.spool_dir()).expect("spool should be removable");

    for _ in 0..2 {
        let summary = ws.run_json(&["reconcile", "--json"]);
        assert_eq!(summary["registered"], 3);
        assert_eq!(summary["pruned"], 0);
    }
    assert_eq!(ws.spool_files(), vec!["1.json", "2.json", "3.json"]);
    assert_eq!(handles(&ws.run_json(&["ls", "--json"])), vec![1, 2, 3]);
}

#[test]
fn malformed_rows_show_in_raw_listing_until_pruned() {
    let ws = Workspace::new(true);
    assert_success(&ws.run(&["add", "Meeting", "-m", "Standup", "--at", FIRST]));
    {
        let conn = rusqlite::Connection::open(ws.db_path()).expect("db should open");
        conn.execute(
            "INSERT INTO alarms (handle, token, registration, created_at, updated_at) \
             VALUES (50, '1900000000000||broken||row', 'registered', 'x', 'x')",
            [],
        )
        .expect("garbage row should insert");
    }

    let raw = ws.run(&["ls", "--raw"]);
    assert_success(&raw);
    let raw_stdout = String::from_utf8_lossy(&raw.stdout).to_string();
    assert!(raw_stdout.contains("||Meeting||Standup||1"));
    assert!(raw_stdout.contains("1900000000000||broken||row"));

    assert_eq!(handles(&ws.run_json(&["ls", "--json"])), vec![1]);
    let raw_after = ws.run(&["ls", "--raw"]);
    assert!(!String::from_utf8_lossy(&raw_after.stdout).contains("broken"));
}

#[test]
fn deliver_reads_the_spool_without_touching_the_store() {
    let ws = Workspace::new(true);
    std::fs::create_dir_all(ws.spool_dir()).expect("spool should be creatable");
    let entry = serde_json::json!({
        "handle": 9,
        "fire_time": 1000,
        "title": "Meeting",
        "message": "Standup",
        "registered_at": "2026-10-17T09:00:00Z",
    });
    std::fs::write(ws.spool_dir().join("9.json"), entry.to_string())
        .expect("entry should be writable");

    let fired = ws.run_json(&["deliver", "--json"]);
    assert_eq!(fired[0]["handle"], 9);
    assert_eq!(fired[0]["title"], "Meeting");
    assert_eq!(fired[0]["message"], "Standup");
    assert!(ws.spool_files().is_empty());
    assert!(!ws.db_path().exists());

    let again = ws.run_json(&["deliver", "--json"]);
    assert_eq!(again.as_array().map(Vec::len), Some(0));
}

#[test]
fn rejects_bad_input_with_error_exit() {
    let ws = Workspace::new(true);

    let past = ws.run(&["add", "Meeting", "--at", "2001-01-01 09:00"]);
    assert_failure(&past);
    assert!(String::from_utf8_lossy(&past.stderr).contains("not in the future"));

    let delimiter = ws.run(&["add", "a||b", "--at", FIRST]);
    assert_failure(&delimiter);
    assert!(String::from_utf8_lossy(&delimiter.stderr).contains("cannot be stored"));

    let trailing_pipe = ws.run(&["add", "Math|", "--at", FIRST]);
    assert_failure(&trailing_pipe);
    assert!(String::from_utf8_lossy(&trailing_pipe.stderr).contains("title cannot be stored"));

    let far_future = ws.run(&["add", "Meeting", "--at", "9999-12-25T09:00:00Z", "-w", "2"]);
    assert_failure(&far_future);
    assert!(String::from_utf8_lossy(&far_future.stderr).contains("supported date range"));
    assert!(ws.run_json(&["ls", "--json"]).as_array().is_some_and(Vec::is_empty));

    let unparsable = ws.run(&["add", "Meeting", "--at", "next tuesday"]);
    assert_failure(&unparsable);

    std::fs::write(ws.config_path(), "exact_alarms = 1").expect("config should be writable");
    let bad_config = ws.run(&["ls"]);
    assert_failure(&bad_config);
    assert!(String::from_utf8_lossy(&bad_config.stderr).contains("invalid config"));
}

#[test]
fn completions_render_for_named_shell() {
    let ws = Workspace::new(true);
    let output = ws.run(&["completions", "bash"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("remindme"));
    assert!(Path::new(&ws.root).exists());
}
