use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const T0: i64 = 1_700_000_000_000;
const HOUR: i64 = 60 * 60 * 1000;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "usage-report-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write test file");
}

fn jsonl(lines: &[Value]) -> String {
    let lines: Vec<String> = lines.iter().map(Value::to_string).collect();
    lines.join("\n") + "\n"
}

/// Runs the binary against `root` as the log root, isolated from any user config
fn run_report(root: &Path, args: &[&str]) -> (bool, Vec<u8>, Vec<u8>) {
    let bin = std::env::var("CARGO_BIN_EXE_usage-report").unwrap_or_else(|_| {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("target");
        path.push("debug");
        if cfg!(windows) {
            path.push("usage-report.exe");
        } else {
            path.push("usage-report");
        }
        path.to_string_lossy().into_owned()
    });
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .env("OPENCLAW_DIR", root)
        .env("HOME", root.join("home"))
        .env("XDG_CONFIG_HOME", root.join("home").join(".config"))
        .env_remove("USAGE_DB_ENABLED")
        .env_remove("USAGE_DB_PATH")
        .env_remove("RUST_LOG");
    let output = cmd.output().expect("run usage-report");
    (output.status.success(), output.stdout, output.stderr)
}

fn window_args(start: i64, end: i64) -> Vec<String> {
    vec![
        "--start-ms".to_string(),
        start.to_string(),
        "--end-ms".to_string(),
        end.to_string(),
    ]
}

fn run_json(root: &Path, command: &[&str], start: i64, end: i64) -> Value {
    let window = window_args(start, end);
    let mut args: Vec<&str> = command.to_vec();
    args.extend(window.iter().map(String::as_str));
    args.push("--json");
    let (ok, stdout, stderr) = run_report(root, &args);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    serde_json::from_slice(&stdout).expect("json")
}

/// Two cron jobs (one failing run) plus one measured heartbeat
fn seed_logs(root: &Path) {
    write_file(
        &root.join("cron").join("jobs.json"),
        r#"{"jobs":[{"id":"digest","name":"Morning digest"}]}"#,
    );
    write_file(
        &root.join("cron").join("runs").join("digest.jsonl"),
        &jsonl(&[
            json!({"action": "started", "runAtMs": T0}),
            json!({"action": "finished", "runAtMs": T0, "status": "ok", "sessionId": "run-1"}),
            json!({"action": "finished", "runAtMs": T0 - 10 * 24 * HOUR, "status": "ok"}),
        ]),
    );
    write_file(
        &root.join("cron").join("runs").join("backup.jsonl"),
        &jsonl(&[json!({"action": "finished", "runAtMs": T0 + 2 * HOUR, "status": "fail"})]),
    );

    let sessions = root.join("agents").join("main").join("sessions");
    write_file(
        &sessions.join("run-1.jsonl"),
        &jsonl(&[json!({"type": "message", "message": {
            "role": "assistant", "model": "m-large",
            "usage": {"totalTokens": 400, "cost": {"total": 0.5}}
        }})]),
    );
    write_file(
        &sessions.join("main.jsonl"),
        &jsonl(&[
            json!({"type": "message", "message": {"role": "user", "timestamp": T0 + HOUR,
                "content": [{"type": "text", "text": "Read HEARTBEAT.md if it exists. Reply HEARTBEAT_OK."}]}}),
            json!({"type": "message", "message": {"role": "assistant", "timestamp": T0 + HOUR + 4000,
                "model": "m-small", "usage": {"input": 80, "output": 20, "costTotal": 0.25}}}),
        ]),
    );
}

#[test]
fn records_json_merges_cron_and_heartbeats() {
    let root = unique_temp_dir("records");
    seed_logs(&root);

    let json = run_json(&root, &["records"], T0 - HOUR, T0 + 3 * HOUR);
    assert_eq!(json["startMs"].as_i64(), Some(T0 - HOUR));
    assert_eq!(json["endMs"].as_i64(), Some(T0 + 3 * HOUR));
    assert_eq!(json["warnings"].as_array().map(Vec::len), Some(0));

    let records = json["records"].as_array().expect("records");
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["kind"], "cron");
    assert_eq!(records[0]["jobName"], "Morning digest");
    assert_eq!(records[0]["status"], "ok");
    assert_eq!(records[0]["model"], "m-large");
    assert_eq!(records[0]["tokens"].as_u64(), Some(400));
    assert_eq!(records[0]["day"], "2023-11-14");
    assert_eq!(records[0]["hour"], "2023-11-14T22");

    assert_eq!(records[1]["kind"], "heartbeat");
    assert_eq!(records[1]["ts"].as_i64(), Some(T0 + HOUR));
    assert_eq!(records[1]["tokens"].as_u64(), Some(100));
    assert_eq!(records[1]["cost"].as_f64(), Some(0.25));

    assert_eq!(records[2]["jobId"], "backup");
    assert_eq!(records[2]["status"], "error");
    assert!(records[2].get("cost").is_none());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn runs_outside_window_are_excluded() {
    let root = unique_temp_dir("window");
    seed_logs(&root);

    let json = run_json(&root, &[], T0 + 90 * 60 * 1000, T0 + 3 * HOUR);
    let records = json["records"].as_array().expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["jobId"], "backup");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn missing_log_roots_are_warnings_not_errors() {
    let root = unique_temp_dir("empty");

    let json = run_json(&root, &["records"], 0, T0);
    assert_eq!(json["records"].as_array().map(Vec::len), Some(0));
    let warnings: Vec<&str> = json["warnings"]
        .as_array()
        .expect("warnings")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].starts_with("Cron runs directory not found: "));
    assert!(warnings[1].starts_with("Sessions directory not found: "));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn pivot_json_totals_add_up() {
    let root = unique_temp_dir("pivot");
    seed_logs(&root);

    let json = run_json(&root, &["pivot", "--metric", "tokens"], T0 - HOUR, T0 + 3 * HOUR);
    assert_eq!(json["metric"], "tokens");
    assert_eq!(json["models"], json!(["m-large", "m-small", "unknown"]));

    let rows = json["rows"].as_array().expect("rows");
    assert_eq!(rows[0]["job"], "Morning digest");
    assert_eq!(rows[1]["job"], "heartbeat");
    assert_eq!(rows[2]["job"], "backup");

    let row_sum: f64 = rows.iter().filter_map(|r| r["total"].as_f64()).sum();
    let col_sum: f64 = json["totalsByModel"]
        .as_object()
        .expect("totals by model")
        .values()
        .filter_map(Value::as_f64)
        .sum();
    assert_eq!(json["grandTotal"].as_f64(), Some(500.0));
    assert_eq!(row_sum, 500.0);
    assert_eq!(col_sum, 500.0);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn filters_and_totals() {
    let root = unique_temp_dir("totals");
    seed_logs(&root);

    let json = run_json(&root, &["totals", "--kind", "cron"], T0 - HOUR, T0 + 3 * HOUR);
    assert_eq!(json["totals"]["rows"].as_u64(), Some(2));
    assert_eq!(json["totals"]["tokens"].as_u64(), Some(400));
    assert_eq!(json["totals"]["missingUsage"].as_u64(), Some(1));

    let json = run_json(&root, &["series", "--bucket", "hour"], T0 - HOUR, T0 + 3 * HOUR);
    let keys: Vec<&str> = json["points"]
        .as_array()
        .expect("points")
        .iter()
        .filter_map(|p| p["key"].as_str())
        .collect();
    assert_eq!(keys, vec!["2023-11-14T22", "2023-11-14T23", "2023-11-15T00"]);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn table_output_prints_warnings_to_stderr() {
    let root = unique_temp_dir("table");

    let window = window_args(0, T0);
    let mut args = vec!["records", "--no-color"];
    args.extend(window.iter().map(String::as_str));
    let (ok, stdout, stderr) = run_report(&root, &args);
    assert!(ok);
    let stderr = String::from_utf8_lossy(&stderr);
    assert!(stderr.contains("warning: Cron runs directory not found"));
    assert!(String::from_utf8_lossy(&stdout).contains("No usage records found"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn store_backend_without_path_fails() {
    let root = unique_temp_dir("store");
    let (ok, _stdout, stderr) = run_report(&root, &["--backend", "store", "--json"]);
    assert!(!ok);
    assert!(String::from_utf8_lossy(&stderr).contains("Usage store path is not configured"));

    let _ = fs::remove_dir_all(root);
}
