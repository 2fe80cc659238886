//! Scheduled-job run logs
//!
//! One `<job id>.jsonl` file per job under the runs directory. Every finished
//! run inside the window becomes a cron record, enriched with the job name
//! from the registry and the usage of the session the run executed in.

use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{RecordKind, RunStatus, TimeWindow, UsageBatch, UsageRecord, epoch_ms};
use crate::error::RegistryError;
use crate::source::LogLayout;
use crate::source::jsonl::JsonlReader;
use crate::source::session::summarize_session;

const FINISHED_ACTION: &str = "finished";

#[derive(Debug, Deserialize)]
struct CronRunEntry {
    action: Option<String>,
    #[serde(rename = "runAtMs")]
    run_at_ms: Option<Value>,
    status: Option<Value>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(rename = "sessionKey")]
    session_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobDescriptor {
    id: Option<String>,
    name: Option<String>,
}

/// Job id → job name lookup
#[derive(Debug, Default, Clone)]
pub(crate) struct JobRegistry {
    names: HashMap<String, String>,
}

impl JobRegistry {
    /// Missing file is an empty registry; unreadable or malformed is an error
    pub(crate) fn load(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no job registry");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(Self::from_value(serde_json::from_str(&content)?))
    }

    /// Accepts `{"jobs": [...]}` or a bare list of job descriptors
    fn from_value(value: Value) -> Self {
        let jobs = match value {
            Value::Array(jobs) => jobs,
            Value::Object(mut map) => match map.remove("jobs") {
                Some(Value::Array(jobs)) => jobs,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let names = jobs
            .into_iter()
            .filter_map(|job| serde_json::from_value::<JobDescriptor>(job).ok())
            .filter_map(|job| match (job.id, job.name) {
                (Some(id), Some(name)) if !id.is_empty() && !name.is_empty() => Some((id, name)),
                _ => None,
            })
            .collect();
        Self { names }
    }

    pub(crate) fn name(&self, job_id: &str) -> Option<&str> {
        self.names.get(job_id).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

/// Load the registry, turning failures into a report warning
pub(crate) fn load_registry(path: &Path) -> (JobRegistry, UsageBatch) {
    match JobRegistry::load(path) {
        Ok(registry) => {
            tracing::debug!(jobs = registry.len(), "loaded job registry");
            (registry, UsageBatch::default())
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "failed to read job registry");
            (
                JobRegistry::default(),
                UsageBatch::warning(format!("Failed to read {}: {}", path.display(), err)),
            )
        }
    }
}

pub(crate) fn find_run_files(runs_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let pattern = format!("{}/*.jsonl", glob::Pattern::escape(&runs_dir.to_string_lossy()));
    if let Ok(entries) = glob::glob(&pattern) {
        for entry in entries.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
    }
    files.sort();
    files
}

fn job_id_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

fn record_for_run(
    entry: CronRunEntry,
    job_id: &str,
    registry: &JobRegistry,
    sessions_dir: &Path,
    window: &TimeWindow,
) -> Option<UsageRecord> {
    if entry.action.as_deref() != Some(FINISHED_ACTION) {
        return None;
    }
    let ts = epoch_ms(entry.run_at_ms.as_ref()?)?;
    if !window.contains(ts) {
        return None;
    }

    let mut record = UsageRecord::new(RecordKind::Cron, ts)?;
    record.job_id = Some(job_id.to_string());
    record.job_name = registry.name(job_id).map(str::to_string);
    record.status = RunStatus::from_reported(entry.status.as_ref().and_then(Value::as_str));
    record.session_key = entry.session_key.filter(|k| !k.is_empty());
    record.session_id = entry.session_id.filter(|id| !id.is_empty());

    let summary = record
        .session_id
        .as_deref()
        .and_then(|id| summarize_session(sessions_dir, id));
    if let Some(summary) = summary {
        if let Some(model) = summary.top_model() {
            record.model = model.to_string();
        }
        record = record.with_usage(summary.amounts());
    }
    Some(record)
}

/// Scan one job's run log
fn extract_file(
    path: &Path,
    registry: &JobRegistry,
    sessions_dir: &Path,
    window: &TimeWindow,
) -> Vec<UsageRecord> {
    let Some(job_id) = job_id_for(path) else {
        return Vec::new();
    };
    let mut reader: JsonlReader<CronRunEntry> = JsonlReader::open(path);
    let records: Vec<UsageRecord> = reader
        .by_ref()
        .filter_map(|entry| record_for_run(entry, &job_id, registry, sessions_dir, window))
        .collect();
    tracing::debug!(
        job_id = %job_id,
        records = records.len(),
        dropped = reader.dropped(),
        "scanned run log"
    );
    records
}

/// Cron records for every job, one file scanned per rayon task
pub(crate) fn extract_cron_records(
    layout: &LogLayout,
    registry: &JobRegistry,
    window: &TimeWindow,
) -> UsageBatch {
    if !layout.runs_dir.is_dir() {
        tracing::debug!(path = %layout.runs_dir.display(), "cron runs directory not found");
        return UsageBatch::warning(format!(
            "Cron runs directory not found: {}",
            layout.runs_dir.display()
        ));
    }

    let files = find_run_files(&layout.runs_dir);
    let records: Vec<UsageRecord> = files
        .par_iter()
        .flat_map_iter(|path| extract_file(path, registry, &layout.sessions_dir, window))
        .collect();

    tracing::info!(files = files.len(), records = records.len(), "extracted cron runs");
    UsageBatch {
        records,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const T0: i64 = 1_700_000_000_000;

    fn layout(root: &Path) -> LogLayout {
        LogLayout::from_root(root)
    }

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn finished(run_at: i64, status: &str, session: Option<&str>) -> String {
        let mut line = serde_json::json!({"action": "finished", "runAtMs": run_at, "status": status});
        if let Some(session) = session {
            line["sessionId"] = session.into();
            line["sessionKey"] = format!("cron:{session}").into();
        }
        line.to_string()
    }

    #[test]
    fn finished_ok_run_becomes_ok_record() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        write(&layout.runs_dir.join("job-1.jsonl"), &finished(T0, "ok", None));

        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(T0 - 1, T0 + 1));
        assert!(batch.warnings.is_empty());
        assert_eq!(batch.records.len(), 1);
        let r = &batch.records[0];
        assert_eq!(r.kind, RecordKind::Cron);
        assert_eq!(r.status, RunStatus::Ok);
        assert_eq!(r.job_id.as_deref(), Some("job-1"));
        assert_eq!(r.ts(), T0);
        assert_eq!(r.model, "unknown");
        assert!(r.cost.is_none() && r.tokens.is_none());
    }

    #[test]
    fn failed_run_becomes_error_record() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        write(&layout.runs_dir.join("job-1.jsonl"), &finished(T0, "fail", None));

        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(T0, T0));
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].status, RunStatus::Error);
    }

    #[test]
    fn only_finished_runs_inside_window_are_kept() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        let lines = [
            serde_json::json!({"action": "started", "runAtMs": T0, "status": "ok"}).to_string(),
            finished(T0 - 1, "ok", None),
            finished(T0, "ok", None),
            finished(T0 + 1000, "ok", None),
            finished(T0 + 1001, "ok", None),
            serde_json::json!({"action": "finished", "runAtMs": "soon", "status": "ok"}).to_string(),
            "{broken".to_string(),
        ];
        write(&layout.runs_dir.join("job.jsonl"), &lines.join("\n"));

        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(T0, T0 + 1000));
        let ts: Vec<i64> = batch.records.iter().map(UsageRecord::ts).collect();
        assert_eq!(ts, vec![T0, T0 + 1000]);
    }

    #[test]
    fn session_usage_and_top_model_are_attached() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        write(&layout.runs_dir.join("digest.jsonl"), &finished(T0, "ok", Some("s1")));
        write(
            &layout.sessions_dir.join("s1.jsonl"),
            concat!(
                "{\"type\":\"message\",\"message\":{\"role\":\"assistant\",\"model\":\"small\",\"usage\":{\"totalTokens\":100,\"cost\":{\"total\":0.25}}}}\n",
                "{\"type\":\"message\",\"message\":{\"role\":\"assistant\",\"model\":\"large\",\"usage\":{\"totalTokens\":400,\"cost\":{\"total\":0.5}}}}\n",
            ),
        );

        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(T0, T0));
        let r = &batch.records[0];
        assert_eq!(r.session_id.as_deref(), Some("s1"));
        assert_eq!(r.session_key.as_deref(), Some("cron:s1"));
        assert_eq!(r.model, "large");
        assert_eq!(r.tokens, Some(500));
        assert_eq!(r.cost, Some(0.75));
    }

    #[test]
    fn unknown_session_leaves_usage_absent() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        write(&layout.runs_dir.join("digest.jsonl"), &finished(T0, "ok", Some("gone")));

        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(T0, T0));
        let r = &batch.records[0];
        assert_eq!(r.session_id.as_deref(), Some("gone"));
        assert!(r.is_missing_usage());
        assert_eq!(r.model, "unknown");
    }

    #[test]
    fn job_names_come_from_registry() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        write(&layout.runs_dir.join("job-1.jsonl"), &finished(T0, "ok", None));
        write(&layout.runs_dir.join("job-2.jsonl"), &finished(T0 + 1, "ok", None));
        write(
            &layout.jobs_file,
            r#"{"jobs":[{"id":"job-1","name":"Morning digest"},{"id":"job-3"}]}"#,
        );

        let (registry, warnings) = load_registry(&layout.jobs_file);
        assert!(warnings.warnings.is_empty());
        assert_eq!(registry.len(), 1);

        let batch = extract_cron_records(&layout, &registry, &TimeWindow::new(T0, T0 + 1));
        let mut names: Vec<Option<&str>> = batch.records.iter().map(|r| r.job_name.as_deref()).collect();
        names.sort();
        assert_eq!(names, vec![None, Some("Morning digest")]);
    }

    #[test]
    fn registry_accepts_bare_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs.json");
        write(&path, r#"[{"id":"a","name":"Alpha"},{"id":"b","name":""}]"#);
        let registry = JobRegistry::load(&path).unwrap();
        assert_eq!(registry.name("a"), Some("Alpha"));
        assert_eq!(registry.name("b"), None);
    }

    #[test]
    fn missing_registry_is_silent() {
        let dir = TempDir::new().unwrap();
        let (registry, batch) = load_registry(&dir.path().join("jobs.json"));
        assert_eq!(registry.len(), 0);
        assert!(batch.warnings.is_empty());
    }

    #[test]
    fn malformed_registry_warns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs.json");
        write(&path, "{ not json");
        let (registry, batch) = load_registry(&path);
        assert_eq!(registry.len(), 0);
        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.warnings[0].starts_with("Failed to read "));
    }

    #[test]
    fn missing_runs_dir_warns_once() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(0, T0));
        assert!(batch.records.is_empty());
        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.warnings[0].contains(&layout.runs_dir.display().to_string()));
    }

    #[test]
    fn non_jsonl_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        write(&layout.runs_dir.join("notes.txt"), &finished(T0, "ok", None));
        write(&layout.runs_dir.join("job.jsonl"), &finished(T0, "ok", None));
        assert_eq!(find_run_files(&layout.runs_dir).len(), 1);
    }

    #[test]
    fn directory_named_like_a_run_log_is_skipped() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        fs::create_dir_all(layout.runs_dir.join("stray.jsonl")).unwrap();
        write(&layout.runs_dir.join("job.jsonl"), &finished(T0, "ok", None));

        let batch = extract_cron_records(&layout, &JobRegistry::default(), &TimeWindow::new(0, T0));
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].job_id.as_deref(), Some("job"));
    }

    #[test]
    fn glob_characters_in_root_are_literal() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir.path().join("data[1]"));
        write(&layout.runs_dir.join("job.jsonl"), &finished(T0, "ok", None));
        assert_eq!(find_run_files(&layout.runs_dir), vec![layout.runs_dir.join("job.jsonl")]);
    }
}
