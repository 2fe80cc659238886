//! Heartbeat detection in session transcripts
//!
//! A heartbeat has no run id. It is recognized by adjacency: a user message
//! starting with the heartbeat prompt, answered by the next assistant message.
//! The record carries the prompt's timestamp and the reply's usage.

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::consts::HEARTBEAT_PROMPT_START;
use crate::core::{RecordKind, RunStatus, TimeWindow, UsageAmounts, UsageBatch, UsageRecord};
use crate::source::LogLayout;
use crate::source::jsonl::JsonlReader;
use crate::source::transcript::TranscriptEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DetectorState {
    #[default]
    Idle,
    /// Waiting for the reply to a prompt; `None` when the prompt had no usable timestamp
    Armed { trigger_ms: Option<i64> },
}

/// A measured heartbeat: prompt time plus the reply's model and usage
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HeartbeatHit {
    pub(crate) ts: i64,
    pub(crate) model: String,
    pub(crate) usage: UsageAmounts,
}

/// Per-transcript state machine; feed events in file order
#[derive(Debug, Default)]
pub(crate) struct HeartbeatDetector {
    state: DetectorState,
}

impl HeartbeatDetector {
    pub(crate) fn observe(&mut self, event: &TranscriptEvent) -> Option<HeartbeatHit> {
        let message = event.message()?;
        match self.state {
            DetectorState::Idle => {
                if message.is_user() && message.text().starts_with(HEARTBEAT_PROMPT_START) {
                    self.state = DetectorState::Armed {
                        trigger_ms: event.timestamp_ms(),
                    };
                }
                None
            }
            DetectorState::Armed { trigger_ms } => {
                if !message.is_assistant() {
                    return None;
                }
                self.state = DetectorState::Idle;
                let usage = message.usage()?;
                Some(HeartbeatHit {
                    ts: trigger_ms?,
                    model: event.model(),
                    usage,
                })
            }
        }
    }
}

fn find_transcripts(sessions_dir: &Path) -> Vec<PathBuf> {
    let pattern = format!("{}/*.jsonl", glob::Pattern::escape(&sessions_dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map(|paths| paths.flatten().filter(|p| p.is_file()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

/// Heartbeat records from one transcript, in file order
fn detect_in_file(path: &Path, window: &TimeWindow) -> Vec<UsageRecord> {
    let session_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string);
    let mut detector = HeartbeatDetector::default();
    let mut reader: JsonlReader<TranscriptEvent> = JsonlReader::open(path);

    let mut records = Vec::new();
    for event in reader.by_ref() {
        let Some(hit) = detector.observe(&event) else {
            continue;
        };
        if !window.contains(hit.ts) {
            continue;
        }
        let Some(record) = UsageRecord::new(RecordKind::Heartbeat, hit.ts) else {
            continue;
        };
        let mut record = record.with_usage(hit.usage);
        record.model = hit.model;
        record.status = RunStatus::Ok;
        record.session_id = session_id.clone();
        records.push(record);
    }

    if !records.is_empty() || reader.dropped() > 0 {
        tracing::debug!(
            path = %path.display(),
            heartbeats = records.len(),
            dropped = reader.dropped(),
            "scanned transcript"
        );
    }
    records
}

/// Heartbeat records across all transcripts, one file per rayon task
pub(crate) fn detect_heartbeats(layout: &LogLayout, window: &TimeWindow) -> UsageBatch {
    if !layout.sessions_dir.is_dir() {
        tracing::debug!(path = %layout.sessions_dir.display(), "sessions directory not found");
        return UsageBatch::warning(format!(
            "Sessions directory not found: {}",
            layout.sessions_dir.display()
        ));
    }

    let files = find_transcripts(&layout.sessions_dir);
    let records: Vec<UsageRecord> = files
        .par_iter()
        .flat_map_iter(|path| detect_in_file(path, window))
        .collect();

    tracing::info!(files = files.len(), records = records.len(), "detected heartbeats");
    UsageBatch {
        records,
        warnings: Vec::new(),
    }
}
