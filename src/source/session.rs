//! Per-session usage totals
//!
//! Streams one transcript and accumulates cost and tokens of every assistant
//! reply that carries a usage block, in total and per model.

use std::path::{Path, PathBuf};

use crate::core::SessionUsageSummary;
use crate::source::jsonl::JsonlReader;
use crate::source::transcript::TranscriptEvent;

/// Transcript path for a session id, `None` for ids that are not plain file names
pub(crate) fn transcript_path(sessions_dir: &Path, session_id: &str) -> Option<PathBuf> {
    let id = session_id.trim();
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return None;
    }
    Some(sessions_dir.join(format!("{id}.jsonl")))
}

pub(crate) fn summarize_events<I>(events: I) -> SessionUsageSummary
where
    I: IntoIterator<Item = TranscriptEvent>,
{
    let mut summary = SessionUsageSummary::default();
    for event in events {
        let Some(message) = event.message() else {
            continue;
        };
        if !message.is_assistant() {
            continue;
        }
        let Some(usage) = message.usage() else {
            continue;
        };
        summary.add(&event.model(), usage);
    }
    summary
}

/// Summarize a session's transcript; `None` when there is no transcript
pub(crate) fn summarize_session(sessions_dir: &Path, session_id: &str) -> Option<SessionUsageSummary> {
    let path = transcript_path(sessions_dir, session_id)?;
    let mut reader: JsonlReader<TranscriptEvent> = JsonlReader::open(&path);
    if !reader.found() {
        tracing::debug!(session_id, "no transcript for session");
        return None;
    }
    let summary = summarize_events(reader.by_ref());
    if reader.dropped() > 0 {
        tracing::debug!(session_id, dropped = reader.dropped(), "skipped unreadable transcript lines");
    }
    Some(summary)
}
