//! Core data types shared across all backends
//!
//! These types represent the canonical record shape that both the log scan
//! and the precomputed store convert to.

use serde::Serialize;
use std::collections::HashMap;

use crate::consts::UNKNOWN;
use crate::core::bucket::utc_buckets;

/// Provenance of a usage record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RecordKind {
    Cron,
    Heartbeat,
    Interactive,
}

impl RecordKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RecordKind::Cron => "cron",
            RecordKind::Heartbeat => "heartbeat",
            RecordKind::Interactive => "interactive",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "cron" => Some(RecordKind::Cron),
            "heartbeat" => Some(RecordKind::Heartbeat),
            "interactive" => Some(RecordKind::Interactive),
            _ => None,
        }
    }
}

/// Outcome of the event; anything not reported as exactly "ok" is an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RunStatus {
    #[default]
    Ok,
    Error,
}

impl RunStatus {
    pub(crate) fn from_reported(value: Option<&str>) -> Self {
        match value {
            Some("ok") => RunStatus::Ok,
            _ => RunStatus::Error,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
        }
    }
}

/// Cost and token amounts resolved from one usage block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct UsageAmounts {
    pub(crate) cost: Option<f64>,
    pub(crate) tokens: Option<u64>,
}

/// Canonical output unit.
///
/// `day` and `hour` are derived from `ts` at construction and cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageRecord {
    pub(crate) kind: RecordKind,
    ts: i64,
    day: String,
    hour: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session_key: Option<String>,
    pub(crate) model: String,
    pub(crate) status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tokens: Option<u64>,
    /// Only set by backends that track missing usage explicitly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) missing_usage: Option<bool>,
}

impl UsageRecord {
    /// Returns `None` when `ts` cannot be placed on the UTC calendar.
    pub(crate) fn new(kind: RecordKind, ts: i64) -> Option<Self> {
        let (day, hour) = utc_buckets(ts)?;
        Some(Self {
            kind,
            ts,
            day,
            hour,
            job_id: None,
            job_name: None,
            session_id: None,
            session_key: None,
            model: UNKNOWN.to_string(),
            status: RunStatus::Ok,
            cost: None,
            tokens: None,
            missing_usage: None,
        })
    }

    pub(crate) fn ts(&self) -> i64 {
        self.ts
    }

    pub(crate) fn day(&self) -> &str {
        &self.day
    }

    pub(crate) fn hour(&self) -> &str {
        &self.hour
    }

    pub(crate) fn with_usage(mut self, usage: UsageAmounts) -> Self {
        self.cost = usage.cost;
        self.tokens = usage.tokens;
        self
    }

    /// True when the event carried no parseable cost or token data
    pub(crate) fn is_missing_usage(&self) -> bool {
        self.missing_usage
            .unwrap_or(self.cost.is_none() && self.tokens.is_none())
    }
}

/// Inclusive `[start_ms, end_ms]` report window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeWindow {
    pub(crate) start_ms: i64,
    pub(crate) end_ms: i64,
}

impl TimeWindow {
    pub(crate) fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub(crate) fn contains(&self, ts: i64) -> bool {
        ts >= self.start_ms && ts <= self.end_ms
    }

    pub(crate) fn span_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Records plus the warnings produced while building them
#[derive(Debug, Default, Clone)]
pub(crate) struct UsageBatch {
    pub(crate) records: Vec<UsageRecord>,
    pub(crate) warnings: Vec<String>,
}

impl UsageBatch {
    pub(crate) fn warning(message: String) -> Self {
        Self {
            records: Vec::new(),
            warnings: vec![message],
        }
    }

    pub(crate) fn extend(&mut self, other: UsageBatch) {
        self.records.extend(other.records);
        self.warnings.extend(other.warnings);
    }
}

/// Report envelope handed to consumers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageReport {
    pub(crate) start_ms: i64,
    pub(crate) end_ms: i64,
    pub(crate) records: Vec<UsageRecord>,
    pub(crate) warnings: Vec<String>,
}

impl UsageReport {
    pub(crate) fn new(window: TimeWindow, batch: UsageBatch) -> Self {
        Self {
            start_ms: window.start_ms,
            end_ms: window.end_ms,
            records: batch.records,
            warnings: batch.warnings,
        }
    }

    pub(crate) fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_ms, self.end_ms)
    }
}

/// Per-model subtotal inside one session
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ModelUsage {
    pub(crate) cost: f64,
    pub(crate) tokens: u64,
    /// Order in which the model first appeared in the transcript
    pub(crate) first_seen: usize,
}

/// Usage accumulated over one session transcript
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct SessionUsageSummary {
    pub(crate) cost: Option<f64>,
    pub(crate) tokens: Option<u64>,
    pub(crate) models: HashMap<String, ModelUsage>,
}

impl SessionUsageSummary {
    pub(crate) fn add(&mut self, model: &str, usage: UsageAmounts) {
        let next_seen = self.models.len();
        let bucket = self
            .models
            .entry(model.to_string())
            .or_insert_with(|| ModelUsage {
                first_seen: next_seen,
                ..ModelUsage::default()
            });

        if let Some(cost) = usage.cost {
            bucket.cost += cost;
            self.cost = Some(self.cost.unwrap_or(0.0) + cost);
        }
        if let Some(tokens) = usage.tokens {
            bucket.tokens = bucket.tokens.saturating_add(tokens);
            self.tokens = Some(self.tokens.unwrap_or(0).saturating_add(tokens));
        }
    }

    /// Model with the most tokens; ties go to the one seen first
    pub(crate) fn top_model(&self) -> Option<&str> {
        self.models
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.tokens
                    .cmp(&b.tokens)
                    .then_with(|| b.first_seen.cmp(&a.first_seen))
            })
            .map(|(model, _)| model.as_str())
    }

    pub(crate) fn amounts(&self) -> UsageAmounts {
        UsageAmounts {
            cost: self.cost,
            tokens: self.tokens,
        }
    }
}
