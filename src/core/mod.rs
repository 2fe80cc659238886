//! Core module - canonical record shape and aggregation shared by all backends

mod aggregator;
mod bucket;
mod normalize;
mod types;

pub(crate) use aggregator::{
    Bucket, Metric, Pivot, RecordFilter, SeriesPoint, Totals, job_label, merge_batches, pivot,
    time_series, totals,
};
pub(crate) use bucket::epoch_ms;
pub(crate) use normalize::{resolve_model, resolve_usage};
pub(crate) use types::{
    RecordKind, RunStatus, SessionUsageSummary, TimeWindow, UsageAmounts, UsageBatch, UsageRecord,
    UsageReport,
};
