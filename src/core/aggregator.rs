//! Aggregation over merged usage records
//!
//! Merges backend output into one time-ordered sequence and derives the
//! filtered, bucketed and pivoted views consumed by the output layer.

use std::collections::{BTreeMap, BTreeSet};

use crate::consts::UNKNOWN;
use crate::core::types::{RecordKind, TimeWindow, UsageBatch, UsageRecord};

const HOUR_BUCKET_MAX_SPAN_MS: i64 = 24 * 60 * 60 * 1000;
/// Pivot cost cells are summed as integer nano-dollars
const NANOS_PER_DOLLAR: f64 = 1e9;

/// Bucket granularity for time series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Bucket {
    /// Hourly for windows up to 24h, daily otherwise
    #[default]
    Auto,
    Day,
    Hour,
}

impl Bucket {
    pub(crate) fn resolve(self, window: &TimeWindow) -> Bucket {
        match self {
            Bucket::Auto if window.span_ms() <= HOUR_BUCKET_MAX_SPAN_MS => Bucket::Hour,
            Bucket::Auto => Bucket::Day,
            other => other,
        }
    }

    fn key(self, record: &UsageRecord) -> &str {
        match self {
            Bucket::Hour => record.hour(),
            Bucket::Day | Bucket::Auto => record.day(),
        }
    }
}

/// Metric summed by the pivot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Metric {
    #[default]
    Cost,
    Tokens,
}

impl Metric {
    /// Fixed-point amount of one record; absent values count as zero
    fn units(self, record: &UsageRecord) -> i128 {
        match self {
            Metric::Cost => (record.cost.unwrap_or(0.0) * NANOS_PER_DOLLAR).round() as i128,
            Metric::Tokens => i128::from(record.tokens.unwrap_or(0)),
        }
    }

    /// Display value of a fixed-point amount
    pub(crate) fn value(self, units: i128) -> f64 {
        match self {
            Metric::Cost => units as f64 / NANOS_PER_DOLLAR,
            Metric::Tokens => units as f64,
        }
    }
}

/// Concatenate batches and order records by timestamp.
///
/// The sort is stable, so records with equal `ts` keep their merge order.
pub(crate) fn merge_batches<I>(batches: I) -> UsageBatch
where
    I: IntoIterator<Item = UsageBatch>,
{
    let mut merged = UsageBatch::default();
    for batch in batches {
        merged.extend(batch);
    }
    merged.records.sort_by_key(UsageRecord::ts);
    merged
}

/// Display label used to group records into jobs.
///
/// Heartbeats and interactive sessions are treated as synthetic jobs.
pub(crate) fn job_label(record: &UsageRecord) -> &str {
    match record.kind {
        RecordKind::Heartbeat => "heartbeat",
        RecordKind::Interactive => "interactive",
        RecordKind::Cron => record
            .job_name
            .as_deref()
            .or(record.job_id.as_deref())
            .unwrap_or(UNKNOWN),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordFilter {
    pub(crate) kind: Option<RecordKind>,
    pub(crate) model: Option<String>,
    pub(crate) job: Option<String>,
}

impl RecordFilter {
    pub(crate) fn matches(&self, record: &UsageRecord) -> bool {
        if let Some(kind) = self.kind
            && record.kind != kind
        {
            return false;
        }
        if let Some(model) = &self.model
            && record.model != *model
        {
            return false;
        }
        if let Some(job) = &self.job
            && job_label(record) != job.as_str()
        {
            return false;
        }
        true
    }

    pub(crate) fn apply<'a>(&self, records: &'a [UsageRecord]) -> Vec<&'a UsageRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Totals {
    pub(crate) cost: f64,
    pub(crate) tokens: u64,
    pub(crate) rows: usize,
    pub(crate) missing_usage: usize,
}

impl Totals {
    fn add(&mut self, record: &UsageRecord) {
        self.cost += record.cost.unwrap_or(0.0);
        self.tokens = self.tokens.saturating_add(record.tokens.unwrap_or(0));
        self.rows += 1;
        if record.is_missing_usage() {
            self.missing_usage += 1;
        }
    }

    pub(crate) fn merge(&mut self, other: &Totals) {
        self.cost += other.cost;
        self.tokens = self.tokens.saturating_add(other.tokens);
        self.rows += other.rows;
        self.missing_usage += other.missing_usage;
    }
}

pub(crate) fn totals(records: &[&UsageRecord]) -> Totals {
    let mut totals = Totals::default();
    for record in records {
        totals.add(record);
    }
    totals
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeriesPoint {
    pub(crate) key: String,
    pub(crate) totals: Totals,
}

/// Sum records per bucket key, keys ascending
pub(crate) fn time_series(records: &[&UsageRecord], bucket: Bucket) -> Vec<SeriesPoint> {
    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();
    for record in records {
        groups.entry(bucket.key(record)).or_default().add(record);
    }
    groups
        .into_iter()
        .map(|(key, totals)| SeriesPoint {
            key: key.to_string(),
            totals,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PivotRow {
    pub(crate) job: String,
    pub(crate) runs: usize,
    pub(crate) by_model: BTreeMap<String, i128>,
    pub(crate) total: i128,
}

/// Job × model matrix of one metric with row, column and grand totals.
///
/// Cells hold fixed-point units (see [`Metric::value`]), so the grand total
/// equals both the sum of row totals and the sum of column totals exactly.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pivot {
    pub(crate) metric: Metric,
    pub(crate) models: Vec<String>,
    pub(crate) rows: Vec<PivotRow>,
    pub(crate) totals_by_model: BTreeMap<String, i128>,
    pub(crate) grand_total: i128,
}

impl Pivot {
    pub(crate) fn value(&self, units: i128) -> f64 {
        self.metric.value(units)
    }
}

pub(crate) fn pivot(records: &[&UsageRecord], metric: Metric) -> Pivot {
    let models: Vec<String> = records
        .iter()
        .map(|r| r.model.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_job: BTreeMap<&str, Vec<&UsageRecord>> = BTreeMap::new();
    for record in records {
        by_job.entry(job_label(record)).or_default().push(*record);
    }

    let mut rows: Vec<PivotRow> = by_job
        .into_iter()
        .map(|(job, job_records)| {
            let mut by_model: BTreeMap<String, i128> =
                models.iter().map(|m| (m.clone(), 0)).collect();
            for record in &job_records {
                *by_model.entry(record.model.clone()).or_default() += metric.units(record);
            }
            let total = by_model.values().sum();
            PivotRow {
                job: job.to_string(),
                runs: job_records.len(),
                by_model,
                total,
            }
        })
        .collect();

    let mut totals_by_model: BTreeMap<String, i128> =
        models.iter().map(|m| (m.clone(), 0)).collect();
    for row in &rows {
        for (model, value) in &row.by_model {
            *totals_by_model.entry(model.clone()).or_default() += value;
        }
    }
    let grand_total = totals_by_model.values().sum();

    // Hotspots first; labels break ties so the order is deterministic
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.job.cmp(&b.job)));

    Pivot {
        metric,
        models,
        rows,
        totals_by_model,
        grand_total,
    }
}
