//! Precomputed usage store backed by SQLite
//!
//! Rows are written ahead of time by an external materializer; this crate
//! only reads them. The unique index over (kind, ts, job id, session id)
//! makes repeated writes of the same event a no-op.

use rusqlite::{Connection, OpenFlags, Row, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{RecordKind, RunStatus, TimeWindow, UsageBatch, UsageRecord};
use crate::error::AppError;
use crate::source::UsageBackend;

#[cfg(test)]
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS usage_events (
  kind TEXT NOT NULL,
  ts INTEGER NOT NULL,
  day TEXT,
  hour TEXT,
  job_id TEXT,
  job_name TEXT,
  model TEXT,
  status TEXT,
  cost REAL,
  tokens INTEGER,
  session_id TEXT,
  session_key TEXT,
  missing_usage INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS usage_events_dedup
  ON usage_events (kind, ts, IFNULL(job_id, ''), IFNULL(session_id, ''));
CREATE INDEX IF NOT EXISTS usage_events_ts ON usage_events (ts);
"#;

/// Raw column values, validated when converted into a record
struct StoredRow {
    kind: String,
    ts: i64,
    job_id: Option<String>,
    job_name: Option<String>,
    model: Option<String>,
    status: Option<String>,
    cost: Option<f64>,
    tokens: Option<i64>,
    session_id: Option<String>,
    session_key: Option<String>,
    missing_usage: Option<i64>,
}

fn read_row(row: &Row<'_>) -> Result<StoredRow, rusqlite::Error> {
    Ok(StoredRow {
        kind: row.get(0)?,
        ts: row.get(1)?,
        job_id: row.get(2)?,
        job_name: row.get(3)?,
        model: row.get(4)?,
        status: row.get(5)?,
        cost: row.get(6)?,
        tokens: row.get(7)?,
        session_id: row.get(8)?,
        session_key: row.get(9)?,
        missing_usage: row.get(10)?,
    })
}

impl StoredRow {
    fn into_record(self) -> Option<UsageRecord> {
        let kind = RecordKind::parse(&self.kind)?;
        let mut record = UsageRecord::new(kind, self.ts)?;
        record.job_id = self.job_id;
        record.job_name = self.job_name;
        record.session_id = self.session_id;
        record.session_key = self.session_key;
        if let Some(model) = self.model.filter(|m| !m.trim().is_empty()) {
            record.model = model;
        }
        record.status = match self.status.as_deref() {
            None => RunStatus::Ok,
            reported => RunStatus::from_reported(reported),
        };
        record.cost = self.cost.filter(|c| c.is_finite() && *c >= 0.0);
        record.tokens = self.tokens.and_then(|t| u64::try_from(t).ok());
        let missing = self
            .missing_usage
            .map(|flag| flag != 0)
            .unwrap_or(record.cost.is_none() && record.tokens.is_none());
        record.missing_usage = Some(missing);
        Some(record)
    }
}

pub(crate) struct UsageStore {
    conn: Connection,
}

impl UsageStore {
    /// Open an existing store read-only; a missing file is an error
    pub(crate) fn open(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Create the store and its schema, as the materializer does
    #[cfg(test)]
    pub(crate) fn create(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn load_records(&self, window: &TimeWindow) -> Result<UsageBatch, AppError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT kind, ts, job_id, job_name, model, status, cost, tokens,
                   session_id, session_key, missing_usage
            FROM usage_events
            WHERE ts BETWEEN ?1 AND ?2
            ORDER BY ts ASC
            "#,
        )?;
        let rows = stmt.query_map(params![window.start_ms, window.end_ms], read_row)?;

        let mut batch = UsageBatch::default();
        let mut skipped = 0usize;
        for row in rows {
            match row?.into_record() {
                Some(record) => batch.records.push(record),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "ignored usage store rows with unknown kind or timestamp");
        }
        Ok(batch)
    }

    /// Write records, ignoring ones already present
    #[cfg(test)]
    pub(crate) fn insert(&self, records: &[UsageRecord]) -> Result<usize, AppError> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT OR IGNORE INTO usage_events (
              kind, ts, day, hour, job_id, job_name, model, status, cost, tokens,
              session_id, session_key, missing_usage
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )?;
        let mut inserted = 0;
        for r in records {
            inserted += stmt.execute(params![
                r.kind.as_str(),
                r.ts(),
                r.day(),
                r.hour(),
                r.job_id,
                r.job_name,
                r.model,
                r.status.as_str(),
                r.cost,
                r.tokens.map(|t| t as i64),
                r.session_id,
                r.session_key,
                r.is_missing_usage(),
            ])?;
        }
        Ok(inserted)
    }

    #[cfg(test)]
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Reads the materialized store at `path`; opened per query
pub(crate) struct StoreBackend {
    path: PathBuf,
}

impl StoreBackend {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl UsageBackend for StoreBackend {
    fn name(&self) -> &'static str {
        "store"
    }

    fn query(&self, window: &TimeWindow) -> Result<UsageBatch, AppError> {
        tracing::debug!(path = %self.path.display(), "opening usage store");
        UsageStore::open(&self.path)?.load_records(window)
    }
}
