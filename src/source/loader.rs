//! Report assembly over any backend

use std::time::Instant;

use crate::core::{TimeWindow, UsageReport};
use crate::error::AppError;
use crate::source::UsageBackend;

/// Query the backend and wrap the result in the report envelope.
///
/// Backend failures propagate; recovered conditions arrive as warnings.
pub(crate) fn build_report(
    backend: &dyn UsageBackend,
    window: TimeWindow,
) -> Result<UsageReport, AppError> {
    let start = Instant::now();
    let batch = backend.query(&window)?;
    for warning in &batch.warnings {
        tracing::debug!(backend = backend.name(), "{warning}");
    }
    tracing::info!(
        backend = backend.name(),
        records = batch.records.len(),
        warnings = batch.warnings.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "built usage report"
    );
    Ok(UsageReport::new(window, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RecordKind, UsageBatch, UsageRecord};

    struct FixedBackend(Result<UsageBatch, ()>);

    impl UsageBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn query(&self, _window: &TimeWindow) -> Result<UsageBatch, AppError> {
            self.0
                .clone()
                .map_err(|()| AppError::Store(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn envelope_carries_window_records_and_warnings() {
        let mut batch = UsageBatch::warning("Cron runs directory not found: /x".to_string());
        batch.records.push(UsageRecord::new(RecordKind::Heartbeat, 50).unwrap());

        let report = build_report(&FixedBackend(Ok(batch)), TimeWindow::new(10, 100)).unwrap();
        assert_eq!(report.start_ms, 10);
        assert_eq!(report.end_ms, 100);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.warnings.len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["startMs"], 10);
        assert_eq!(json["records"][0]["kind"], "heartbeat");
    }

    #[test]
    fn backend_failure_fails_the_report() {
        let result = build_report(&FixedBackend(Err(())), TimeWindow::new(0, 1));
        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
