//! On-demand log scanning backend

use std::time::Instant;

use crate::core::{TimeWindow, UsageBatch, merge_batches};
use crate::error::AppError;
use crate::source::cron::{extract_cron_records, load_registry};
use crate::source::heartbeat::detect_heartbeats;
use crate::source::{LogLayout, UsageBackend};

/// Cron runs and heartbeats read straight from the log tree
pub(crate) struct LogScanBackend {
    layout: LogLayout,
}

impl LogScanBackend {
    pub(crate) fn new(layout: LogLayout) -> Self {
        Self { layout }
    }
}

impl UsageBackend for LogScanBackend {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn query(&self, window: &TimeWindow) -> Result<UsageBatch, AppError> {
        let start = Instant::now();
        let (registry, registry_warnings) = load_registry(&self.layout.jobs_file);

        let (cron, heartbeats) = rayon::join(
            || extract_cron_records(&self.layout, &registry, window),
            || detect_heartbeats(&self.layout, window),
        );

        let batch = merge_batches([registry_warnings, cron, heartbeats]);
        tracing::debug!(
            records = batch.records.len(),
            warnings = batch.warnings.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "log scan finished"
        );
        Ok(batch)
    }
}
