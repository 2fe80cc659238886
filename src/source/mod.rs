//! Usage data backends
//!
//! A backend answers one question: every usage record inside a time window,
//! plus the warnings collected while producing them. The log scanner derives
//! records from cron run logs and session transcripts; the store reads rows
//! that were written ahead of time.

pub(crate) mod cron;
pub(crate) mod heartbeat;
pub(crate) mod jsonl;
pub(crate) mod loader;
pub(crate) mod registry;
pub(crate) mod scan;
pub(crate) mod session;
pub(crate) mod store;
pub(crate) mod transcript;

use clap::ValueEnum;
use std::path::{Path, PathBuf};

use crate::core::{TimeWindow, UsageBatch};
use crate::error::AppError;

/// Where the log files live under the data root
#[derive(Debug, Clone)]
pub(crate) struct LogLayout {
    pub(crate) runs_dir: PathBuf,
    pub(crate) jobs_file: PathBuf,
    pub(crate) sessions_dir: PathBuf,
}

impl LogLayout {
    pub(crate) fn from_root(root: &Path) -> Self {
        Self {
            runs_dir: root.join("cron").join("runs"),
            jobs_file: root.join("cron").join("jobs.json"),
            sessions_dir: root.join("agents").join("main").join("sessions"),
        }
    }
}

/// A source of usage records
pub(crate) trait UsageBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// All records with a timestamp inside the window
    fn query(&self, window: &TimeWindow) -> Result<UsageBatch, AppError>;
}

pub(crate) type BoxedBackend = Box<dyn UsageBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendKind {
    /// Derive records from run logs and transcripts
    Scan,
    /// Read pre-aggregated rows from the usage store
    Store,
}

pub(crate) use loader::build_report;
pub(crate) use registry::select_backend;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_data_root() {
        let layout = LogLayout::from_root(Path::new("/data"));
        assert_eq!(layout.runs_dir, PathBuf::from("/data/cron/runs"));
        assert_eq!(layout.jobs_file, PathBuf::from("/data/cron/jobs.json"));
        assert_eq!(layout.sessions_dir, PathBuf::from("/data/agents/main/sessions"));
    }
}
