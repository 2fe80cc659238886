//! CLI argument definitions
//!
//! Global window, filter and backend options plus config merging.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{Config, FlagOverrides};
use crate::core::{RecordFilter, RecordKind};
use crate::source::BackendKind;
use crate::utils::RangePreset;

use super::commands::Commands;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub(crate) enum ColorMode {
    /// Auto-detect based on terminal (default)
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Parser)]
#[command(name = "usage-report")]
#[command(about = "Cost and token usage of scheduled jobs and heartbeats", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Window start, epoch milliseconds (default: 7 days ago)
    #[arg(long, global = true, value_name = "MS", allow_hyphen_values = true)]
    pub(crate) start_ms: Option<String>,

    /// Window end, epoch milliseconds (default: now)
    #[arg(long, global = true, value_name = "MS", allow_hyphen_values = true)]
    pub(crate) end_ms: Option<String>,

    /// Window preset counted back from the end; --start-ms wins
    #[arg(long, global = true, value_enum)]
    pub(crate) last: Option<RangePreset>,

    /// Output as JSON
    #[arg(short, long, global = true)]
    pub(crate) json: bool,

    /// Only records of this kind
    #[arg(short, long, global = true, value_enum)]
    pub(crate) kind: Option<RecordKind>,

    /// Only records attributed to this model
    #[arg(short, long, global = true)]
    pub(crate) model: Option<String>,

    /// Only records with this job label (job name, job id, heartbeat, interactive)
    #[arg(long, global = true)]
    pub(crate) job: Option<String>,

    /// Data backend (default: scan, or store when USAGE_DB_ENABLED=true)
    #[arg(long, global = true, value_enum)]
    pub(crate) backend: Option<BackendKind>,

    /// Log root holding cron/ and agents/ (default: ~/.openclaw)
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) data_dir: Option<PathBuf>,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub(crate) color: ColorMode,

    /// Disable colored output (shorthand for --color=never)
    #[arg(long, global = true)]
    pub(crate) no_color: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub(crate) debug: bool,
}

impl Cli {
    /// Merge config file values into CLI (CLI args take precedence)
    pub(crate) fn with_config(mut self, config: &Config) -> Self {
        if !self.no_color && config.no_color {
            self.no_color = true;
        }
        if !self.debug && config.debug {
            self.debug = true;
        }
        self
    }

    pub(crate) fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }

    pub(crate) fn flag_overrides(&self) -> FlagOverrides<'_> {
        FlagOverrides {
            data_dir: self.data_dir.as_deref(),
            backend: self.backend,
        }
    }

    pub(crate) fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            kind: self.kind,
            model: self.model.clone(),
            job: self.job.clone(),
        }
    }
}
