//! CLI subcommand definitions

use clap::Subcommand;

use crate::core::{Bucket, Metric};

/// Report views over the same filtered records
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// List usage records (default)
    Records,
    /// Cost, tokens and run count per time bucket
    Series {
        /// Bucket size; auto is hourly for windows up to 24h
        #[arg(short, long, value_enum, default_value = "auto")]
        bucket: Bucket,
    },
    /// Job × model matrix of one metric
    Pivot {
        /// Value summed in each cell
        #[arg(long, value_enum, default_value = "cost")]
        metric: Metric,
    },
    /// Totals over all matching records
    Totals,
}

/// Normalized view to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportView {
    Records,
    Series(Bucket),
    Pivot(Metric),
    Totals,
}

impl From<&Option<Commands>> for ReportView {
    fn from(cmd: &Option<Commands>) -> Self {
        match cmd {
            Some(Commands::Records) | None => ReportView::Records,
            Some(Commands::Series { bucket }) => ReportView::Series(*bucket),
            Some(Commands::Pivot { metric }) => ReportView::Pivot(*metric),
            Some(Commands::Totals) => ReportView::Totals,
        }
    }
}
