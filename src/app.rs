use crate::cli::{Cli, ReportView};
use crate::core::{UsageRecord, UsageReport, pivot, time_series, totals};
use crate::error::AppError;
use crate::output::{
    TableOptions, output_pivot_json, output_records_json, output_series_json, output_totals_json,
    print_pivot_table, print_records_table, print_series_table, print_totals_table, print_warnings,
};

pub(crate) struct CommandContext<'a> {
    pub(crate) cli: &'a Cli,
    pub(crate) report: &'a UsageReport,
}

impl CommandContext<'_> {
    fn table_options(&self) -> TableOptions {
        TableOptions {
            use_color: self.cli.use_color(),
        }
    }

    /// Emit JSON on stdout, or warnings on stderr followed by the table
    fn render(
        &self,
        json: impl FnOnce() -> Result<String, AppError>,
        table: impl FnOnce(TableOptions),
    ) -> Result<(), AppError> {
        if self.cli.json {
            println!("{}", json()?);
        } else {
            print_warnings(self.report, self.cli.use_color());
            table(self.table_options());
        }
        Ok(())
    }
}

/// Render one view over the filtered report records
pub(crate) fn handle_view(view: ReportView, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let report = ctx.report;
    let records: Vec<&UsageRecord> = ctx.cli.record_filter().apply(&report.records);
    tracing::debug!(
        matched = records.len(),
        total = report.records.len(),
        "applied record filter"
    );

    match view {
        ReportView::Records => ctx.render(
            || output_records_json(report, &records),
            |opts| print_records_table(report, &records, opts),
        ),
        ReportView::Series(bucket) => {
            let bucket = bucket.resolve(&report.window());
            let points = time_series(&records, bucket);
            ctx.render(
                || output_series_json(report, bucket, &points),
                |opts| print_series_table(report, &points, opts),
            )
        }
        ReportView::Pivot(metric) => {
            let pivot = pivot(&records, metric);
            ctx.render(
                || output_pivot_json(report, &pivot),
                |opts| print_pivot_table(report, &pivot, opts),
            )
        }
        ReportView::Totals => {
            let totals = totals(&records);
            ctx.render(
                || output_totals_json(report, &totals),
                |opts| print_totals_table(report, &totals, opts),
            )
        }
    }
}
