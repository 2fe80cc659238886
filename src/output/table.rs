use comfy_table::{Cell, Color};

use crate::core::{
    Metric, Pivot, RunStatus, SeriesPoint, Totals, UsageRecord, UsageReport, job_label, totals,
};
use crate::output::format::{
    create_styled_table, format_cost, format_metric, format_number, format_tokens, format_ts,
    header_cell, right_cell, styled_cell,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct TableOptions {
    pub(crate) use_color: bool,
}

impl TableOptions {
    fn accent(self) -> Option<Color> {
        self.use_color.then_some(Color::Cyan)
    }

    fn money(self) -> Option<Color> {
        self.use_color.then_some(Color::Green)
    }

    fn failure(self) -> Option<Color> {
        self.use_color.then_some(Color::Red)
    }
}

/// Warnings go to stderr so piped tables stay clean
pub(crate) fn print_warnings(report: &UsageReport, use_color: bool) {
    for warning in &report.warnings {
        if use_color {
            eprintln!("\x1b[33mwarning:\x1b[0m {warning}");
        } else {
            eprintln!("warning: {warning}");
        }
    }
}

fn print_window_line(report: &UsageReport) {
    println!(
        "\n  {} → {} (UTC)\n",
        format_ts(report.start_ms),
        format_ts(report.end_ms)
    );
}

fn totals_row(totals: &Totals, opts: TableOptions) -> Vec<Cell> {
    vec![
        styled_cell("TOTAL", opts.accent(), true),
        right_cell(&format_number(totals.rows as u64), opts.accent(), true),
        right_cell(&format_number(totals.tokens), opts.accent(), true),
        right_cell(&format_cost(Some(totals.cost)), opts.money(), true),
    ]
}

pub(crate) fn print_records_table(report: &UsageReport, records: &[&UsageRecord], opts: TableOptions) {
    if records.is_empty() {
        println!("No usage records found for the selected window.");
        return;
    }
    let c = opts.use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Time (UTC)", c),
        header_cell("Kind", c),
        header_cell("Job", c),
        header_cell("Model", c),
        header_cell("Status", c),
        header_cell("Tokens", c),
        header_cell("Cost", c),
    ]);

    for record in records {
        let status_color = match record.status {
            RunStatus::Ok => None,
            RunStatus::Error => opts.failure(),
        };
        table.add_row(vec![
            Cell::new(format_ts(record.ts())),
            Cell::new(record.kind.as_str()),
            Cell::new(job_label(record)),
            Cell::new(&record.model),
            styled_cell(record.status.as_str(), status_color, false),
            right_cell(&format_tokens(record.tokens), None, false),
            right_cell(&format_cost(record.cost), opts.money(), false),
        ]);
    }

    print_window_line(report);
    println!("{table}");

    let totals = totals(records);
    if totals.missing_usage > 0 {
        println!(
            "\n  {} of {} records without usage data\n",
            format_number(totals.missing_usage as u64),
            format_number(totals.rows as u64)
        );
    }
}

pub(crate) fn print_series_table(report: &UsageReport, points: &[SeriesPoint], opts: TableOptions) {
    if points.is_empty() {
        println!("No usage records found for the selected window.");
        return;
    }
    let c = opts.use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Bucket", c),
        header_cell("Runs", c),
        header_cell("Tokens", c),
        header_cell("Cost", c),
    ]);

    let mut total = Totals::default();
    for point in points {
        table.add_row(vec![
            Cell::new(&point.key),
            right_cell(&format_number(point.totals.rows as u64), None, false),
            right_cell(&format_number(point.totals.tokens), None, false),
            right_cell(&format_cost(Some(point.totals.cost)), opts.money(), false),
        ]);
        total.merge(&point.totals);
    }
    table.add_row(totals_row(&total, opts));

    print_window_line(report);
    println!("{table}");
}

pub(crate) fn print_pivot_table(report: &UsageReport, pivot: &Pivot, opts: TableOptions) {
    if pivot.rows.is_empty() {
        println!("No usage records found for the selected window.");
        return;
    }
    let tokens = pivot.metric == Metric::Tokens;
    let c = opts.use_color;
    let mut table = create_styled_table();

    let mut header = vec![header_cell("Job", c), header_cell("Runs", c)];
    header.extend(pivot.models.iter().map(|m| header_cell(m, c)));
    header.push(header_cell("Total", c));
    table.set_header(header);

    for row in &pivot.rows {
        let mut cells = vec![
            Cell::new(&row.job),
            right_cell(&format_number(row.runs as u64), None, false),
        ];
        cells.extend(pivot.models.iter().map(|m| {
            let value = pivot.value(row.by_model.get(m).copied().unwrap_or(0));
            right_cell(&format_metric(value, tokens), None, false)
        }));
        cells.push(right_cell(&format_metric(pivot.value(row.total), tokens), opts.money(), true));
        table.add_row(cells);
    }

    let runs: usize = pivot.rows.iter().map(|r| r.runs).sum();
    let mut footer = vec![
        styled_cell("TOTAL", opts.accent(), true),
        right_cell(&format_number(runs as u64), opts.accent(), true),
    ];
    footer.extend(pivot.models.iter().map(|m| {
        let value = pivot.value(pivot.totals_by_model.get(m).copied().unwrap_or(0));
        right_cell(&format_metric(value, tokens), opts.accent(), true)
    }));
    footer.push(right_cell(&format_metric(pivot.value(pivot.grand_total), tokens), opts.money(), true));
    table.add_row(footer);

    print_window_line(report);
    println!("{table}");
}

pub(crate) fn print_totals_table(report: &UsageReport, totals: &Totals, opts: TableOptions) {
    let c = opts.use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("", c),
        header_cell("Missing usage", c),
        header_cell("Runs", c),
        header_cell("Tokens", c),
        header_cell("Cost", c),
    ]);
    let mut row = totals_row(totals, opts);
    row.insert(1, right_cell(&format_number(totals.missing_usage as u64), None, false));
    table.add_row(row);

    print_window_line(report);
    println!("{table}");
}
