use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::core::{Bucket, Metric, Pivot, SeriesPoint, Totals, UsageRecord, UsageReport};
use crate::error::AppError;

/// Report envelope with the filtered records
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordsEnvelope<'a> {
    start_ms: i64,
    end_ms: i64,
    records: &'a [&'a UsageRecord],
    warnings: &'a [String],
}

pub(crate) fn output_records_json(
    report: &UsageReport,
    records: &[&UsageRecord],
) -> Result<String, AppError> {
    let envelope = RecordsEnvelope {
        start_ms: report.start_ms,
        end_ms: report.end_ms,
        records,
        warnings: &report.warnings,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

fn totals_value(totals: &Totals) -> Value {
    json!({
        "cost": totals.cost,
        "tokens": totals.tokens,
        "rows": totals.rows,
        "missingUsage": totals.missing_usage,
    })
}

pub(crate) fn output_totals_json(report: &UsageReport, totals: &Totals) -> Result<String, AppError> {
    let output = json!({
        "startMs": report.start_ms,
        "endMs": report.end_ms,
        "totals": totals_value(totals),
        "warnings": report.warnings,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

pub(crate) fn output_series_json(
    report: &UsageReport,
    bucket: Bucket,
    points: &[SeriesPoint],
) -> Result<String, AppError> {
    let bucket = match bucket {
        Bucket::Hour => "hour",
        Bucket::Day | Bucket::Auto => "day",
    };
    let points: Vec<Value> = points
        .iter()
        .map(|p| {
            let mut value = totals_value(&p.totals);
            value["key"] = json!(p.key);
            value
        })
        .collect();
    let output = json!({
        "startMs": report.start_ms,
        "endMs": report.end_ms,
        "bucket": bucket,
        "points": points,
        "warnings": report.warnings,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn pivot_cells(pivot: &Pivot, cells: &BTreeMap<String, i128>) -> BTreeMap<String, f64> {
    cells
        .iter()
        .map(|(model, units)| (model.clone(), pivot.value(*units)))
        .collect()
}

pub(crate) fn output_pivot_json(report: &UsageReport, pivot: &Pivot) -> Result<String, AppError> {
    let metric = match pivot.metric {
        Metric::Cost => "cost",
        Metric::Tokens => "tokens",
    };
    let rows: Vec<Value> = pivot
        .rows
        .iter()
        .map(|row| {
            json!({
                "job": row.job,
                "runs": row.runs,
                "byModel": pivot_cells(pivot, &row.by_model),
                "total": pivot.value(row.total),
            })
        })
        .collect();
    let output = json!({
        "startMs": report.start_ms,
        "endMs": report.end_ms,
        "metric": metric,
        "models": pivot.models,
        "rows": rows,
        "totalsByModel": pivot_cells(pivot, &pivot.totals_by_model),
        "grandTotal": pivot.value(pivot.grand_total),
        "warnings": report.warnings,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}
