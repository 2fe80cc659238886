//! Field-alias resolution for raw usage blocks
//!
//! Producers have renamed the cost and token fields over time. Each amount is
//! resolved by trying an ordered list of extractors and keeping the first
//! finite, non-negative result.

use serde_json::Value;

use crate::consts::UNKNOWN;
use crate::core::types::UsageAmounts;

type Extractor = fn(&Value) -> Option<f64>;

const TOKEN_EXTRACTORS: &[Extractor] = &[total_tokens, total, tokens, input_plus_output];

const COST_EXTRACTORS: &[Extractor] = &[nested_cost_total, cost_total, flat_cost];

/// Read a numeric field, accepting numbers and numeric strings
fn field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn total_tokens(usage: &Value) -> Option<f64> {
    field(usage, "totalTokens")
}

fn total(usage: &Value) -> Option<f64> {
    field(usage, "total")
}

fn tokens(usage: &Value) -> Option<f64> {
    field(usage, "tokens")
}

fn input_plus_output(usage: &Value) -> Option<f64> {
    Some(field(usage, "input")? + field(usage, "output")?)
}

fn nested_cost_total(usage: &Value) -> Option<f64> {
    field(usage.get("cost")?, "total")
}

fn cost_total(usage: &Value) -> Option<f64> {
    field(usage, "costTotal")
}

fn flat_cost(usage: &Value) -> Option<f64> {
    field(usage, "cost")
}

fn first_amount(usage: &Value, extractors: &[Extractor]) -> Option<f64> {
    extractors
        .iter()
        .filter_map(|extract| extract(usage))
        .find(|v| v.is_finite() && *v >= 0.0)
}

pub(crate) fn resolve_tokens(usage: &Value) -> Option<u64> {
    first_amount(usage, TOKEN_EXTRACTORS).map(|v| v.round() as u64)
}

pub(crate) fn resolve_cost(usage: &Value) -> Option<f64> {
    first_amount(usage, COST_EXTRACTORS)
}

pub(crate) fn resolve_usage(usage: &Value) -> UsageAmounts {
    UsageAmounts {
        cost: resolve_cost(usage),
        tokens: resolve_tokens(usage),
    }
}

/// First non-empty model name among the candidates, in order
pub(crate) fn resolve_model<'a, I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}
