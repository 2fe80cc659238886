use clap::ValueEnum;

use crate::consts::DEFAULT_WINDOW_MS;
use crate::core::TimeWindow;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Window presets relative to the window end
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RangePreset {
    #[value(name = "24h")]
    Day,
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
}

impl RangePreset {
    pub(crate) fn duration_ms(self) -> i64 {
        match self {
            RangePreset::Day => 24 * HOUR_MS,
            RangePreset::Week => 7 * 24 * HOUR_MS,
            RangePreset::Month => 30 * 24 * HOUR_MS,
        }
    }
}

/// Epoch milliseconds from a raw argument; `None` when absent or not a finite number
pub(crate) fn parse_ms(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let n: f64 = value.parse().ok()?;
    n.is_finite().then(|| n.trunc() as i64)
}

/// Resolve the report window.
///
/// End falls back to `now`. Start falls back to `end - preset` when a preset
/// is given, else to `now - 7 days`.
pub(crate) fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    last: Option<RangePreset>,
    now_ms: i64,
) -> TimeWindow {
    let end_ms = parse_ms(end).unwrap_or(now_ms);
    let start_ms = parse_ms(start).unwrap_or_else(|| match last {
        Some(preset) => end_ms.saturating_sub(preset.duration_ms()),
        None => now_ms.saturating_sub(DEFAULT_WINDOW_MS),
    });
    TimeWindow::new(start_ms, end_ms)
}
