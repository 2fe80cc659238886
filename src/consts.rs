/// UTC day bucket format: "2025-01-15"
pub(crate) const DAY_FORMAT: &str = "%Y-%m-%d";

/// UTC hour bucket format: "2025-01-15T09"
pub(crate) const HOUR_FORMAT: &str = "%Y-%m-%dT%H";

/// Fallback value when a model name or job label is unavailable
pub(crate) const UNKNOWN: &str = "unknown";

/// Text every heartbeat trigger prompt starts with
pub(crate) const HEARTBEAT_PROMPT_START: &str = "Read HEARTBEAT.md if it exists";

/// Window used when no usable start is given
pub(crate) const DEFAULT_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;
