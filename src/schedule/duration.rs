//! `H:MM:SS` durations as they appear in estimates, setup times and
//! interstitial lengths.
//!
//! Parsing is lenient and never fails; [`is_duration_valid`] is the strict
//! gate applied before a value is accepted into a schedule.

use std::sync::OnceLock;

use chrono::TimeDelta;
use regex::Regex;

const DURATION_PATTERN: &str = r"^(?:(?:([0-9]*?\d|2[0-9]):)?([0-5]\d):)([0-5]\d)$";

fn duration_regex() -> &'static Regex {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    DURATION_RE.get_or_init(|| Regex::new(DURATION_PATTERN).expect("duration pattern compiles"))
}

/// Parse `H:MM:SS`, `M:SS` or a bare number of seconds into total seconds.
///
/// Unparseable fields count as zero, decimal fields are truncated and a
/// negative total is clamped to zero. Minutes and seconds are not range
/// checked here.
pub fn parse_duration(text: &str) -> i64 {
    let parts: Vec<i64> = text.split(':').map(parse_field).collect();

    let total = match parts.as_slice() {
        [hours, minutes, seconds] => hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(*seconds),
        [minutes, seconds] => minutes.saturating_mul(60).saturating_add(*seconds),
        [first, ..] => *first,
        [] => 0,
    };

    total.max(0)
}

fn parse_field(field: &str) -> i64 {
    let field = field.trim();
    if let Ok(n) = field.parse::<i64>() {
        return n;
    }
    match field.parse::<f64>() {
        // `as` saturates at the i64 bounds
        Ok(n) if n.is_finite() => n.trunc() as i64,
        _ => 0,
    }
}

/// Format seconds as `H:MM:SS`. Hours are unpadded and unbounded.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Strict check: optional hours, then `MM:SS` with both fields in 00-59.
pub fn is_duration_valid(text: &str) -> bool {
    duration_regex().is_match(text)
}

/// [`parse_duration`] as a `TimeDelta`, capped at `TimeDelta::MAX`.
pub fn duration_delta(text: &str) -> TimeDelta {
    TimeDelta::try_seconds(parse_duration(text)).unwrap_or(TimeDelta::MAX)
}
