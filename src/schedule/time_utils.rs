use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::event::local_hour_to_utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start <= end, "TimeRange start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// True when `other` lies strictly inside this range: it starts after
    /// this range starts and ends before it ends. Touching either boundary
    /// does not count.
    pub fn strictly_contains(&self, other: &TimeRange) -> bool {
        self.start < other.start && other.end < self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// One local-day piece of a range that was split at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPiece {
    pub date: NaiveDate,
    pub range: TimeRange,
    /// Whether the piece runs up to the following local midnight.
    pub reaches_midnight: bool,
}

/// Split a range into per-local-day pieces in `tz`. A range that crosses
/// local midnight yields one piece per date it touches.
pub fn split_by_local_day(range: &TimeRange, tz: &Tz) -> Vec<DayPiece> {
    let mut pieces = Vec::new();
    let mut cursor = range.start;

    while cursor < range.end {
        let date = cursor.with_timezone(tz).date_naive();
        let next_midnight = next_day_start(date, tz).filter(|m| *m > cursor);
        let (piece_end, reaches_midnight) = match next_midnight {
            Some(midnight) if midnight <= range.end => (midnight, true),
            _ => (range.end, false),
        };
        pieces.push(DayPiece {
            date,
            range: TimeRange::new(cursor, piece_end),
            reaches_midnight,
        });
        cursor = piece_end;
    }

    pieces
}

/// First instant of the local day after `date`. Where a DST change skips
/// midnight, the day starts at its first hour that exists.
fn next_day_start(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let next = date.succ_opt()?;
    (0..24).find_map(|hour| local_hour_to_utc(next, hour, tz))
}

/// `"Jan 5th"`-style label for a calendar date.
pub fn day_label(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{} {day}{suffix}", date.format("%b"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    // -- TimeRange::strictly_contains --

    #[test]
    fn strictly_inside_is_contained() {
        let outer = TimeRange::new(utc(2025, 1, 1, 8), utc(2025, 1, 1, 17));
        let inner = TimeRange::new(utc(2025, 1, 1, 10), utc(2025, 1, 1, 12));
        assert!(outer.strictly_contains(&inner));
        assert!(!inner.strictly_contains(&outer));
    }

    #[test]
    fn touching_boundaries_are_not_contained() {
        let outer = TimeRange::new(utc(2025, 1, 1, 8), utc(2025, 1, 1, 17));
        let same_start = TimeRange::new(utc(2025, 1, 1, 8), utc(2025, 1, 1, 12));
        let same_end = TimeRange::new(utc(2025, 1, 1, 10), utc(2025, 1, 1, 17));
        assert!(!outer.strictly_contains(&same_start));
        assert!(!outer.strictly_contains(&same_end));
        assert!(!outer.strictly_contains(&outer));
    }

    #[test]
    fn partially_overlapping_is_not_contained() {
        let outer = TimeRange::new(utc(2025, 1, 1, 8), utc(2025, 1, 1, 12));
        let other = TimeRange::new(utc(2025, 1, 1, 10), utc(2025, 1, 1, 14));
        assert!(!outer.strictly_contains(&other));
    }

    // -- split_by_local_day --

    #[test]
    fn range_within_one_day_is_a_single_piece() {
        let range = TimeRange::new(utc(2025, 1, 1, 9), utc(2025, 1, 1, 11));
        let pieces = split_by_local_day(&range, &chrono_tz::UTC);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].date, date(2025, 1, 1));
        assert_eq!(pieces[0].range, range);
        assert!(!pieces[0].reaches_midnight);
    }

    #[test]
    fn range_crossing_midnight_splits() {
        let range = TimeRange::new(utc(2025, 1, 1, 22), utc(2025, 1, 2, 2));
        let pieces = split_by_local_day(&range, &chrono_tz::UTC);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].date, date(2025, 1, 1));
        assert_eq!(pieces[0].range, TimeRange::new(utc(2025, 1, 1, 22), utc(2025, 1, 2, 0)));
        assert!(pieces[0].reaches_midnight);
        assert_eq!(pieces[1].date, date(2025, 1, 2));
        assert_eq!(pieces[1].range, TimeRange::new(utc(2025, 1, 2, 0), utc(2025, 1, 2, 2)));
    }

    #[test]
    fn split_follows_the_display_zone() {
        // 03:00-06:00 UTC is 22:00-01:00 in New York (UTC-5)
        let range = TimeRange::new(utc(2025, 1, 2, 3), utc(2025, 1, 2, 6));
        let pieces = split_by_local_day(&range, &chrono_tz::America::New_York);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].date, date(2025, 1, 1));
        assert_eq!(pieces[0].range.end, utc(2025, 1, 2, 5));
        assert_eq!(pieces[1].date, date(2025, 1, 2));
    }

    #[test]
    fn range_ending_at_midnight_stays_on_its_day() {
        let range = TimeRange::new(utc(2025, 1, 1, 20), utc(2025, 1, 2, 0));
        let pieces = split_by_local_day(&range, &chrono_tz::UTC);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].reaches_midnight);
    }

    #[test]
    fn multi_day_range_yields_piece_per_day() {
        let range = TimeRange::new(utc(2025, 1, 1, 12), utc(2025, 1, 3, 12));
        let pieces = split_by_local_day(&range, &chrono_tz::UTC);
        let dates: Vec<_> = pieces.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)]);
        let total: TimeDelta = pieces.iter().map(|p| p.range.duration()).sum();
        assert_eq!(total, range.duration());
    }

    #[test]
    fn split_handles_skipped_local_midnight() {
        // Chile starts DST on 2024-09-08 at 00:00 local (04:00 UTC), jumping
        // straight to 01:00
        let tz = chrono_tz::America::Santiago;
        let range = TimeRange::new(utc(2024, 9, 8, 2), utc(2024, 9, 8, 6));
        let pieces = split_by_local_day(&range, &tz);

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].date, date(2024, 9, 7));
        assert_eq!(pieces[0].range.end, utc(2024, 9, 8, 4));
        assert!(pieces[0].reaches_midnight);
        assert_eq!(pieces[1].date, date(2024, 9, 8));
        assert_eq!(pieces[1].range, TimeRange::new(utc(2024, 9, 8, 4), utc(2024, 9, 8, 6)));
    }

    // -- day_label --

    #[test]
    fn day_labels_use_ordinals() {
        assert_eq!(day_label(date(2025, 1, 1)), "Jan 1st");
        assert_eq!(day_label(date(2025, 1, 2)), "Jan 2nd");
        assert_eq!(day_label(date(2025, 1, 3)), "Jan 3rd");
        assert_eq!(day_label(date(2025, 1, 11)), "Jan 11th");
        assert_eq!(day_label(date(2025, 1, 12)), "Jan 12th");
        assert_eq!(day_label(date(2025, 1, 22)), "Jan 22nd");
        assert_eq!(day_label(date(2025, 3, 31)), "Mar 31st");
    }
}
