//! Runner availability: hourly instants folded into contiguous segments.
//!
//! Instants are stored in UTC, each meaning "available for the hour that
//! starts here". Segments are derived on demand and never stored.

use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::event::{EventId, RunnerId};
use super::time_utils::{TimeRange, day_label, split_by_local_day};
use crate::error::RunsheetError;

/// A runner's availability for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub runner_id: RunnerId,
    pub event_id: EventId,
    pub slots: Vec<DateTime<Utc>>,
}

impl Availability {
    /// Build a record, rejecting instants that are not on the hour.
    pub fn new(
        runner_id: RunnerId,
        event_id: EventId,
        slots: Vec<DateTime<Utc>>,
    ) -> Result<Self, RunsheetError> {
        if let Some(bad) = slots.iter().find(|s| !is_hour_aligned(s)) {
            return Err(RunsheetError::InvalidTimestamp(format!(
                "Availability slot {} is not on the hour",
                bad.to_rfc3339()
            )));
        }
        Ok(Self {
            runner_id,
            event_id,
            slots,
        })
    }

    pub fn segments(&self) -> Vec<TimeRange> {
        build_segments(&self.slots)
    }

    pub fn day_segments(&self, tz: &Tz) -> Vec<DaySegment> {
        day_segments(&self.segments(), tz)
    }
}

fn is_hour_aligned(instant: &DateTime<Utc>) -> bool {
    instant.minute() == 0 && instant.second() == 0 && instant.nanosecond() == 0
}

/// An availability segment as shown on a day-column calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DaySegment {
    pub date: NaiveDate,
    /// e.g. `"Jan 5th"`
    pub label: String,
    /// Local hour the segment starts, 0-23.
    pub start_hour: u32,
    /// Local hour the segment ends, 1-24. 24 means it runs to midnight.
    pub end_hour: u32,
}

/// Fold hourly instants into maximal contiguous segments.
///
/// The result is sorted, duplicates are ignored and no two segments touch.
/// Each segment ends one hour after its last instant.
pub fn build_segments(instants: &[DateTime<Utc>]) -> Vec<TimeRange> {
    let mut sorted = instants.to_vec();
    sorted.sort();
    sorted.dedup();

    let hour = TimeDelta::hours(1);
    let mut segments: Vec<TimeRange> = Vec::new();
    for instant in sorted {
        match segments.last_mut() {
            Some(current) if current.end == instant => current.end = instant + hour,
            _ => segments.push(TimeRange::new(instant, instant + hour)),
        }
    }
    segments
}

/// Display form of `segments` in `tz`, one entry per local date a segment
/// touches. A segment running past local midnight is split there, the
/// earlier piece ending at hour 24.
pub fn day_segments(segments: &[TimeRange], tz: &Tz) -> Vec<DaySegment> {
    segments
        .iter()
        .flat_map(|segment| split_by_local_day(segment, tz))
        .map(|piece| DaySegment {
            date: piece.date,
            label: day_label(piece.date),
            start_hour: piece.range.start.with_timezone(tz).hour(),
            end_hour: if piece.reaches_midnight {
                24
            } else {
                piece.range.end.with_timezone(tz).hour()
            },
        })
        .collect()
}
