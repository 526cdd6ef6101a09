//! Checks whether a run fits inside its runner's declared availability.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::availability::Availability;
use super::chain::{EntryKey, ScheduledItem};
use super::duration::{duration_delta, is_duration_valid};
use super::event::{CategoryId, SchedulableCategory};
use super::time_utils::TimeRange;
use super::timeline::CalendarSpan;

/// The interval a run would occupy if it started at `start`.
pub fn run_interval(
    category: &SchedulableCategory,
    start: DateTime<Utc>,
    setup_time: &str,
) -> TimeRange {
    let length = duration_delta(setup_time)
        .checked_add(&duration_delta(&category.estimate))
        .unwrap_or(TimeDelta::MAX);
    let end = start
        .checked_add_signed(length)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    TimeRange::new(start, end)
}

/// True when the run, started at `start` after `setup_time`, fits strictly
/// inside a single availability segment. Runs touching a segment boundary
/// do not fit, and a runner with no availability never does.
pub fn is_run_available(
    category: &SchedulableCategory,
    availability: Option<&Availability>,
    start: DateTime<Utc>,
    setup_time: &str,
) -> bool {
    let Some(availability) = availability else {
        return false;
    };
    let run = run_interval(category, start, setup_time);
    availability
        .segments()
        .iter()
        .any(|segment| segment.strictly_contains(&run))
}

/// Availability of every scheduled run, keyed by entry. Interstitials are
/// not included.
pub fn span_statuses<'a>(
    spans: &[CalendarSpan],
    categories: &HashMap<CategoryId, SchedulableCategory>,
    availability_for: impl Fn(&SchedulableCategory) -> Option<&'a Availability>,
) -> HashMap<EntryKey, bool> {
    spans
        .iter()
        .filter_map(|span| {
            let ScheduledItem::Run {
                category_id,
                setup_time,
            } = &span.entry.item
            else {
                return None;
            };
            let available = categories.get(category_id).is_some_and(|category| {
                is_run_available(category, availability_for(category), span.start, setup_time)
            });
            Some((span.entry.key, available))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct UnslottedRun {
    pub category: SchedulableCategory,
    pub available: bool,
}

/// Categories not yet on the schedule, each checked as if it were inserted
/// at `insertion_start` with `setup_time`. An invalid setup time marks every
/// candidate unavailable.
pub fn unslotted_statuses<'a>(
    candidates: impl IntoIterator<Item = &'a SchedulableCategory>,
    insertion_start: DateTime<Utc>,
    setup_time: &str,
    availability_for: impl Fn(&SchedulableCategory) -> Option<&'a Availability>,
) -> Vec<UnslottedRun> {
    let setup_valid = is_duration_valid(setup_time);
    candidates
        .into_iter()
        .map(|category| UnslottedRun {
            category: category.clone(),
            available: setup_valid
                && is_run_available(
                    category,
                    availability_for(category),
                    insertion_start,
                    setup_time,
                ),
        })
        .collect()
}
