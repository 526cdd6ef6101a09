use std::collections::HashMap;

use chrono::{DateTime, Days, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::chain::{EntryKey, ScheduleEntry, ScheduledItem};
use super::duration::duration_delta;
use super::event::{CategoryId, EventInfo, SchedulableCategory};
use super::time_utils::{TimeRange, day_label, split_by_local_day};

/// A schedule entry placed on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entry: ScheduleEntry,
}

impl CalendarSpan {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// How long an entry occupies the calendar: setup plus estimate for a run,
/// the configured length for an interstitial. A run whose category is
/// unknown only takes its setup time.
pub fn entry_duration(
    item: &ScheduledItem,
    categories: &HashMap<CategoryId, SchedulableCategory>,
) -> TimeDelta {
    match item {
        ScheduledItem::Run {
            category_id,
            setup_time,
        } => {
            let estimate = categories
                .get(category_id)
                .map(|c| duration_delta(&c.estimate))
                .unwrap_or_else(TimeDelta::zero);
            duration_delta(setup_time)
                .checked_add(&estimate)
                .unwrap_or(TimeDelta::MAX)
        }
        ScheduledItem::Interstitial { length, .. } => duration_delta(length),
        ScheduledItem::Unassigned { setup_time } => duration_delta(setup_time),
    }
}

/// Display text for an entry, e.g. `"Celeste - Any% (Runner)"`.
pub fn entry_label(
    item: &ScheduledItem,
    categories: &HashMap<CategoryId, SchedulableCategory>,
) -> String {
    match item {
        ScheduledItem::Interstitial { name, .. } if name.is_empty() => {
            "Unnamed interstitial".to_string()
        }
        ScheduledItem::Interstitial { name, .. } => name.clone(),
        ScheduledItem::Run { category_id, .. } => match categories.get(category_id) {
            Some(c) => format!(
                "{} - {} ({})",
                c.game_title,
                c.category_name,
                c.runner.display_name()
            ),
            None => "Unknown run".to_string(),
        },
        ScheduledItem::Unassigned { .. } => "Unknown run".to_string(),
    }
}

/// Lay entries end to end starting at `start`.
pub fn project(
    start: DateTime<Utc>,
    entries: &[ScheduleEntry],
    categories: &HashMap<CategoryId, SchedulableCategory>,
) -> Vec<CalendarSpan> {
    let mut spans = Vec::with_capacity(entries.len());
    let mut cursor = start;

    for entry in entries {
        let end = cursor
            .checked_add_signed(entry_duration(&entry.item, categories))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        spans.push(CalendarSpan {
            start: cursor,
            end,
            entry: entry.clone(),
        });
        cursor = end;
    }

    tracing::debug!("Projected {} schedule entries from {}", spans.len(), start.to_rfc3339());
    spans
}

/// Where the next inserted item would begin: the end of the selected
/// entry's span, or the schedule start when nothing is selected.
pub fn insertion_point_start(
    spans: &[CalendarSpan],
    selected: Option<&EntryKey>,
    schedule_start: DateTime<Utc>,
) -> DateTime<Utc> {
    selected
        .and_then(|key| spans.iter().find(|s| s.entry.key == *key))
        .map(|s| s.end)
        .unwrap_or(schedule_start)
}

/// Labels for each local day the event covers.
pub fn calendar_days(event: &EventInfo) -> Vec<String> {
    let first = event.first_day();
    (0..event.event_days)
        .filter_map(|offset| first.checked_add_days(Days::new(u64::from(offset))))
        .map(day_label)
        .collect()
}

/// The piece of a span that falls on one local day.
#[derive(Debug, Clone, Serialize)]
pub struct DaySpan {
    pub day: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entry_key: EntryKey,
}

/// Bucket spans into local days for a day-column view. A span that crosses
/// midnight shows up on every day it touches. Only the parts inside
/// `window` are bucketed.
pub fn spans_by_day(spans: &[CalendarSpan], window: &TimeRange, tz: &Tz) -> Vec<DaySpan> {
    spans
        .iter()
        .filter_map(|span| {
            let start = span.start.max(window.start);
            let end = span.end.min(window.end);
            (start < end).then(|| (span, TimeRange::new(start, end)))
        })
        .flat_map(|(span, visible)| {
            split_by_local_day(&visible, tz)
                .into_iter()
                .map(move |piece| DaySpan {
                    day: day_label(piece.date),
                    start: piece.range.start,
                    end: piece.range.end,
                    entry_key: span.entry.key,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::event::{EventId, RunStatus, RunnerId, RunnerRef};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, minute, 0).unwrap()
    }

    fn category(id: &str, estimate: &str) -> SchedulableCategory {
        SchedulableCategory {
            id: CategoryId::from(id),
            event_id: EventId::from("evt"),
            game_title: format!("Game {id}"),
            category_name: "Any%".to_string(),
            estimate: estimate.to_string(),
            run_status: RunStatus::Accepted,
            runner: RunnerRef {
                id: RunnerId::from("runner"),
                name: Some("Runner".to_string()),
            },
        }
    }

    fn catalog(categories: Vec<SchedulableCategory>) -> HashMap<CategoryId, SchedulableCategory> {
        categories.into_iter().map(|c| (c.id.clone(), c)).collect()
    }

    fn run(category: &str, setup: &str) -> ScheduleEntry {
        ScheduleEntry::unsaved(ScheduledItem::Run {
            category_id: CategoryId::from(category),
            setup_time: setup.to_string(),
        })
    }

    fn interstitial(name: &str, length: &str) -> ScheduleEntry {
        ScheduleEntry::unsaved(ScheduledItem::Interstitial {
            name: name.to_string(),
            length: length.to_string(),
        })
    }

    #[test]
    fn projects_runs_and_interstitials_end_to_end() {
        let categories = catalog(vec![category("a", "1:30:00"), category("b", "0:45:00")]);
        let entries = vec![
            run("a", "0:10:00"),
            interstitial("Break", "0:15:00"),
            run("b", "0:05:00"),
        ];

        let spans = project(at(9, 0), &entries, &categories);
        let times: Vec<_> = spans.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            times,
            vec![
                (at(9, 0), at(10, 40)),
                (at(10, 40), at(10, 55)),
                (at(10, 55), at(11, 45)),
            ]
        );
    }

    #[test]
    fn spans_are_contiguous_and_sum_to_total() {
        let categories = catalog(vec![category("a", "2:00:00"), category("b", "0:20:30")]);
        let entries = vec![
            run("a", "0:10:00"),
            run("b", "0:00:00"),
            interstitial("Break", "0:07:15"),
            run("a", "0:05:00"),
        ];

        let spans = project(at(0, 0), &entries, &categories);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let total: TimeDelta = entries.iter().map(|e| entry_duration(&e.item, &categories)).sum();
        assert_eq!(spans.last().unwrap().end - spans[0].start, total);
    }

    #[test]
    fn empty_schedule_projects_nothing() {
        assert!(project(at(9, 0), &[], &HashMap::new()).is_empty());
    }

    #[test]
    fn unknown_category_takes_only_setup_time() {
        let spans = project(at(9, 0), &[run("missing", "0:10:00")], &HashMap::new());
        assert_eq!(spans[0].end, at(9, 10));
    }

    #[test]
    fn insertion_point_is_end_of_selected_span() {
        let categories = catalog(vec![category("a", "1:00:00")]);
        let entries = vec![run("a", "0:00:00"), interstitial("Break", "0:30:00")];
        let spans = project(at(9, 0), &entries, &categories);

        assert_eq!(insertion_point_start(&spans, Some(&entries[0].key), at(9, 0)), at(10, 0));
        assert_eq!(insertion_point_start(&spans, Some(&entries[1].key), at(9, 0)), at(10, 30));
        assert_eq!(insertion_point_start(&spans, None, at(9, 0)), at(9, 0));
        assert_eq!(insertion_point_start(&spans, Some(&EntryKey::new()), at(9, 0)), at(9, 0));
    }

    #[test]
    fn labels_describe_entries() {
        let categories = catalog(vec![category("a", "1:00:00")]);
        assert_eq!(entry_label(&run("a", "0:10:00").item, &categories), "Game a - Any% (Runner)");
        assert_eq!(entry_label(&run("zz", "0:10:00").item, &categories), "Unknown run");
        assert_eq!(entry_label(&interstitial("Break", "0:10:00").item, &categories), "Break");
        assert_eq!(entry_label(&interstitial("", "0:10:00").item, &categories), "Unnamed interstitial");
    }

    #[test]
    fn calendar_days_cover_event() {
        let event = EventInfo {
            id: EventId::from("evt"),
            name: "Marathon".to_string(),
            event_start: Utc.with_ymd_and_hms(2025, 1, 30, 12, 0, 0).unwrap(),
            event_days: 3,
            start_hour: 9,
            end_hour: 24,
            timezone: chrono_tz::UTC,
            first_run_id: None,
        };
        assert_eq!(calendar_days(&event), vec!["Jan 30th", "Jan 31st", "Feb 1st"]);
    }

    #[test]
    fn overnight_span_lands_on_both_days() {
        let spans = project(at(22, 0), &[interstitial("Overnight", "4:00:00")], &HashMap::new());
        let window = TimeRange::new(at(0, 0), at(0, 0) + TimeDelta::days(2));
        let by_day = spans_by_day(&spans, &window, &chrono_tz::UTC);
        assert_eq!(by_day.len(), 2);
        assert_eq!(by_day[0].day, "Jan 1st");
        assert_eq!(by_day[1].day, "Jan 2nd");
        assert_eq!(by_day[0].end, by_day[1].start);
        assert_eq!(by_day[0].entry_key, by_day[1].entry_key);
    }

    #[test]
    fn day_buckets_stay_inside_window() {
        let entries = vec![
            interstitial("Intro", "1:00:00"),
            interstitial("Endless", "9999999:00:00"),
            interstitial("Never shown", "1:00:00"),
        ];
        let spans = project(at(9, 0), &entries, &HashMap::new());
        let window = TimeRange::new(at(9, 0), at(9, 0) + TimeDelta::days(1));

        let by_day = spans_by_day(&spans, &window, &chrono_tz::UTC);
        assert_eq!(by_day.len(), 3);
        assert_eq!(by_day[1].start, at(10, 0));
        assert_eq!(by_day[2].end, window.end);
        assert!(by_day.iter().all(|d| d.entry_key != entries[2].key));
    }

    #[test]
    fn unassigned_entries_take_setup_time_only() {
        let entry = ScheduleEntry::unsaved(ScheduledItem::Unassigned {
            setup_time: "0:20:00".to_string(),
        });
        let spans = project(at(9, 0), std::slice::from_ref(&entry), &HashMap::new());
        assert_eq!(spans[0].end, at(9, 20));
        assert_eq!(entry_label(&entry.item, &HashMap::new()), "Unknown run");
    }
}
