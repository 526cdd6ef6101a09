use icalendar::{Calendar as IcalCalendar, Component, EventLike};

use crate::schedule::TimelineSlot;

/// Export a projected schedule as an iCal string, one VEVENT per entry.
/// Saved entries use their record id as UID; unsaved ones fall back to the
/// draft entry key.
pub fn timeline_to_ical(calendar_name: &str, slots: &[TimelineSlot]) -> String {
    let mut cal = IcalCalendar::new();
    cal.name(calendar_name);

    for slot in slots {
        let uid = match &slot.id {
            Some(id) => id.to_string(),
            None => slot.entry_key.to_string(),
        };

        let mut ical_event = icalendar::Event::new();
        ical_event.summary(&slot.label);
        ical_event.starts(slot.start);
        ical_event.ends(slot.end);
        ical_event.uid(&uid);
        if slot.available == Some(false) {
            ical_event.description("Runner is not available for this slot");
        }

        cal.push(ical_event.done());
    }

    cal.to_string()
}
