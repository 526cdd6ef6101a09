pub mod availability;
pub mod chain;
pub mod draft;
pub mod duration;
pub mod event;
pub mod matcher;
pub mod time_utils;
pub mod timeline;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::RunsheetError;
use availability::Availability;
use chain::{ChainWrite, EntryKey, ScheduledItem, ScheduledRunRecord};
use draft::ScheduleDraft;
use duration::{duration_delta, is_duration_valid};
use event::{CategoryId, EventId, EventInfo, RunId, RunnerId, SchedulableCategory};
use matcher::{UnslottedRun, span_statuses, unslotted_statuses};
use time_utils::TimeRange;
use timeline::{DaySpan, calendar_days, entry_label, insertion_point_start, project, spans_by_day};

/// One projected entry as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineSlot {
    pub entry_key: EntryKey,
    pub id: Option<RunId>,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub item: ScheduledItem,
    /// `None` for interstitials.
    pub available: Option<bool>,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineView {
    pub event_id: EventId,
    pub schedule_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub overruns_event: bool,
    pub insertion_point: DateTime<Utc>,
    pub days: Vec<String>,
    pub slots: Vec<TimelineSlot>,
    pub by_day: Vec<DaySpan>,
}

/// In-memory home for everything the scheduler works on: events, their
/// schedulable categories, runner availability, the persisted chains and
/// the drafts being edited.
#[derive(Debug)]
pub struct ScheduleStore {
    default_timezone: Tz,
    events: HashMap<EventId, EventInfo>,
    categories: HashMap<CategoryId, SchedulableCategory>,
    availability: HashMap<(RunnerId, EventId), Availability>,
    runs: HashMap<RunId, ScheduledRunRecord>,
    drafts: HashMap<EventId, ScheduleDraft>,
}

impl ScheduleStore {
    pub fn new(default_timezone: Tz) -> Self {
        Self {
            default_timezone,
            events: HashMap::new(),
            categories: HashMap::new(),
            availability: HashMap::new(),
            runs: HashMap::new(),
            drafts: HashMap::new(),
        }
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    // -- Events, categories, availability --

    pub fn upsert_event(&mut self, event: EventInfo) -> Result<(), RunsheetError> {
        event.validate()?;
        tracing::info!("Loaded event {} ({})", event.id, event.name);
        self.events.insert(event.id.clone(), event);
        Ok(())
    }

    pub fn event(&self, id: &EventId) -> Result<&EventInfo, RunsheetError> {
        self.events
            .get(id)
            .ok_or_else(|| RunsheetError::EventNotFound(id.to_string()))
    }

    /// Load categories for an event. Categories that are not accepted or
    /// bonus runs are skipped; returns how many were kept.
    pub fn upsert_categories(
        &mut self,
        event_id: &EventId,
        categories: Vec<SchedulableCategory>,
    ) -> Result<usize, RunsheetError> {
        self.event(event_id)?;
        if let Some(stray) = categories.iter().find(|c| c.event_id != *event_id) {
            return Err(RunsheetError::InvalidInput(format!(
                "Category {} belongs to event {}, not {}",
                stray.id, stray.event_id, event_id
            )));
        }
        if let Some(taken) = categories.iter().find_map(|c| {
            self.categories
                .get(&c.id)
                .filter(|existing| existing.event_id != *event_id)
        }) {
            return Err(RunsheetError::InvalidInput(format!(
                "Category id {} is already used by event {}",
                taken.id, taken.event_id
            )));
        }

        let mut kept = 0;
        for category in categories {
            if !category.run_status.is_schedulable() {
                tracing::debug!("Skipping category {} with status {:?}", category.id, category.run_status);
                self.categories.remove(&category.id);
                continue;
            }
            self.categories.insert(category.id.clone(), category);
            kept += 1;
        }
        tracing::info!("Loaded {kept} schedulable categories for event {event_id}");
        Ok(kept)
    }

    pub fn category(&self, id: &CategoryId) -> Result<&SchedulableCategory, RunsheetError> {
        self.categories
            .get(id)
            .ok_or_else(|| RunsheetError::CategoryNotFound(id.to_string()))
    }

    /// Schedulable categories of one event, sorted by id.
    pub fn event_categories(&self, event_id: &EventId) -> Vec<&SchedulableCategory> {
        let mut categories: Vec<_> = self
            .categories
            .values()
            .filter(|c| c.event_id == *event_id)
            .collect();
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        categories
    }

    pub fn set_availability(&mut self, availability: Availability) -> Result<(), RunsheetError> {
        self.event(&availability.event_id)?;
        tracing::info!(
            "Set {} availability slots for runner {} in event {}",
            availability.slots.len(),
            availability.runner_id,
            availability.event_id
        );
        let key = (availability.runner_id.clone(), availability.event_id.clone());
        self.availability.insert(key, availability);
        Ok(())
    }

    pub fn availability(&self, runner_id: &RunnerId, event_id: &EventId) -> Option<&Availability> {
        self.availability
            .get(&(runner_id.clone(), event_id.clone()))
    }

    fn availability_for_category(&self, category: &SchedulableCategory) -> Option<&Availability> {
        self.availability(&category.runner.id, &category.event_id)
    }

    // -- Persisted chain --

    /// Replace an event's persisted chain with records supplied from outside.
    pub fn load_chain(
        &mut self,
        event_id: &EventId,
        first_run_id: Option<RunId>,
        records: Vec<ScheduledRunRecord>,
    ) -> Result<(), RunsheetError> {
        self.event(event_id)?;
        let mut seen = HashSet::new();
        for record in &records {
            if record.event_id != *event_id {
                return Err(RunsheetError::InvalidInput(format!(
                    "Run {} belongs to event {}, not {}",
                    record.id, record.event_id, event_id
                )));
            }
            if !seen.insert(&record.id) {
                return Err(RunsheetError::InvalidInput(format!(
                    "Duplicate run id {}",
                    record.id
                )));
            }
        }
        if let Some(stray) = self
            .runs
            .values()
            .find(|r| r.event_id != *event_id && seen.contains(&r.id))
        {
            return Err(RunsheetError::InvalidInput(format!(
                "Run id {} is already used by event {}",
                stray.id, stray.event_id
            )));
        }

        self.replace_chain(
            event_id,
            ChainWrite {
                first_run_id,
                records,
            },
        );
        Ok(())
    }

    /// Swap in a complete chain. Callers validate first; nothing here can
    /// fail, so readers only ever see the old chain or the new one.
    fn replace_chain(&mut self, event_id: &EventId, write: ChainWrite) {
        let removed = self.runs.len();
        self.runs.retain(|_, r| r.event_id != *event_id);
        let removed = removed - self.runs.len();

        let created = write.records.len();
        for record in write.records {
            self.runs.insert(record.id.clone(), record);
        }
        if let Some(event) = self.events.get_mut(event_id) {
            event.first_run_id = write.first_run_id;
        }
        tracing::info!("Replaced schedule chain for event {event_id}: {removed} removed, {created} created");
    }

    fn event_runs(&self, event_id: &EventId) -> HashMap<RunId, ScheduledRunRecord> {
        self.runs
            .values()
            .filter(|r| r.event_id == *event_id)
            .map(|r| (r.id.clone(), r.clone()))
            .collect()
    }

    /// The persisted chain in list order.
    pub fn persisted_chain(&self, event_id: &EventId) -> Result<ChainWrite, RunsheetError> {
        let event = self.event(event_id)?;
        let runs = self.event_runs(event_id);
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut next = event.first_run_id.as_ref();
        while let Some(record) = next.and_then(|id| runs.get(id)) {
            if !visited.insert(&record.id) {
                break;
            }
            records.push(record.clone());
            next = record.next_run_id.as_ref();
        }
        Ok(ChainWrite {
            first_run_id: event.first_run_id.clone(),
            records,
        })
    }

    // -- Drafts --

    /// Decode the persisted chain into a fresh draft, discarding any draft
    /// already open for the event.
    pub fn open_schedule(&mut self, event_id: &EventId) -> Result<&ScheduleDraft, RunsheetError> {
        let event = self.event(event_id)?;
        let entries = chain::decode(event.first_run_id.as_ref(), &self.event_runs(event_id));
        tracing::info!("Opened schedule for event {event_id} with {} entries", entries.len());
        self.drafts.insert(event_id.clone(), ScheduleDraft::new(entries));
        self.draft(event_id)
    }

    pub fn draft(&self, event_id: &EventId) -> Result<&ScheduleDraft, RunsheetError> {
        self.drafts
            .get(event_id)
            .ok_or_else(|| RunsheetError::ScheduleNotOpen(event_id.to_string()))
    }

    pub fn draft_mut(&mut self, event_id: &EventId) -> Result<&mut ScheduleDraft, RunsheetError> {
        self.drafts
            .get_mut(event_id)
            .ok_or_else(|| RunsheetError::ScheduleNotOpen(event_id.to_string()))
    }

    /// Check that an item may go on this event's schedule. Its setup time or
    /// length must be well formed and no longer than the event itself.
    fn validate_item(&self, event_id: &EventId, item: &ScheduledItem) -> Result<(), RunsheetError> {
        let lead_time = item.lead_time();
        if !is_duration_valid(lead_time) {
            return Err(RunsheetError::InvalidDuration(lead_time.to_string()));
        }
        let event = self.event(event_id)?;
        if duration_delta(lead_time) > event.event_end() - event.schedule_start() {
            return Err(RunsheetError::InvalidDuration(format!(
                "{lead_time} is longer than event {event_id}"
            )));
        }
        match item {
            ScheduledItem::Run { category_id, .. } => {
                let category = self.category(category_id)?;
                if category.event_id != *event_id {
                    return Err(RunsheetError::CategoryNotFound(format!(
                        "{category_id} is not part of event {event_id}"
                    )));
                }
            }
            ScheduledItem::Interstitial { name, .. } => {
                if name.trim().is_empty() {
                    return Err(RunsheetError::InvalidInput(
                        "Interstitial name is required".to_string(),
                    ));
                }
            }
            ScheduledItem::Unassigned { .. } => {}
        }
        Ok(())
    }

    pub fn insert_item(
        &mut self,
        event_id: &EventId,
        item: ScheduledItem,
        before: bool,
    ) -> Result<EntryKey, RunsheetError> {
        self.validate_item(event_id, &item)?;
        let draft = self.draft_mut(event_id)?;
        Ok(draft.insert(item, before))
    }

    /// Write the draft as the event's new chain. Everything is validated
    /// before the old chain is touched, so a rejected save leaves it intact.
    /// The draft is kept either way; on success its entries take the new ids.
    pub fn save_schedule(&mut self, event_id: &EventId) -> Result<ChainWrite, RunsheetError> {
        self.event(event_id)?;
        let draft = self.draft(event_id)?;
        for entry in draft.entries() {
            self.validate_item(event_id, &entry.item)?;
        }

        let write = chain::encode(draft.entries(), event_id, RunId::generate);
        let new_ids: Vec<RunId> = write.records.iter().map(|r| r.id.clone()).collect();

        self.replace_chain(event_id, write.clone());
        let draft = self.draft_mut(event_id)?;
        for (entry, id) in draft.entries_mut().iter_mut().zip(new_ids) {
            entry.id = Some(id);
        }

        Ok(write)
    }

    // -- Projection and matching --

    pub fn timeline(&self, event_id: &EventId) -> Result<TimelineView, RunsheetError> {
        let event = self.event(event_id)?;
        let draft = self.draft(event_id)?;
        let schedule_start = event.schedule_start();
        let event_end = event.event_end();

        let spans = project(schedule_start, draft.entries(), &self.categories);
        let statuses = span_statuses(&spans, &self.categories, |c| {
            self.availability_for_category(c)
        });
        let selected = draft.selected().map(|e| e.key);

        let slots = spans
            .iter()
            .map(|span| TimelineSlot {
                entry_key: span.entry.key,
                id: span.entry.id.clone(),
                label: entry_label(&span.entry.item, &self.categories),
                start: span.start,
                end: span.end,
                item: span.entry.item.clone(),
                available: statuses.get(&span.entry.key).copied(),
                selected: selected == Some(span.entry.key),
            })
            .collect();

        Ok(TimelineView {
            event_id: event_id.clone(),
            schedule_start,
            event_end,
            overruns_event: spans.last().is_some_and(|s| s.end > event_end),
            insertion_point: insertion_point_start(&spans, selected.as_ref(), schedule_start),
            days: calendar_days(event),
            by_day: spans_by_day(&spans, &TimeRange::new(schedule_start, event_end), &event.timezone),
            slots,
        })
    }

    /// Categories of the event not yet in the draft, with their availability
    /// at the current insertion point.
    pub fn unslotted_runs(
        &self,
        event_id: &EventId,
        setup_time: &str,
    ) -> Result<Vec<UnslottedRun>, RunsheetError> {
        let event = self.event(event_id)?;
        let draft = self.draft(event_id)?;
        let schedule_start = event.schedule_start();
        let spans = project(schedule_start, draft.entries(), &self.categories);
        let insertion = insertion_point_start(
            &spans,
            draft.selected().map(|e| &e.key),
            schedule_start,
        );

        let candidates = self
            .event_categories(event_id)
            .into_iter()
            .filter(|c| !draft.contains_category(&c.id));
        Ok(unslotted_statuses(candidates, insertion, setup_time, |c| {
            self.availability_for_category(c)
        }))
    }

    pub fn check_run_availability(
        &self,
        event_id: &EventId,
        category_id: &CategoryId,
        start: DateTime<Utc>,
        setup_time: &str,
    ) -> Result<bool, RunsheetError> {
        self.event(event_id)?;
        let category = self.category(category_id)?;
        Ok(matcher::is_run_available(
            category,
            self.availability(&category.runner.id, event_id),
            start,
            setup_time,
        ))
    }
}
