//! The persisted schedule: one record per item, ordered by `next_run_id`
//! pointers starting from the event's `first_run_id`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{CategoryId, EventId, RunId};

/// Session-local handle for a draft entry. Unsaved entries have no
/// [`RunId`] yet, so selection and removal go through this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryKey(pub Uuid);

impl EntryKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduledItem {
    Run {
        category_id: CategoryId,
        setup_time: String,
    },
    Interstitial {
        name: String,
        length: String,
    },
    /// A persisted run whose category is gone. Kept so a save writes it back;
    /// it only takes up its setup time.
    Unassigned {
        setup_time: String,
    },
}

impl ScheduledItem {
    pub fn category_id(&self) -> Option<&CategoryId> {
        match self {
            ScheduledItem::Run { category_id, .. } => Some(category_id),
            ScheduledItem::Interstitial { .. } | ScheduledItem::Unassigned { .. } => None,
        }
    }

    /// The run's setup time, or the interstitial's length.
    pub fn lead_time(&self) -> &str {
        match self {
            ScheduledItem::Run { setup_time, .. } | ScheduledItem::Unassigned { setup_time } => {
                setup_time
            }
            ScheduledItem::Interstitial { length, .. } => length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub key: EntryKey,
    /// Persisted record id; `None` until the schedule is saved.
    pub id: Option<RunId>,
    pub item: ScheduledItem,
}

impl ScheduleEntry {
    pub fn unsaved(item: ScheduledItem) -> Self {
        Self {
            key: EntryKey::new(),
            id: None,
            item,
        }
    }
}

/// Wire and storage shape of one chain record. Interstitials keep their
/// length in `setup_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRunRecord {
    pub id: RunId,
    pub event_id: EventId,
    pub category_id: Option<CategoryId>,
    pub is_interstitial: bool,
    pub interstitial_name: Option<String>,
    pub setup_time: String,
    pub next_run_id: Option<RunId>,
}

impl ScheduledRunRecord {
    pub fn to_item(&self) -> ScheduledItem {
        if self.is_interstitial {
            return ScheduledItem::Interstitial {
                name: self.interstitial_name.clone().unwrap_or_default(),
                length: self.setup_time.clone(),
            };
        }
        match &self.category_id {
            Some(category_id) => ScheduledItem::Run {
                category_id: category_id.clone(),
                setup_time: self.setup_time.clone(),
            },
            None => ScheduledItem::Unassigned {
                setup_time: self.setup_time.clone(),
            },
        }
    }

    fn from_item(id: RunId, event_id: EventId, item: &ScheduledItem) -> Self {
        match item {
            ScheduledItem::Run {
                category_id,
                setup_time,
            } => Self {
                id,
                event_id,
                category_id: Some(category_id.clone()),
                is_interstitial: false,
                interstitial_name: None,
                setup_time: setup_time.clone(),
                next_run_id: None,
            },
            ScheduledItem::Interstitial { name, length } => Self {
                id,
                event_id,
                category_id: None,
                is_interstitial: true,
                interstitial_name: Some(name.clone()),
                setup_time: length.clone(),
                next_run_id: None,
            },
            ScheduledItem::Unassigned { setup_time } => Self {
                id,
                event_id,
                category_id: None,
                is_interstitial: false,
                interstitial_name: None,
                setup_time: setup_time.clone(),
                next_run_id: None,
            },
        }
    }
}

/// A complete replacement chain for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainWrite {
    pub first_run_id: Option<RunId>,
    pub records: Vec<ScheduledRunRecord>,
}

/// Walk the chain from `first` into an ordered list of entries.
///
/// A missing record or a revisited id ends the list instead of failing, so
/// traversal takes at most one step per record.
pub fn decode(
    first: Option<&RunId>,
    records: &HashMap<RunId, ScheduledRunRecord>,
) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();
    let mut visited: HashSet<&RunId> = HashSet::new();
    let mut next = first;

    while let Some(id) = next {
        let Some(record) = records.get(id) else {
            tracing::warn!("Schedule chain points at missing run {id}; truncating");
            break;
        };
        if !visited.insert(id) {
            tracing::warn!("Schedule chain revisits run {id}; truncating");
            break;
        }

        let item = record.to_item();
        if matches!(item, ScheduledItem::Unassigned { .. }) {
            tracing::warn!("Run {id} has no category; keeping it as an unknown run");
        }
        entries.push(ScheduleEntry {
            key: EntryKey::new(),
            id: Some(record.id.clone()),
            item,
        });

        next = record.next_run_id.as_ref();
    }

    entries
}

/// Encode entries as a fresh chain. Every record gets a new id from
/// `next_id`, then each is linked to its successor.
pub fn encode(
    entries: &[ScheduleEntry],
    event_id: &EventId,
    mut next_id: impl FnMut() -> RunId,
) -> ChainWrite {
    let mut records: Vec<ScheduledRunRecord> = entries
        .iter()
        .map(|entry| ScheduledRunRecord::from_item(next_id(), event_id.clone(), &entry.item))
        .collect();

    let ids: Vec<RunId> = records.iter().map(|r| r.id.clone()).collect();
    for (record, next) in records.iter_mut().zip(ids.iter().skip(1)) {
        record.next_run_id = Some(next.clone());
    }

    ChainWrite {
        first_run_id: ids.first().cloned(),
        records,
    }
}
