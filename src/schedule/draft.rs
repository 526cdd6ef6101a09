use serde::Serialize;

use super::chain::{EntryKey, ScheduleEntry, ScheduledItem};
use super::event::CategoryId;
use crate::error::RunsheetError;

/// An event's schedule while it is being edited: the ordered entries plus
/// the selected insertion point.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleDraft {
    entries: Vec<ScheduleEntry>,
    selected: Option<EntryKey>,
}

impl ScheduleDraft {
    /// Start editing `entries`, with the last entry selected.
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        let selected = entries.last().map(|e| e.key);
        Self { entries, selected }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ScheduleEntry] {
        &mut self.entries
    }

    pub fn selected(&self) -> Option<&ScheduleEntry> {
        self.selected.and_then(|key| self.get(&key))
    }

    pub fn get(&self, key: &EntryKey) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.key == *key)
    }

    fn position(&self, key: &EntryKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == *key)
    }

    pub fn select(&mut self, key: EntryKey) -> Result<(), RunsheetError> {
        if self.position(&key).is_none() {
            return Err(RunsheetError::EntryNotFound(key.to_string()));
        }
        self.selected = Some(key);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Splice `item` in next to the selected entry, or at the front when
    /// nothing is selected. The new entry becomes the selection.
    pub fn insert(&mut self, item: ScheduledItem, before: bool) -> EntryKey {
        let entry = ScheduleEntry::unsaved(item);
        let key = entry.key;

        let index = match self.selected.and_then(|k| self.position(&k)) {
            Some(anchor) if before => anchor,
            Some(anchor) => anchor + 1,
            None => 0,
        };
        self.entries.insert(index, entry);
        self.selected = Some(key);
        key
    }

    /// Remove an entry. If it was selected, the selection moves to the entry
    /// that took its place, else to the new last entry, else to nothing.
    pub fn remove(&mut self, key: &EntryKey) -> Result<ScheduleEntry, RunsheetError> {
        let index = self
            .position(key)
            .ok_or_else(|| RunsheetError::EntryNotFound(key.to_string()))?;
        let removed = self.entries.remove(index);

        if self.selected == Some(*key) {
            self.selected = self
                .entries
                .get(index)
                .or_else(|| self.entries.last())
                .map(|e| e.key);
        }

        Ok(removed)
    }

    /// Remove the selected entry; `None` when nothing is selected.
    pub fn remove_selected(&mut self) -> Option<ScheduleEntry> {
        let key = self.selected?;
        self.remove(&key).ok()
    }

    pub fn contains_category(&self, category_id: &CategoryId) -> bool {
        self.entries
            .iter()
            .any(|e| e.item.category_id() == Some(category_id))
    }
}
