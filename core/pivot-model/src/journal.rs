//! FILENAME: core/pivot-model/src/journal.rs
//! Edit Journal - the diff against the last full reset.
//!
//! For every key touched since the reset the journal keeps the ORIGINAL
//! value only, never intermediate ones, so that any sequence of edits,
//! deletes and re-adds reduces to a minimal diff:
//! - `edited[key] = Some(v)`: the key held `v` at reset and now holds
//!   something else.
//! - `edited[key] = None`: the key did not exist at reset.
//! - `deleted[key] = v`: the key held `v` at reset and is now gone.
//!
//! The journal never touches the value store itself; the engine reports
//! the store's state before each mutation.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::value::{CellValue, Key};

#[derive(Debug, Clone, Default)]
pub struct EditJournal {
    edited: FxHashMap<Key, Option<CellValue>>,
    deleted: FxHashMap<Key, CellValue>,
}

/// What changed since the last reset, ready for a store synchronizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    /// Keys that did not exist at reset, with their current value.
    pub additions: Vec<(Key, CellValue)>,
    /// Keys whose value changed: (key, current value, original value).
    pub updates: Vec<(Key, CellValue, CellValue)>,
    /// Keys that were removed, with their original value.
    pub deletions: Vec<(Key, CellValue)>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.updates.is_empty() && self.deletions.is_empty()
    }
}

impl EditJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.edited.clear();
        self.deleted.clear();
    }

    pub fn is_clean(&self) -> bool {
        self.edited.is_empty() && self.deleted.is_empty()
    }

    /// Original value of an edited key. `Some(None)` means the key is new.
    pub fn edited(&self, key: &Key) -> Option<&Option<CellValue>> {
        self.edited.get(key)
    }

    pub fn deleted(&self, key: &Key) -> Option<&CellValue> {
        self.deleted.get(key)
    }

    pub fn edited_len(&self) -> usize {
        self.edited.len()
    }

    pub fn deleted_len(&self) -> usize {
        self.deleted.len()
    }

    /// Records that `key` is about to hold `new`. `prior` is its current
    /// value in the store.
    pub fn record_write(&mut self, key: &Key, prior: Option<&CellValue>, new: &CellValue) {
        if let Some(original) = self.deleted.remove(key) {
            if original != *new {
                self.edited.insert(key.clone(), Some(original));
            }
            return;
        }
        match self.edited.get(key) {
            Some(original) => {
                // Writing the original back cancels the edit.
                if original.as_ref() == Some(new) {
                    self.edited.remove(key);
                }
            }
            None => {
                if prior != Some(new) {
                    self.edited.insert(key.clone(), prior.cloned());
                }
            }
        }
    }

    /// Records that `key` is about to be removed. `current` is its value in
    /// the store.
    pub fn record_delete(&mut self, key: &Key, current: Option<&CellValue>) {
        if let Some(original) = self.edited.remove(key) {
            if let Some(original) = original {
                self.deleted.insert(key.clone(), original);
            }
        } else if let Some(current) = current {
            self.deleted.insert(key.clone(), current.clone());
        }
    }

    /// Drops every entry for `key`, e.g. when the backing store removed it.
    pub fn forget(&mut self, key: &Key) {
        self.edited.remove(key);
        self.deleted.remove(key);
    }

    /// Keeps only entries whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Key) -> bool) {
        self.edited.retain(|key, _| keep(key));
        self.deleted.retain(|key, _| keep(key));
    }

    /// Builds the diff, looking current values up in `store`.
    pub fn changes(&self, store: &FxHashMap<Key, CellValue>) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (key, original) in &self.edited {
            let Some(current) = store.get(key) else {
                continue;
            };
            match original {
                None => changes.additions.push((key.clone(), current.clone())),
                Some(original) => {
                    changes
                        .updates
                        .push((key.clone(), current.clone(), original.clone()))
                }
            }
        }
        changes
            .deletions
            .extend(self.deleted.iter().map(|(k, v)| (k.clone(), v.clone())));

        changes.additions.sort_by(|a, b| a.0.cmp(&b.0));
        changes.updates.sort_by(|a, b| a.0.cmp(&b.0));
        changes.deletions.sort_by(|a, b| a.0.cmp(&b.0));
        changes
    }
}
