//! Purpose: Cache result JSON records as two synchronized projections.
//! Exports: `ResultJsonStore`, `LoadSummary`.
//! Role: Session-side store fed by GraphQL query data and read by callers.
//! Invariants: The object list is always the element-wise parse of the string list.
//! Invariants: Both lists are absent (`None`) until loaded and are cleared together.
//! Invariants: Derivation runs before any mutation, so a parse failure changes nothing.
//! Notes: Lookups are linear scans in insertion order; lists are small.

use serde_json::Value;
use tracing::{debug, trace};

use super::error::Error;
use super::record::{
    EMPTY_JSON, Keyed, Keys, QueryDataEntry, ResultJsonObjectRecord, ResultJsonRecord,
    ValidatedEntry,
};

#[derive(Clone, Debug, Default)]
pub struct ResultJsonStore {
    strings: Option<Vec<ResultJsonRecord>>,
    objects: Option<Vec<ResultJsonObjectRecord>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LoadSummary {
    pub records: usize,
    pub placeholders: usize,
}

impl ResultJsonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces both lists from GraphQL query data. Malformed entries become
    /// empty placeholder records with a freshly generated key.
    pub fn load_from_query_data(
        &mut self,
        entries: Vec<QueryDataEntry>,
    ) -> Result<LoadSummary, Error> {
        let mut placeholders = 0;
        let mut strings = Vec::with_capacity(entries.len());
        for entry in entries {
            let validated = entry.validate();
            if let ValidatedEntry::Placeholder(reason) = &validated {
                placeholders += 1;
                debug!(reason = reason.as_str(), "substituting placeholder result json");
            }
            strings.push(validated.into_record());
        }
        let records = strings.len();
        self.load_from_matched(strings)?;
        Ok(LoadSummary {
            records,
            placeholders,
        })
    }

    pub fn load_from_matched(&mut self, records: Vec<ResultJsonRecord>) -> Result<(), Error> {
        let objects = derive_object_list(&records)?;
        debug!(records = records.len(), "loaded result json lists");
        self.strings = Some(records);
        self.objects = Some(objects);
        Ok(())
    }

    /// Overwrites the matching record in both lists. Not an upsert: a key
    /// missing from a list leaves that list untouched.
    pub fn change(&mut self, record: ResultJsonRecord) -> Result<(), Error> {
        let object = record.to_object()?;
        let keys = record.keys();

        let mut matched = false;
        if let Some(existing) = find_mut(self.strings.as_deref_mut(), &keys) {
            existing.json = record.json;
            matched = true;
        }
        if let Some(existing) = find_mut(self.objects.as_deref_mut(), &keys) {
            existing.json_object = object.json_object;
            matched = true;
        }
        if !matched {
            trace!(graph_id = %keys.graph_id, code_id = %keys.code_id, "change: no matching record");
        }
        Ok(())
    }

    pub fn clear_by_key(&mut self, keys: &Keys) {
        if let Some(existing) = find_mut(self.strings.as_deref_mut(), keys) {
            existing.json = EMPTY_JSON.to_string();
        }
        if let Some(existing) = find_mut(self.objects.as_deref_mut(), keys) {
            existing.json_object = Value::Array(Vec::new());
        }
    }

    pub fn clear_all(&mut self) {
        self.strings = None;
        self.objects = None;
    }

    pub fn string_list(&self) -> Option<&[ResultJsonRecord]> {
        self.strings.as_deref()
    }

    pub fn object_list(&self) -> Option<&[ResultJsonObjectRecord]> {
        self.objects.as_deref()
    }

    /// `None` while the list is not loaded.
    pub fn string_list_empty(&self) -> Option<bool> {
        self.strings.as_ref().map(Vec::is_empty)
    }

    pub fn object_list_empty(&self) -> Option<bool> {
        self.objects.as_ref().map(Vec::is_empty)
    }

    pub fn current_json_string(&self, keys: &Keys) -> Option<&ResultJsonRecord> {
        find(self.strings.as_deref(), keys)
    }

    pub fn current_json_object(&self, keys: &Keys) -> Option<&ResultJsonObjectRecord> {
        find(self.objects.as_deref(), keys)
    }
}

fn derive_object_list(records: &[ResultJsonRecord]) -> Result<Vec<ResultJsonObjectRecord>, Error> {
    records.iter().map(ResultJsonRecord::to_object).collect()
}

fn find<'a, T: Keyed>(list: Option<&'a [T]>, keys: &Keys) -> Option<&'a T> {
    list?.iter().find(|record| record.matches(keys))
}

fn find_mut<'a, T: Keyed>(list: Option<&'a mut [T]>, keys: &Keys) -> Option<&'a mut T> {
    list?.iter_mut().find(|record| record.matches(keys))
}
