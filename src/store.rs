use thiserror::Error;
use tracing::debug;

use crate::contact::{ContactDraft, ContactId, ContactRecord};
use crate::filter::SearchFilter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no contact with id {0}")]
    UnknownContact(ContactId),
}

/// Owns the contact records and the active filter.
///
/// Records keep insertion order, which is also display order. The visible set
/// is never cached: every call to [`ContactStore::visible_records`] walks the
/// live records against the current filter.
#[derive(Debug, Default)]
pub struct ContactStore {
    records: Vec<ContactRecord>,
    active_filter: Option<SearchFilter>,
    next_id: u32,
}

impl ContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records<I>(drafts: I) -> Self
    where
        I: IntoIterator<Item = ContactDraft>,
    {
        let mut store = Self::new();
        for draft in drafts {
            store.insert(draft);
        }
        store
    }

    /// Replace the active filter and return the resulting visible count.
    pub fn apply_filter(&mut self, filter: SearchFilter) -> usize {
        self.active_filter = Some(filter);
        let count = self.visible_count();
        debug!(filter = ?self.active_filter, count, "filter applied");
        count
    }

    pub fn clear_filter(&mut self) {
        if self.active_filter.take().is_some() {
            debug!("filter cleared");
        }
    }

    pub fn active_filter(&self) -> Option<&SearchFilter> {
        self.active_filter.as_ref()
    }

    pub fn visible_records(&self) -> impl Iterator<Item = &ContactRecord> + Clone + '_ {
        let filter = self.active_filter.as_ref();
        self.records
            .iter()
            .filter(move |record| filter.map_or(true, |f| Self::matches(record, f)))
    }

    pub fn visible_count(&self) -> usize {
        self.visible_records().count()
    }

    pub fn matches(record: &ContactRecord, filter: &SearchFilter) -> bool {
        filter.matches(record)
    }

    pub fn records(&self) -> &[ContactRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ContactId) -> Option<&ContactRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn insert(&mut self, draft: ContactDraft) -> ContactId {
        let id = ContactId(self.next_id);
        self.next_id += 1;
        self.records.push(ContactRecord::new(id, draft));
        id
    }

    pub fn update(&mut self, id: ContactId, draft: ContactDraft) -> Result<(), StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::UnknownContact(id))?;
        record.fields = draft;
        Ok(())
    }
}
