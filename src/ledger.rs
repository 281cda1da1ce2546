//! In-memory history of check attempts, newest first.

use crate::model::ResultRecord;
use std::collections::VecDeque;

/// Ordered record history. Supports prepend and full clear only; entries are
/// never edited or removed one at a time.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    records: VecDeque<ResultRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a record so the most recent check is always at index 0.
    pub fn append(&mut self, record: ResultRecord) {
        self.records.push_front(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&ResultRecord> {
        self.records.front()
    }

    pub fn get(&self, index: usize) -> Option<&ResultRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRecord> {
        self.records.iter()
    }

    /// Owned snapshot in ledger order.
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.iter().cloned().collect()
    }
}
