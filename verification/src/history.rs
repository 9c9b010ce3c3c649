//! Append-only history of finalizations.
//!
//! Verification ids come from one counter shared by all content: the id of a
//! record is the counter value before the append, and the counter moves by
//! exactly one per append.

use crate::error::VerificationError;
use attest_types::{ContentId, Height, QueueStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// An immutable record of one finalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub status: QueueStatus,
    pub note: String,
    pub timestamp: Height,
    pub verifier_count: u32,
    pub total_stake: u128,
}

/// A history record together with its key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub verification_id: u64,
    pub content: ContentId,
    pub record: HistoryRecord,
}

/// Arena of history entries, ordered by verification id.
#[derive(Default)]
pub struct HistoryLog {
    entries: Mutex<Vec<HistoryEntry>>,
    next_id: AtomicU64,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its verification id.
    pub fn append(&self, content: ContentId, record: HistoryRecord) -> u64 {
        self.append_then(content, record, |_| {})
    }

    /// Append a record, then run `on_commit` with its id before the arena is
    /// unlocked. Work done in `on_commit` is ordered by verification id.
    pub fn append_then(
        &self,
        content: ContentId,
        record: HistoryRecord,
        on_commit: impl FnOnce(u64),
    ) -> u64 {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let id = self.next_id.load(Ordering::Acquire);
        entries.push(HistoryEntry {
            verification_id: id,
            content,
            record,
        });
        self.next_id.store(id + 1, Ordering::Release);
        on_commit(id);
        id
    }

    /// The record for `(content, verification_id)`, if that id belongs to `content`.
    pub fn get(&self, content: &ContentId, verification_id: u64) -> Option<HistoryRecord> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = entries
            .binary_search_by_key(&verification_id, |e| e.verification_id)
            .ok()?;
        let entry = &entries[idx];
        (entry.content == *content).then(|| entry.record.clone())
    }

    /// All records for one content item, ascending by id.
    pub fn for_content(&self, content: &ContentId) -> Vec<(u64, HistoryRecord)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.content == *content)
            .map(|e| (e.verification_id, e.record.clone()))
            .collect()
    }

    /// The id the next finalization will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild a log from persisted entries. The counter resumes after the
    /// larger of `next_id` and the highest persisted id, so ids are never reused.
    pub fn restore(
        mut entries: Vec<HistoryEntry>,
        next_id: u64,
    ) -> Result<Self, VerificationError> {
        entries.sort_by_key(|e| e.verification_id);
        if let Some(pair) = entries
            .windows(2)
            .find(|w| w[0].verification_id == w[1].verification_id)
        {
            return Err(VerificationError::InvalidSnapshot(format!(
                "verification id {} appears twice",
                pair[0].verification_id
            )));
        }
        let after_last = match entries.last() {
            Some(last) => last.verification_id.checked_add(1).ok_or_else(|| {
                VerificationError::InvalidSnapshot("verification ids exhausted".into())
            })?,
            None => 0,
        };
        Ok(Self {
            entries: Mutex::new(entries),
            next_id: AtomicU64::new(next_id.max(after_last)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: QueueStatus) -> HistoryRecord {
        HistoryRecord {
            status,
            note: "ok".into(),
            timestamp: Height::new(1440),
            verifier_count: 2,
            total_stake: 2000,
        }
    }

    fn content(b: u8) -> ContentId {
        ContentId::new([b; 32])
    }

    #[test]
    fn ids_are_global_and_sequential() {
        let log = HistoryLog::new();
        assert_eq!(log.append(content(1), record(QueueStatus::Verified)), 0);
        assert_eq!(log.append(content(2), record(QueueStatus::Rejected)), 1);
        assert_eq!(log.append(content(1), record(QueueStatus::Rejected)), 2);
        assert_eq!(log.next_id(), 3);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn get_requires_matching_content() {
        let log = HistoryLog::new();
        log.append(content(1), record(QueueStatus::Verified));
        assert_eq!(log.get(&content(1), 0), Some(record(QueueStatus::Verified)));
        assert_eq!(log.get(&content(2), 0), None);
        assert_eq!(log.get(&content(1), 1), None);
    }

    #[test]
    fn for_content_filters_and_orders() {
        let log = HistoryLog::new();
        log.append(content(1), record(QueueStatus::Verified));
        log.append(content(2), record(QueueStatus::Rejected));
        log.append(content(1), record(QueueStatus::Rejected));
        let ids: Vec<u64> = log.for_content(&content(1)).iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn commit_hook_sees_the_assigned_id() {
        let log = HistoryLog::new();
        log.append(content(1), record(QueueStatus::Verified));
        let mut seen = None;
        let id = log.append_then(content(2), record(QueueStatus::Rejected), |id| seen = Some(id));
        assert_eq!(id, 1);
        assert_eq!(seen, Some(1));
    }

    #[test]
    fn restore_continues_the_counter() {
        let log = HistoryLog::new();
        log.append(content(1), record(QueueStatus::Verified));
        log.append(content(2), record(QueueStatus::Verified));
        let restored = HistoryLog::restore(log.entries(), log.next_id()).unwrap();
        assert_eq!(restored.append(content(3), record(QueueStatus::Rejected)), 2);
        assert_eq!(restored.get(&content(2), 1), Some(record(QueueStatus::Verified)));
    }

    #[test]
    fn restore_never_reuses_a_persisted_id() {
        let entries = vec![HistoryEntry {
            verification_id: 4,
            content: content(1),
            record: record(QueueStatus::Verified),
        }];
        let restored = HistoryLog::restore(entries, 0).unwrap();
        assert_eq!(restored.next_id(), 5);
    }

    #[test]
    fn restore_refuses_duplicate_or_exhausted_ids() {
        let entry = |id| HistoryEntry {
            verification_id: id,
            content: content(1),
            record: record(QueueStatus::Verified),
        };
        assert!(matches!(
            HistoryLog::restore(vec![entry(3), entry(3)], 4),
            Err(VerificationError::InvalidSnapshot(_))
        ));
        assert!(matches!(
            HistoryLog::restore(vec![entry(u64::MAX)], 0),
            Err(VerificationError::InvalidSnapshot(_))
        ));
    }
}
