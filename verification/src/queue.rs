//! Verification queue store: one entry per content item, owning the status state machine.

use crate::dispute::DisputeRecord;
use crate::error::VerificationError;
use crate::ledger::VoteRecord;
use attest_types::{ContentId, Height, ParticipantId, QueueStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Voting progress and status for one content item.
///
/// Invariant: `yes_votes + no_votes == voters.len()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub status: QueueStatus,
    /// Height at which the entry was queued; the voting window is measured from here.
    pub start_height: Height,
    pub yes_votes: u32,
    pub no_votes: u32,
    /// Sum of all vote stakes (raw units).
    pub total_stake: u128,
    /// Voters in the order their votes were accepted.
    pub voters: Vec<ParticipantId>,
}

impl QueueEntry {
    pub fn new(start_height: Height) -> Self {
        Self {
            status: QueueStatus::Pending,
            start_height,
            yes_votes: 0,
            no_votes: 0,
            total_stake: 0,
            voters: Vec::new(),
        }
    }

    pub fn total_votes(&self) -> u32 {
        self.yes_votes.saturating_add(self.no_votes)
    }

    /// Pending and still inside the voting window.
    pub fn is_voting_open(&self, now: Height, voting_period: u64) -> bool {
        self.status == QueueStatus::Pending && now.blocks_since(self.start_height) < voting_period
    }

    /// Pending with the voting window elapsed.
    pub fn is_ready_to_finalize(&self, now: Height, voting_period: u64) -> bool {
        self.status == QueueStatus::Pending && now.blocks_since(self.start_height) >= voting_period
    }

    pub fn has_capacity(&self, max_voters: u32) -> bool {
        self.voters.len() < max_voters as usize
    }

    /// Apply an accepted vote. Callers check capacity and stake overflow first.
    pub(crate) fn record_vote(&mut self, voter: ParticipantId, vote: bool, new_total_stake: u128) {
        if vote {
            self.yes_votes += 1;
        } else {
            self.no_votes += 1;
        }
        self.total_stake = new_total_stake;
        self.voters.push(voter);
    }

    /// `Pending -> Verified | Rejected`.
    pub(crate) fn settle(&mut self, outcome: QueueStatus) {
        debug_assert_eq!(self.status, QueueStatus::Pending);
        debug_assert_ne!(outcome, QueueStatus::Pending);
        self.status = outcome;
    }

    /// `Verified -> Pending` after an upheld dispute.
    ///
    /// The start height, counters and voter list are left as they are, so the
    /// reopened entry is immediately ready to finalize again and accepts no votes.
    pub(crate) fn reopen(&mut self) {
        debug_assert!(!self.status.is_terminal());
        self.status = QueueStatus::Pending;
    }
}

/// Everything stored for one content item, guarded by a single mutex.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentSlot {
    pub entry: QueueEntry,
    pub votes: HashMap<ParticipantId, VoteRecord>,
    pub disputes: HashMap<ParticipantId, DisputeRecord>,
}

impl ContentSlot {
    pub fn new(entry: QueueEntry) -> Self {
        Self {
            entry,
            votes: HashMap::new(),
            disputes: HashMap::new(),
        }
    }

    /// Check that the entry's counters agree with the stored votes. Slots
    /// built by the engine always pass; restored ones may not.
    pub fn check_consistency(&self, max_voters: u32) -> Result<(), String> {
        let entry = &self.entry;
        if entry.voters.len() > max_voters as usize {
            return Err(format!(
                "{} voters exceed the cap of {max_voters}",
                entry.voters.len()
            ));
        }
        let mut seen = HashSet::with_capacity(entry.voters.len());
        if let Some(dup) = entry.voters.iter().find(|v| !seen.insert(*v)) {
            return Err(format!("voter {dup} appears twice"));
        }
        if self.votes.len() != entry.voters.len() {
            return Err(format!(
                "{} vote records for {} voters",
                self.votes.len(),
                entry.voters.len()
            ));
        }
        let (mut yes, mut no, mut stake) = (0u32, 0u32, 0u128);
        for voter in &entry.voters {
            let record = self
                .votes
                .get(voter)
                .ok_or_else(|| format!("voter {voter} has no vote record"))?;
            if record.vote {
                yes += 1;
            } else {
                no += 1;
            }
            stake = stake
                .checked_add(record.stake)
                .ok_or_else(|| "vote stakes overflow".to_string())?;
        }
        if (yes, no) != (entry.yes_votes, entry.no_votes) {
            return Err(format!(
                "counters say {}/{} yes/no, votes say {yes}/{no}",
                entry.yes_votes, entry.no_votes
            ));
        }
        if stake != entry.total_stake {
            return Err(format!(
                "total stake {} does not match vote stakes {stake}",
                entry.total_stake
            ));
        }
        Ok(())
    }
}

/// Per-content slots. Content items are serialized independently: a mutating
/// operation holds its slot's mutex for its whole duration.
#[derive(Default)]
pub struct QueueStore {
    slots: RwLock<HashMap<ContentId, Arc<Mutex<ContentSlot>>>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the slot for `content`, failing if one already exists.
    pub fn insert(&self, content: ContentId, entry: QueueEntry) -> Result<(), VerificationError> {
        self.insert_then(content, entry, || {})
    }

    /// Like [`insert`](Self::insert), running `on_insert` before the store is
    /// unlocked so nothing can touch the new slot first.
    pub fn insert_then(
        &self,
        content: ContentId,
        entry: QueueEntry,
        on_insert: impl FnOnce(),
    ) -> Result<(), VerificationError> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if slots.contains_key(&content) {
            return Err(VerificationError::AlreadyVerified(content));
        }
        slots.insert(content, Arc::new(Mutex::new(ContentSlot::new(entry))));
        on_insert();
        Ok(())
    }

    /// Handle to the slot for `content`; lock it with [`lock_slot`].
    pub fn slot(&self, content: &ContentId) -> Option<Arc<Mutex<ContentSlot>>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(content)
            .cloned()
    }

    /// Snapshot of the queue entry. Never fails.
    pub fn get(&self, content: &ContentId) -> Option<QueueEntry> {
        let slot = self.slot(content)?;
        let guard = lock_slot(&slot);
        Some(guard.entry.clone())
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All queued content ids, sorted.
    pub fn contents(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Replace the whole store (used when restoring a snapshot).
    pub(crate) fn replace_all(&self, restored: Vec<(ContentId, ContentSlot)>) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.clear();
        for (content, slot) in restored {
            slots.insert(content, Arc::new(Mutex::new(slot)));
        }
    }
}

/// Lock a content slot. Slots are only written after every fallible step of an
/// operation has succeeded, so a poisoned slot still holds consistent data.
pub fn lock_slot(slot: &Mutex<ContentSlot>) -> MutexGuard<'_, ContentSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(b: u8) -> ContentId {
        ContentId::new([b; 32])
    }

    #[test]
    fn new_entry_is_empty_and_pending() {
        let entry = QueueEntry::new(Height::new(10));
        assert_eq!(entry.status, QueueStatus::Pending);
        assert_eq!(entry.start_height, Height::new(10));
        assert_eq!(entry.total_votes(), 0);
        assert_eq!(entry.total_stake, 0);
        assert!(entry.voters.is_empty());
    }

    #[test]
    fn window_boundary() {
        let entry = QueueEntry::new(Height::new(100));
        assert!(entry.is_voting_open(Height::new(100), 1440));
        assert!(entry.is_voting_open(Height::new(1539), 1440));
        assert!(!entry.is_ready_to_finalize(Height::new(1539), 1440));
        // Exactly at the period: closed for voting, open for finalization.
        assert!(!entry.is_voting_open(Height::new(1540), 1440));
        assert!(entry.is_ready_to_finalize(Height::new(1540), 1440));
    }

    #[test]
    fn settled_entry_is_neither_open_nor_ready() {
        let mut entry = QueueEntry::new(Height::new(0));
        entry.settle(QueueStatus::Verified);
        assert!(!entry.is_voting_open(Height::new(1), 1440));
        assert!(!entry.is_ready_to_finalize(Height::new(5000), 1440));
    }

    #[test]
    fn record_vote_keeps_counts_in_step_with_voters() {
        let mut entry = QueueEntry::new(Height::new(0));
        entry.record_vote(ParticipantId::new("a"), true, 1000);
        entry.record_vote(ParticipantId::new("b"), false, 3000);
        assert_eq!(entry.yes_votes, 1);
        assert_eq!(entry.no_votes, 1);
        assert_eq!(entry.total_stake, 3000);
        assert_eq!(entry.total_votes() as usize, entry.voters.len());
    }

    #[test]
    fn reopen_keeps_start_height_and_counters() {
        let mut entry = QueueEntry::new(Height::new(7));
        entry.record_vote(ParticipantId::new("a"), true, 1000);
        entry.settle(QueueStatus::Verified);
        entry.reopen();
        assert_eq!(entry.status, QueueStatus::Pending);
        assert_eq!(entry.start_height, Height::new(7));
        assert_eq!(entry.yes_votes, 1);
        assert_eq!(entry.voters.len(), 1);
    }

    fn slot_with_votes(votes: &[(&str, bool, u128)]) -> ContentSlot {
        let mut slot = ContentSlot::new(QueueEntry::new(Height::new(0)));
        for (who, vote, stake) in votes {
            let voter = ParticipantId::new(*who);
            let total = slot.entry.total_stake + stake;
            slot.votes.insert(
                voter.clone(),
                VoteRecord { vote: *vote, stake: *stake, timestamp: Height::new(1) },
            );
            slot.entry.record_vote(voter, *vote, total);
        }
        slot
    }

    #[test]
    fn consistent_slot_passes() {
        let slot = slot_with_votes(&[("a", true, 1000), ("b", false, 2500)]);
        assert_eq!(slot.check_consistency(50), Ok(()));
    }

    #[test]
    fn inconsistent_slots_are_reported() {
        let mut slot = slot_with_votes(&[("a", true, 1000)]);
        slot.entry.yes_votes = u32::MAX;
        slot.entry.no_votes = 1;
        assert_eq!(slot.entry.total_votes(), u32::MAX);
        assert!(slot.check_consistency(50).is_err());

        let mut slot = slot_with_votes(&[("a", true, 1000)]);
        slot.entry.total_stake = 5;
        assert!(slot.check_consistency(50).is_err());

        let mut slot = slot_with_votes(&[("a", true, 1000)]);
        slot.entry.voters.push(ParticipantId::new("a"));
        slot.entry.yes_votes = 2;
        assert!(slot.check_consistency(50).unwrap_err().contains("twice"));

        let mut slot = slot_with_votes(&[("a", true, 1000)]);
        slot.votes.clear();
        assert!(slot.check_consistency(50).is_err());

        let slot = slot_with_votes(&[("a", true, 1000), ("b", true, 1000)]);
        assert!(slot.check_consistency(1).is_err());
    }

    #[test]
    fn duplicate_insert_fails() {
        let store = QueueStore::new();
        store.insert(content(1), QueueEntry::new(Height::new(0))).unwrap();
        let err = store
            .insert(content(1), QueueEntry::new(Height::new(5)))
            .unwrap_err();
        assert_eq!(err, VerificationError::AlreadyVerified(content(1)));
        // Original entry untouched.
        assert_eq!(store.get(&content(1)).unwrap().start_height, Height::new(0));
    }

    #[test]
    fn get_missing_is_none() {
        let store = QueueStore::new();
        assert!(store.get(&content(9)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn contents_are_sorted() {
        let store = QueueStore::new();
        for b in [3u8, 1, 2] {
            store.insert(content(b), QueueEntry::new(Height::new(0))).unwrap();
        }
        assert_eq!(store.contents(), vec![content(1), content(2), content(3)]);
        assert_eq!(store.len(), 3);
    }
}
