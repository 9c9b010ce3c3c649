//! Vote ledger: one staked vote per (content, voter) pair.

use crate::error::VerificationError;
use crate::queue::ContentSlot;
use attest_ports::Escrow;
use attest_types::{ContentId, Height, ParticipantId, VerificationParams};
use serde::{Deserialize, Serialize};

/// A recorded vote. Immutable once created; its existence is the
/// "already voted" guard for the pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// `true` approves the content, `false` rejects it.
    pub vote: bool,
    pub stake: u128,
    pub timestamp: Height,
}

/// Engine for recording votes against a content slot.
pub struct VoteLedger;

impl VoteLedger {
    /// Cast a staked vote.
    ///
    /// Checks run in a fixed order (window, duplicate, stake floor, capacity)
    /// and all of them precede the escrow transfer. The slot is written only
    /// after escrow succeeds.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_vote(
        &self,
        slot: &mut ContentSlot,
        content: &ContentId,
        voter: ParticipantId,
        vote: bool,
        stake: u128,
        now: Height,
        params: &VerificationParams,
        escrow: &dyn Escrow,
        custody: &ParticipantId,
    ) -> Result<VoteRecord, VerificationError> {
        if !slot.entry.is_voting_open(now, params.voting_period) {
            return Err(VerificationError::VotingClosed(*content));
        }
        if slot.votes.contains_key(&voter) {
            return Err(VerificationError::AlreadyVoted(voter));
        }
        if stake < params.min_stake {
            return Err(VerificationError::InsufficientStake {
                needed: params.min_stake,
                provided: stake,
            });
        }
        if !slot.entry.has_capacity(params.max_voters) {
            return Err(VerificationError::MaxVotersReached(params.max_voters));
        }
        let new_total = slot
            .entry
            .total_stake
            .checked_add(stake)
            .ok_or(VerificationError::StakeOverflow)?;

        escrow
            .transfer(stake, &voter, custody)
            .map_err(VerificationError::Escrow)?;

        let record = VoteRecord {
            vote,
            stake,
            timestamp: now,
        };
        slot.votes.insert(voter.clone(), record.clone());
        slot.entry.record_vote(voter, vote, new_total);
        Ok(record)
    }

    pub fn get_vote<'a>(&self, slot: &'a ContentSlot, voter: &ParticipantId) -> Option<&'a VoteRecord> {
        slot.votes.get(voter)
    }

    /// Voters whose vote disagrees with `outcome_verified`.
    pub fn dissenters<'a>(&self, slot: &'a ContentSlot, outcome_verified: bool) -> Vec<&'a ParticipantId> {
        slot.entry
            .voters
            .iter()
            .filter(|v| slot.votes.get(*v).is_some_and(|r| r.vote != outcome_verified))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueEntry;
    use attest_nullables::NullEscrow;
    use attest_ports::EscrowError;

    fn voter(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    fn new_slot(start: u64) -> ContentSlot {
        ContentSlot::new(QueueEntry::new(Height::new(start)))
    }

    fn content() -> ContentId {
        ContentId::new([1u8; 32])
    }

    fn custody() -> ParticipantId {
        voter("custody")
    }

    fn cast(
        slot: &mut ContentSlot,
        who: &str,
        vote: bool,
        stake: u128,
        now: u64,
        escrow: &NullEscrow,
    ) -> Result<VoteRecord, VerificationError> {
        VoteLedger.cast_vote(
            slot,
            &content(),
            voter(who),
            vote,
            stake,
            Height::new(now),
            &VerificationParams::default(),
            escrow,
            &custody(),
        )
    }

    #[test]
    fn vote_updates_aggregates_and_escrows_stake() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap();
        cast(&mut slot, "b", false, 2500, 2, &escrow).unwrap();

        assert_eq!(slot.entry.yes_votes, 1);
        assert_eq!(slot.entry.no_votes, 1);
        assert_eq!(slot.entry.total_stake, 3500);
        assert_eq!(slot.entry.voters, vec![voter("a"), voter("b")]);
        assert_eq!(
            slot.votes[&voter("b")],
            VoteRecord { vote: false, stake: 2500, timestamp: Height::new(2) }
        );
        let transfers = escrow.transfers();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].amount, 1000);
        assert_eq!(transfers[0].to, custody());
    }

    #[test]
    fn second_vote_from_same_voter_fails_regardless_of_value() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap();
        let err = cast(&mut slot, "a", false, 5000, 2, &escrow).unwrap_err();
        assert_eq!(err, VerificationError::AlreadyVoted(voter("a")));
        assert_eq!(slot.entry.total_votes(), 1);
        assert_eq!(escrow.transfers().len(), 1);
    }

    #[test]
    fn low_stake_fails_without_mutation() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        let err = cast(&mut slot, "a", true, 500, 1, &escrow).unwrap_err();
        assert_eq!(
            err,
            VerificationError::InsufficientStake { needed: 1000, provided: 500 }
        );
        assert!(slot.votes.is_empty());
        assert_eq!(slot.entry, QueueEntry::new(Height::new(0)));
        assert!(escrow.transfers().is_empty());
    }

    #[test]
    fn closed_window_reported_before_duplicate() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap();
        // Same voter, after the window: the window check wins.
        let err = cast(&mut slot, "a", true, 1000, 1440, &escrow).unwrap_err();
        assert_eq!(err, VerificationError::VotingClosed(content()));
    }

    #[test]
    fn duplicate_reported_before_stake_floor() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap();
        let err = cast(&mut slot, "a", true, 1, 2, &escrow).unwrap_err();
        assert_eq!(err, VerificationError::AlreadyVoted(voter("a")));
    }

    #[test]
    fn stake_floor_reported_before_capacity() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        for i in 0..50 {
            cast(&mut slot, &format!("v{i}"), true, 1000, 1, &escrow).unwrap();
        }
        let err = cast(&mut slot, "late", true, 999, 1, &escrow).unwrap_err();
        assert!(matches!(err, VerificationError::InsufficientStake { .. }));
        let err = cast(&mut slot, "late", true, 1000, 1, &escrow).unwrap_err();
        assert_eq!(err, VerificationError::MaxVotersReached(50));
        assert_eq!(slot.entry.voters.len(), 50);
    }

    #[test]
    fn escrow_failure_propagates_unchanged_and_leaves_slot_untouched() {
        let escrow = NullEscrow::new();
        escrow.fail_with(EscrowError::InsufficientFunds { needed: 1000, available: 3 });
        let mut slot = new_slot(0);
        let err = cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap_err();
        assert_eq!(
            err,
            VerificationError::Escrow(EscrowError::InsufficientFunds { needed: 1000, available: 3 })
        );
        assert!(slot.votes.is_empty());
        assert_eq!(slot.entry.total_votes(), 0);

        // Retrying once custody recovers succeeds.
        escrow.recover();
        cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap();
        assert_eq!(slot.entry.yes_votes, 1);
    }

    #[test]
    fn stake_overflow_fails_before_escrow() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        cast(&mut slot, "a", true, u128::MAX, 1, &escrow).unwrap();
        let err = cast(&mut slot, "b", true, 1000, 1, &escrow).unwrap_err();
        assert_eq!(err, VerificationError::StakeOverflow);
        assert_eq!(escrow.transfers().len(), 1);
    }

    #[test]
    fn dissenters_are_those_against_the_outcome() {
        let escrow = NullEscrow::new();
        let mut slot = new_slot(0);
        cast(&mut slot, "a", true, 1000, 1, &escrow).unwrap();
        cast(&mut slot, "b", false, 1000, 1, &escrow).unwrap();
        cast(&mut slot, "c", true, 1000, 1, &escrow).unwrap();
        assert_eq!(VoteLedger.dissenters(&slot, true), vec![&voter("b")]);
        assert_eq!(VoteLedger.dissenters(&slot, false), vec![&voter("a"), &voter("c")]);
    }
}
