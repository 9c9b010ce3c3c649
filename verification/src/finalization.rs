//! Finalization engine: closes a voting round and records its outcome.

use crate::error::VerificationError;
use crate::history::{HistoryLog, HistoryRecord};
use crate::queue::ContentSlot;
use attest_ports::ContentRegistry;
use attest_types::{ContentId, Height, QueueStatus, VerificationParams};

/// Apply the quorum-free outcome rule.
///
/// No votes rejects. Otherwise the content is verified when the truncated
/// integer percentage of yes votes reaches `threshold_pct`.
pub fn tally(yes_votes: u32, no_votes: u32, threshold_pct: u32) -> QueueStatus {
    let total = u64::from(yes_votes) + u64::from(no_votes);
    if total == 0 {
        return QueueStatus::Rejected;
    }
    let yes_pct = u64::from(yes_votes) * 100 / total;
    if yes_pct >= u64::from(threshold_pct) {
        QueueStatus::Verified
    } else {
        QueueStatus::Rejected
    }
}

/// The committed result of a finalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finalization {
    pub verification_id: u64,
    pub outcome: QueueStatus,
    pub verifier_count: u32,
    pub total_stake: u128,
}

pub struct FinalizationEngine;

impl FinalizationEngine {
    /// Finalize a pending entry whose voting window has elapsed.
    ///
    /// The registry is notified before anything is written; if it fails the
    /// slot and history are left untouched and no verification id is consumed.
    /// `on_commit` runs while the history arena is still locked.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &self,
        slot: &mut ContentSlot,
        content: &ContentId,
        note: &str,
        now: Height,
        params: &VerificationParams,
        registry: &dyn ContentRegistry,
        history: &HistoryLog,
        on_commit: impl FnOnce(&Finalization),
    ) -> Result<Finalization, VerificationError> {
        if !slot.entry.is_ready_to_finalize(now, params.voting_period) {
            return Err(VerificationError::VotingClosed(*content));
        }
        let note_len = note.chars().count();
        if note_len > params.max_verification_note_len {
            return Err(VerificationError::InvalidNote {
                len: note_len,
                max: params.max_verification_note_len,
            });
        }

        let entry = &slot.entry;
        let outcome = tally(entry.yes_votes, entry.no_votes, params.verification_threshold_pct);
        let verifier_count = entry.total_votes();
        let total_stake = entry.total_stake;

        registry
            .update_status(content, outcome, outcome == QueueStatus::Verified)
            .map_err(VerificationError::Registry)?;

        slot.entry.settle(outcome);
        let record = HistoryRecord {
            status: outcome,
            note: note.to_string(),
            timestamp: now,
            verifier_count,
            total_stake,
        };
        let finalization = |verification_id| Finalization {
            verification_id,
            outcome,
            verifier_count,
            total_stake,
        };
        let verification_id =
            history.append_then(*content, record, |id| on_commit(&finalization(id)));

        Ok(finalization(verification_id))
    }
}
