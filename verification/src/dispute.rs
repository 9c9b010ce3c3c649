//! Dispute resolver: contest verified content; an authority decides.

use crate::error::VerificationError;
use crate::queue::ContentSlot;
use attest_ports::ContentRegistry;
use attest_types::{ContentId, Height, ParticipantId, QueueStatus, VerificationParams};
use serde::{Deserialize, Serialize};

/// A dispute raised by one participant against one content item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub note: String,
    pub timestamp: Height,
    pub resolved: bool,
}

/// What a resolution did to the queue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionEffect {
    /// Dispute dismissed; entry unchanged.
    Dismissed,
    /// Upheld; the entry is (again) pending.
    Reopened,
    /// Upheld against a rejected entry, which stays rejected.
    UpheldOnTerminal,
}

pub struct DisputeResolver;

impl DisputeResolver {
    /// Raise (or replace) the caller's dispute against verified content.
    ///
    /// A second raise by the same disputer overwrites the earlier record,
    /// resolved or not.
    pub fn raise(
        &self,
        slot: &mut ContentSlot,
        disputer: ParticipantId,
        note: &str,
        now: Height,
        params: &VerificationParams,
    ) -> Result<DisputeRecord, VerificationError> {
        if slot.entry.status != QueueStatus::Verified {
            return Err(VerificationError::InvalidDispute(format!(
                "content is {}, only verified content can be disputed",
                slot.entry.status
            )));
        }
        let note_len = note.chars().count();
        if note_len > params.max_dispute_note_len {
            return Err(VerificationError::InvalidDispute(format!(
                "note is {note_len} characters, max {}",
                params.max_dispute_note_len
            )));
        }

        let record = DisputeRecord {
            note: note.to_string(),
            timestamp: now,
            resolved: false,
        };
        slot.disputes.insert(disputer, record.clone());
        Ok(record)
    }

    /// Resolve an open dispute.
    ///
    /// An upheld dispute moves verified content back to pending and tells the
    /// registry to hide it. The registry call happens before any write, so a
    /// registry failure leaves the dispute open.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        &self,
        slot: &mut ContentSlot,
        content: &ContentId,
        disputer: &ParticipantId,
        upheld: bool,
        note: &str,
        params: &VerificationParams,
        registry: &dyn ContentRegistry,
    ) -> Result<ResolutionEffect, VerificationError> {
        match slot.disputes.get(disputer) {
            None => {
                return Err(VerificationError::InvalidDispute(format!(
                    "no dispute from {disputer}"
                )))
            }
            Some(d) if d.resolved => {
                return Err(VerificationError::InvalidDispute(format!(
                    "dispute from {disputer} is already resolved"
                )))
            }
            Some(_) => {}
        }
        let note_len = note.chars().count();
        if note_len > params.max_verification_note_len {
            return Err(VerificationError::InvalidDispute(format!(
                "note is {note_len} characters, max {}",
                params.max_verification_note_len
            )));
        }

        let effect = match (upheld, slot.entry.status) {
            (false, _) => ResolutionEffect::Dismissed,
            (true, QueueStatus::Rejected) => ResolutionEffect::UpheldOnTerminal,
            (true, _) => {
                registry
                    .update_status(content, QueueStatus::Pending, false)
                    .map_err(VerificationError::Registry)?;
                ResolutionEffect::Reopened
            }
        };

        if let Some(d) = slot.disputes.get_mut(disputer) {
            d.resolved = true;
        }
        if effect == ResolutionEffect::Reopened {
            slot.entry.reopen();
        }
        Ok(effect)
    }

    pub fn get_dispute<'a>(
        &self,
        slot: &'a ContentSlot,
        disputer: &ParticipantId,
    ) -> Option<&'a DisputeRecord> {
        slot.disputes.get(disputer)
    }

    /// Disputes not yet resolved, sorted by disputer.
    pub fn open_disputes<'a>(&self, slot: &'a ContentSlot) -> Vec<(&'a ParticipantId, &'a DisputeRecord)> {
        let mut open: Vec<_> = slot.disputes.iter().filter(|(_, d)| !d.resolved).collect();
        open.sort_by(|a, b| a.0.cmp(b.0));
        open
    }
}
