//! Verification engine: connects the queue store, vote ledger, finalization,
//! disputes and history into the public operation surface.
//!
//! Every mutating operation runs as one critical section on the content's
//! slot: all checks, then the collaborator call (escrow or registry), then
//! the local writes. A failure at any step leaves no trace, so callers can
//! always retry.

use crate::dispute::{DisputeRecord, DisputeResolver, ResolutionEffect};
use crate::error::VerificationError;
use crate::events::VerificationEvent;
use crate::finalization::{tally, Finalization, FinalizationEngine};
use crate::history::{HistoryEntry, HistoryLog, HistoryRecord};
use crate::ledger::{VoteLedger, VoteRecord};
use crate::queue::{lock_slot, ContentSlot, QueueEntry, QueueStore};
use attest_ports::EnginePorts;
use attest_types::{ContentId, Height, ParticipantId, QueueStatus, VerificationParams};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// The engine owns all verification state and reaches the outside world only
/// through its [`EnginePorts`].
pub struct VerificationEngine {
    params: VerificationParams,
    ports: EnginePorts,
    queue: QueueStore,
    history: HistoryLog,
    ledger: VoteLedger,
    finalizer: FinalizationEngine,
    disputes: DisputeResolver,
    /// Pending events for the host to process.
    pending_events: Mutex<Vec<VerificationEvent>>,
}

impl VerificationEngine {
    pub fn new(params: VerificationParams, ports: EnginePorts) -> Result<Self, VerificationError> {
        Self::with_state(params, ports, QueueStore::new(), HistoryLog::new())
    }

    fn with_state(
        params: VerificationParams,
        ports: EnginePorts,
        queue: QueueStore,
        history: HistoryLog,
    ) -> Result<Self, VerificationError> {
        if params.verification_threshold_pct > 100 {
            return Err(VerificationError::InvalidThreshold(
                params.verification_threshold_pct,
            ));
        }
        params
            .validate()
            .map_err(|e| VerificationError::InvalidParams(e.to_string()))?;
        Ok(Self {
            params,
            ports,
            queue,
            history,
            ledger: VoteLedger,
            finalizer: FinalizationEngine,
            disputes: DisputeResolver,
            pending_events: Mutex::new(Vec::new()),
        })
    }

    pub fn params(&self) -> &VerificationParams {
        &self.params
    }

    pub fn current_height(&self) -> Height {
        self.ports.clock.current_height()
    }

    // ── Queue ───────────────────────────────────────────────────────────

    /// Queue registered content for a voting round starting at the current height.
    pub fn enqueue(&self, content: ContentId) -> Result<(), VerificationError> {
        if !self.ports.registry.is_registered(&content) {
            return Err(VerificationError::NotRegistered(content));
        }
        let start_height = self.current_height();
        self.queue
            .insert_then(content, QueueEntry::new(start_height), || {
                self.push_event(VerificationEvent::Queued {
                    content,
                    start_height,
                })
            })?;

        tracing::info!(content = %content, start = %start_height, "content queued for verification");
        Ok(())
    }

    // ── Votes ───────────────────────────────────────────────────────────

    /// Cast a staked vote. The stake is moved into custody before the vote is recorded.
    pub fn cast_vote(
        &self,
        content: &ContentId,
        voter: &ParticipantId,
        vote: bool,
        stake: u128,
    ) -> Result<(), VerificationError> {
        if !voter.is_valid() {
            return Err(VerificationError::InvalidVote);
        }
        let slot = self
            .queue
            .slot(content)
            .ok_or(VerificationError::NotRegistered(*content))?;
        let mut slot = lock_slot(&slot);
        let now = self.current_height();

        self.ledger
            .cast_vote(
                &mut slot,
                content,
                voter.clone(),
                vote,
                stake,
                now,
                &self.params,
                self.ports.escrow.as_ref(),
                &self.ports.custody,
            )
            .inspect_err(|e| {
                if let VerificationError::Escrow(err) = e {
                    tracing::warn!(content = %content, voter = %voter, error = %err, "escrow transfer failed");
                }
            })?;

        tracing::debug!(
            content = %content,
            voter = %voter,
            vote,
            stake,
            voters = slot.entry.voters.len(),
            "vote recorded"
        );
        self.push_event(VerificationEvent::VoteCast {
            content: *content,
            voter: voter.clone(),
            vote,
            stake,
        });
        Ok(())
    }

    // ── Finalization ────────────────────────────────────────────────────

    /// Close the voting round of a pending entry whose window has elapsed.
    pub fn finalize(
        &self,
        content: &ContentId,
        authority: &ParticipantId,
        note: &str,
    ) -> Result<Finalization, VerificationError> {
        if !self.ports.authority.is_authorized(authority) {
            return Err(VerificationError::Unauthorized(authority.clone()));
        }
        let slot = self
            .queue
            .slot(content)
            .ok_or(VerificationError::NotRegistered(*content))?;
        let mut slot = lock_slot(&slot);
        let now = self.current_height();

        let fin = self
            .finalizer
            .finalize(
                &mut slot,
                content,
                note,
                now,
                &self.params,
                self.ports.registry.as_ref(),
                &self.history,
                |fin| {
                    self.push_event(VerificationEvent::Finalized {
                        content: *content,
                        verification_id: fin.verification_id,
                        outcome: fin.outcome,
                        verifier_count: fin.verifier_count,
                        total_stake: fin.total_stake,
                    })
                },
            )
            .inspect_err(|e| {
                if let VerificationError::Registry(err) = e {
                    tracing::warn!(content = %content, error = %err, "registry rejected finalization");
                }
            })?;
        drop(slot);

        tracing::info!(
            content = %content,
            outcome = %fin.outcome,
            verification_id = fin.verification_id,
            verifiers = fin.verifier_count,
            total_stake = fin.total_stake,
            "verification finalized"
        );
        Ok(fin)
    }

    // ── Disputes ────────────────────────────────────────────────────────

    /// Dispute verified content. Replaces any earlier dispute by the same participant.
    pub fn raise_dispute(
        &self,
        content: &ContentId,
        disputer: &ParticipantId,
        note: &str,
    ) -> Result<(), VerificationError> {
        if !disputer.is_valid() {
            return Err(VerificationError::InvalidDispute(
                "disputer id must not be empty".into(),
            ));
        }
        let slot = self
            .queue
            .slot(content)
            .ok_or(VerificationError::NotRegistered(*content))?;
        let mut slot = lock_slot(&slot);
        let now = self.current_height();

        self.disputes
            .raise(&mut slot, disputer.clone(), note, now, &self.params)?;
        self.push_event(VerificationEvent::DisputeRaised {
            content: *content,
            disputer: disputer.clone(),
        });
        drop(slot);

        tracing::debug!(content = %content, disputer = %disputer, "dispute raised");
        Ok(())
    }

    /// Resolve an open dispute. Upholding it sends verified content back to pending.
    pub fn resolve_dispute(
        &self,
        content: &ContentId,
        disputer: &ParticipantId,
        authority: &ParticipantId,
        upheld: bool,
        note: &str,
    ) -> Result<ResolutionEffect, VerificationError> {
        if !self.ports.authority.is_authorized(authority) {
            return Err(VerificationError::Unauthorized(authority.clone()));
        }
        let slot = self.queue.slot(content).ok_or_else(|| {
            VerificationError::InvalidDispute(format!("no dispute from {disputer}"))
        })?;
        let mut slot = lock_slot(&slot);

        let effect = self
            .disputes
            .resolve(
                &mut slot,
                content,
                disputer,
                upheld,
                note,
                &self.params,
                self.ports.registry.as_ref(),
            )
            .inspect_err(|e| {
                if let VerificationError::Registry(err) = e {
                    tracing::warn!(content = %content, error = %err, "registry rejected dispute resolution");
                }
            })?;
        self.push_event(VerificationEvent::DisputeResolved {
            content: *content,
            disputer: disputer.clone(),
            upheld,
            reopened: effect == ResolutionEffect::Reopened,
        });
        drop(slot);

        if effect == ResolutionEffect::UpheldOnTerminal {
            tracing::warn!(
                content = %content,
                disputer = %disputer,
                "dispute upheld against rejected content; status left unchanged"
            );
        }
        tracing::info!(content = %content, disputer = %disputer, upheld, "dispute resolved");
        Ok(effect)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_queue_entry(&self, content: &ContentId) -> Option<QueueEntry> {
        self.queue.get(content)
    }

    pub fn get_vote(&self, content: &ContentId, voter: &ParticipantId) -> Option<VoteRecord> {
        let slot = self.queue.slot(content)?;
        let slot = lock_slot(&slot);
        self.ledger.get_vote(&slot, voter).cloned()
    }

    pub fn get_dispute(
        &self,
        content: &ContentId,
        disputer: &ParticipantId,
    ) -> Option<DisputeRecord> {
        let slot = self.queue.slot(content)?;
        let slot = lock_slot(&slot);
        self.disputes.get_dispute(&slot, disputer).cloned()
    }

    pub fn get_history(&self, content: &ContentId, verification_id: u64) -> Option<HistoryRecord> {
        self.history.get(content, verification_id)
    }

    /// Every finalization of `content`, oldest first.
    pub fn history_for(&self, content: &ContentId) -> Vec<(u64, HistoryRecord)> {
        self.history.for_content(content)
    }

    pub fn next_verification_id(&self) -> u64 {
        self.history.next_id()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_contents(&self) -> Vec<ContentId> {
        self.queue.contents()
    }

    pub fn is_voting_open(&self, content: &ContentId) -> bool {
        self.queue.get(content).is_some_and(|entry| {
            entry.is_voting_open(self.current_height(), self.params.voting_period)
        })
    }

    /// The outcome finalization would produce from the current votes.
    pub fn tally(&self, content: &ContentId) -> Option<QueueStatus> {
        self.queue.get(content).map(|entry| {
            tally(
                entry.yes_votes,
                entry.no_votes,
                self.params.verification_threshold_pct,
            )
        })
    }

    // ── Events ──────────────────────────────────────────────────────────

    fn push_event(&self, event: VerificationEvent) {
        self.pending_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Drain pending events for the host to process.
    ///
    /// Events are queued inside the critical section of the operation that
    /// produced them, so their order matches commit order: per content item,
    /// and across items for `Finalized` events (ascending verification id).
    pub fn drain_events(&self) -> Vec<VerificationEvent> {
        std::mem::take(
            &mut *self
                .pending_events
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Serialize all state. Slots are copied one at a time, so take snapshots
    /// while no operations are running.
    pub fn snapshot(&self) -> EngineSnapshot {
        let slots = self
            .queue
            .contents()
            .into_iter()
            .filter_map(|content| {
                let slot = self.queue.slot(&content)?;
                let slot = lock_slot(&slot).clone();
                Some((content, slot))
            })
            .collect();
        EngineSnapshot {
            slots,
            history: self.history.entries(),
            next_verification_id: self.history.next_id(),
        }
    }

    /// Rebuild an engine from a snapshot.
    ///
    /// Every slot must be internally consistent under `params`, each content
    /// may appear once, and history may only name queued content.
    pub fn restore(
        snapshot: EngineSnapshot,
        params: VerificationParams,
        ports: EnginePorts,
    ) -> Result<Self, VerificationError> {
        let mut queued = HashSet::with_capacity(snapshot.slots.len());
        for (content, slot) in &snapshot.slots {
            if !queued.insert(*content) {
                return Err(VerificationError::InvalidSnapshot(format!(
                    "content {content} appears twice"
                )));
            }
            slot.check_consistency(params.max_voters).map_err(|reason| {
                VerificationError::InvalidSnapshot(format!("content {content}: {reason}"))
            })?;
        }
        if let Some(orphan) = snapshot.history.iter().find(|e| !queued.contains(&e.content)) {
            return Err(VerificationError::InvalidSnapshot(format!(
                "history entry {} names unqueued content {}",
                orphan.verification_id, orphan.content
            )));
        }

        let history = HistoryLog::restore(snapshot.history, snapshot.next_verification_id)?;
        let queue = QueueStore::new();
        queue.replace_all(snapshot.slots);
        Self::with_state(params, ports, queue, history)
    }
}

/// Serializable engine state for persistence across restarts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub slots: Vec<(ContentId, ContentSlot)>,
    pub history: Vec<HistoryEntry>,
    pub next_verification_id: u64,
}
