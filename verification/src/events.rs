//! Events emitted by the engine for the host to process.

use attest_types::{ContentId, Height, ParticipantId, QueueStatus};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VerificationEvent {
    /// Content entered the queue.
    Queued { content: ContentId, start_height: Height },
    /// A staked vote was accepted.
    VoteCast {
        content: ContentId,
        voter: ParticipantId,
        vote: bool,
        stake: u128,
    },
    /// A voting round closed.
    Finalized {
        content: ContentId,
        verification_id: u64,
        outcome: QueueStatus,
        verifier_count: u32,
        total_stake: u128,
    },
    /// A dispute was raised (or replaced).
    DisputeRaised { content: ContentId, disputer: ParticipantId },
    /// A dispute was resolved. `reopened` is true when the entry went back to pending.
    DisputeResolved {
        content: ContentId,
        disputer: ParticipantId,
        upheld: bool,
        reopened: bool,
    },
}

impl VerificationEvent {
    pub fn content(&self) -> &ContentId {
        match self {
            Self::Queued { content, .. }
            | Self::VoteCast { content, .. }
            | Self::Finalized { content, .. }
            | Self::DisputeRaised { content, .. }
            | Self::DisputeResolved { content, .. } => content,
        }
    }
}
