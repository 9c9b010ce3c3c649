use attest_ports::{EscrowError, RegistryError};
use attest_types::{ContentId, ParticipantId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("caller {0} is not authorized")]
    Unauthorized(ParticipantId),

    #[error("malformed content identifier")]
    InvalidHash,

    #[error("content {0} is already queued for verification")]
    AlreadyVerified(ContentId),

    #[error("voting window is not in the required state for content {0}")]
    VotingClosed(ContentId),

    #[error("insufficient stake: needed {needed}, provided {provided}")]
    InsufficientStake { needed: u128, provided: u128 },

    #[error("invalid vote")]
    InvalidVote,

    #[error("invalid dispute: {0}")]
    InvalidDispute(String),

    #[error("content {0} is not registered")]
    NotRegistered(ContentId),

    #[error("maximum voters ({0}) reached")]
    MaxVotersReached(u32),

    #[error("invalid threshold: {0}%")]
    InvalidThreshold(u32),

    #[error("participant {0} has already voted")]
    AlreadyVoted(ParticipantId),

    #[error("note too long: {len} characters, max {max}")]
    InvalidNote { len: usize, max: usize },

    #[error("invalid verification params: {0}")]
    InvalidParams(String),

    #[error("inconsistent snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("escrow error: {0}")]
    Escrow(EscrowError),

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("total stake overflow")]
    StakeOverflow,
}

impl VerificationError {
    /// Stable numeric code, one per error kind.
    pub fn code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 100,
            Self::InvalidHash => 101,
            Self::AlreadyVerified(_) => 102,
            Self::VotingClosed(_) => 103,
            Self::InsufficientStake { .. } => 104,
            Self::InvalidVote => 105,
            Self::InvalidDispute(_) => 106,
            Self::NotRegistered(_) => 107,
            Self::MaxVotersReached(_) => 108,
            Self::InvalidThreshold(_) => 109,
            Self::AlreadyVoted(_) => 110,
            Self::InvalidNote { .. } => 111,
            Self::InvalidParams(_) => 112,
            Self::InvalidSnapshot(_) => 113,
            Self::Escrow(_) => 200,
            Self::Registry(_) => 201,
            Self::StakeOverflow => 202,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidHash => "invalid_hash",
            Self::AlreadyVerified(_) => "already_verified",
            Self::VotingClosed(_) => "voting_closed",
            Self::InsufficientStake { .. } => "insufficient_stake",
            Self::InvalidVote => "invalid_vote",
            Self::InvalidDispute(_) => "invalid_dispute",
            Self::NotRegistered(_) => "not_registered",
            Self::MaxVotersReached(_) => "max_voters_reached",
            Self::InvalidThreshold(_) => "invalid_threshold",
            Self::AlreadyVoted(_) => "already_voted",
            Self::InvalidNote { .. } => "invalid_note",
            Self::InvalidParams(_) => "invalid_params",
            Self::InvalidSnapshot(_) => "invalid_snapshot",
            Self::Escrow(_) => "escrow",
            Self::Registry(_) => "registry",
            Self::StakeOverflow => "stake_overflow",
        }
    }
}
