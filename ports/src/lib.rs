//! Collaborator traits for the attest verification engine.
//!
//! The engine does not own content registration, custody of staked value,
//! membership of the authority set, or the height source. Each is reached
//! through a trait object injected at construction, so tests can substitute
//! the deterministic implementations from `attest-nullables`.
//!
//! All calls are synchronous: they either succeed or fail before the calling
//! operation commits anything locally.

use attest_types::{ContentId, Height, ParticipantId, QueueStatus};
use std::sync::Arc;
use thiserror::Error;

/// The external content registry.
pub trait ContentRegistry: Send + Sync {
    /// Whether the content has been registered (consulted by `enqueue`).
    fn is_registered(&self, content: &ContentId) -> bool;

    /// Report a status change and the resulting visibility.
    fn update_status(
        &self,
        content: &ContentId,
        status: QueueStatus,
        visible: bool,
    ) -> Result<(), RegistryError>;
}

/// Capability check for finalization and dispute resolution.
pub trait Authority: Send + Sync {
    fn is_authorized(&self, caller: &ParticipantId) -> bool;
}

/// Custody of vote stakes.
pub trait Escrow: Send + Sync {
    /// Move `amount` from `from` into `to`.
    fn transfer(
        &self,
        amount: u128,
        from: &ParticipantId,
        to: &ParticipantId,
    ) -> Result<(), EscrowError>;
}

/// Source of the current logical height.
pub trait HeightClock: Send + Sync {
    fn current_height(&self) -> Height;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry rejected status update: {0}")]
    Rejected(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u128, available: u128 },

    #[error("escrow unavailable: {0}")]
    Unavailable(String),
}

/// The full set of collaborators an engine needs.
#[derive(Clone)]
pub struct EnginePorts {
    pub registry: Arc<dyn ContentRegistry>,
    pub authority: Arc<dyn Authority>,
    pub escrow: Arc<dyn Escrow>,
    pub clock: Arc<dyn HeightClock>,
    /// Account that receives every vote stake.
    pub custody: ParticipantId,
}
