//! Stake-weighted, time-boxed content verification.
//!
//! Content registered elsewhere is queued here for a voting round:
//! 1. **Voting**: participants stake at least the minimum and vote yes or no
//!    while the window is open. Stakes move into custody through the escrow port.
//! 2. **Finalization**: once the window elapses an authority closes the round.
//!    The outcome is a plain headcount against the threshold; stake is recorded
//!    but carries no weight.
//!
//! Plus the post-verification **dispute** mechanism: anyone may contest
//! verified content, and an authority decides. An upheld dispute sends the
//! content back to pending.
//!
//! Every finalization is kept in an append-only history keyed by a global
//! verification id.

pub mod dispute;
pub mod engine;
pub mod error;
pub mod events;
pub mod finalization;
pub mod history;
pub mod ledger;
pub mod queue;

pub use dispute::{DisputeRecord, DisputeResolver, ResolutionEffect};
pub use engine::{EngineSnapshot, VerificationEngine};
pub use error::VerificationError;
pub use events::VerificationEvent;
pub use finalization::{tally, Finalization, FinalizationEngine};
pub use history::{HistoryEntry, HistoryLog, HistoryRecord};
pub use ledger::{VoteLedger, VoteRecord};
pub use queue::{ContentSlot, QueueEntry, QueueStore};
