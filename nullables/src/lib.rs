//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the verification engine talks to (clock, registry,
//! authority check, escrow) sits behind a trait in `attest-ports`. This crate
//! provides in-memory implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected failures
//! - Record every call for later assertions
//!
//! Usage: hand [`NullPorts::ports`] to the engine in tests and in the replay daemon.

pub mod authority;
pub mod clock;
pub mod escrow;
pub mod registry;

pub use authority::NullAuthority;
pub use clock::NullClock;
pub use escrow::{NullEscrow, Transfer};
pub use registry::{NullRegistry, StatusUpdate};

use attest_ports::EnginePorts;
use attest_types::ParticipantId;
use std::sync::Arc;

/// Account that receives escrowed stake unless a test picks another.
pub const DEFAULT_CUSTODY: &str = "custody";

/// One of each nullable, shared with the engine through `Arc`s so tests can
/// keep steering them after construction.
#[derive(Clone)]
pub struct NullPorts {
    pub registry: Arc<NullRegistry>,
    pub authority: Arc<NullAuthority>,
    pub escrow: Arc<NullEscrow>,
    pub clock: Arc<NullClock>,
}

impl NullPorts {
    pub fn new(initial_height: u64) -> Self {
        Self {
            registry: Arc::new(NullRegistry::new()),
            authority: Arc::new(NullAuthority::new()),
            escrow: Arc::new(NullEscrow::new()),
            clock: Arc::new(NullClock::new(initial_height)),
        }
    }

    /// Engine ports backed by these nullables, with [`DEFAULT_CUSTODY`] as custody.
    pub fn ports(&self) -> EnginePorts {
        self.ports_with_custody(ParticipantId::new(DEFAULT_CUSTODY))
    }

    pub fn ports_with_custody(&self, custody: ParticipantId) -> EnginePorts {
        EnginePorts {
            registry: self.registry.clone(),
            authority: self.authority.clone(),
            escrow: self.escrow.clone(),
            clock: self.clock.clone(),
            custody,
        }
    }
}

impl Default for NullPorts {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_ports::{ContentRegistry, HeightClock};
    use attest_types::{ContentId, Height, QueueStatus};

    #[test]
    fn ports_share_state_with_the_nullables() {
        let nulls = NullPorts::new(7);
        let ports = nulls.ports();
        let content = ContentId::new([3u8; 32]);

        nulls.registry.register(content);
        assert!(ports.registry.is_registered(&content));

        nulls.clock.advance(3);
        assert_eq!(ports.clock.current_height(), Height::new(10));

        ports
            .registry
            .update_status(&content, QueueStatus::Verified, true)
            .unwrap();
        assert_eq!(nulls.registry.status_updates().len(), 1);
        assert_eq!(ports.custody.as_str(), DEFAULT_CUSTODY);
    }
}
