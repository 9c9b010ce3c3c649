//! Nullable clock: deterministic block height for testing.

use attest_ports::HeightClock;
use attest_types::Height;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic height source.
///
/// Height only advances when you tell it to.
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_height: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_height),
        }
    }

    /// Get the current height.
    pub fn now(&self) -> Height {
        Height::new(self.current.load(Ordering::SeqCst))
    }

    /// Advance by a number of blocks.
    pub fn advance(&self, blocks: u64) {
        self.current.fetch_add(blocks, Ordering::SeqCst);
    }

    /// Set the height to a specific value.
    pub fn set(&self, height: u64) {
        self.current.store(height, Ordering::SeqCst);
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl HeightClock for NullClock {
    fn current_height(&self) -> Height {
        self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_on_request() {
        let clock = NullClock::new(100);
        assert_eq!(clock.current_height(), Height::new(100));
        clock.advance(1440);
        assert_eq!(clock.now(), Height::new(1540));
        clock.set(5);
        assert_eq!(clock.now(), Height::new(5));
    }
}
