//! Logical clock used for every timing decision.
//!
//! Heights are block heights (or any strictly increasing counter). Wall-clock
//! time is never consulted by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonic logical height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height(u64);

impl Height {
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Heights elapsed since `start` (zero if `start` is in the future).
    pub fn blocks_since(&self, start: Height) -> u64 {
        self.0.saturating_sub(start.0)
    }

    pub fn advanced_by(&self, blocks: u64) -> Height {
        Self(self.0.saturating_add(blocks))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
