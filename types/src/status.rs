//! Queue entry status.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a content item stands in the verification lifecycle.
///
/// Transitions: `Pending -> Verified | Rejected` on finalization and
/// `Verified -> Pending` when a dispute is upheld. `Rejected` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Verified,
    Rejected,
}

impl QueueStatus {
    /// The status string reported to the content registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(TypesError::InvalidStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [QueueStatus::Pending, QueueStatus::Verified, QueueStatus::Rejected] {
            assert_eq!(status.as_str().parse::<QueueStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_rejected_is_terminal() {
        assert!(QueueStatus::Rejected.is_terminal());
        assert!(!QueueStatus::Verified.is_terminal());
        assert!(!QueueStatus::Pending.is_terminal());
    }

    #[test]
    fn unknown_status_fails() {
        assert!(matches!(
            "disputed".parse::<QueueStatus>(),
            Err(TypesError::InvalidStatus(_))
        ));
    }
}
