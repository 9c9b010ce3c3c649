//! Verification policy parameters.
//!
//! The defaults are the reference policy values. Every field can be overridden
//! from configuration, but `validate` must pass before an engine accepts them.

use crate::TypesError;
use serde::{Deserialize, Serialize};

/// Policy values consulted by every engine operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationParams {
    /// Maximum number of distinct voters per queue entry.
    pub max_voters: u32,

    /// Minimum stake (raw units) attached to a single vote.
    #[serde(with = "stake_amount")]
    pub min_stake: u128,

    /// Length of the voting window in heights, counted from the entry's start height.
    pub voting_period: u64,

    /// Maximum dispute note length, in characters.
    pub max_dispute_note_len: usize,

    /// Maximum finalization / resolution note length, in characters.
    pub max_verification_note_len: usize,

    /// Percentage of yes votes (integer, truncating) required to verify.
    pub verification_threshold_pct: u32,
}

impl VerificationParams {
    pub const MAX_VOTERS: u32 = 50;
    pub const MIN_STAKE: u128 = 1000;
    pub const VOTING_PERIOD: u64 = 1440;
    pub const MAX_DISPUTE_NOTE_LEN: usize = 200;
    pub const MAX_VERIFICATION_NOTE_LEN: usize = 200;
    pub const VERIFICATION_THRESHOLD: u32 = 70;

    /// The reference policy.
    pub fn reference_defaults() -> Self {
        Self {
            max_voters: Self::MAX_VOTERS,
            min_stake: Self::MIN_STAKE,
            voting_period: Self::VOTING_PERIOD,
            max_dispute_note_len: Self::MAX_DISPUTE_NOTE_LEN,
            max_verification_note_len: Self::MAX_VERIFICATION_NOTE_LEN,
            verification_threshold_pct: Self::VERIFICATION_THRESHOLD,
        }
    }

    /// Reject parameter sets the engine cannot operate under.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.verification_threshold_pct > 100 {
            return Err(TypesError::InvalidParams(format!(
                "verification_threshold_pct must be <= 100, got {}",
                self.verification_threshold_pct
            )));
        }
        if self.max_voters == 0 {
            return Err(TypesError::InvalidParams("max_voters must be non-zero".into()));
        }
        if self.voting_period == 0 {
            return Err(TypesError::InvalidParams("voting_period must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for VerificationParams {
    fn default() -> Self {
        Self::reference_defaults()
    }
}

/// Serde adapter for `u128` stake amounts.
///
/// TOML integers are 64-bit, so human-readable formats write amounts that fit
/// in an `i64` as integers and larger ones as decimal strings. Binary formats
/// keep the plain `u128`.
pub mod stake_amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return serializer.serialize_u128(*amount);
        }
        match i64::try_from(*amount) {
            Ok(small) => serializer.serialize_i64(small),
            Err(_) => serializer.collect_str(amount),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u128),
            Text(String),
        }

        if !deserializer.is_human_readable() {
            return u128::deserialize(deserializer);
        }
        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(v),
            Repr::Text(s) => s.trim().parse().map_err(de::Error::custom),
        }
    }
}
