//! Cryptographic helpers for the attest verification engine.
//!
//! Content is identified by its Blake2b-256 fingerprint. The engine itself never
//! hashes anything; callers fingerprint content before enqueueing it.

pub mod hash;

pub use hash::{blake2b_256, blake2b_256_multi, fingerprint, fingerprint_parts};
