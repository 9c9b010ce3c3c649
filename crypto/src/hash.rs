//! Blake2b hashing for content fingerprints.

use attest_types::ContentId;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Fingerprint a content body to produce its `ContentId`.
pub fn fingerprint(content: &[u8]) -> ContentId {
    ContentId::new(blake2b_256(content))
}

/// Fingerprint content delivered in chunks.
pub fn fingerprint_parts(parts: &[&[u8]]) -> ContentId {
    ContentId::new(blake2b_256_multi(parts))
}
