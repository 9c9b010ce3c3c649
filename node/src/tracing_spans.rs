//! Pre-built [`tracing::Span`] constructors for service operations.
//!
//! Using consistent span names and field sets makes it easy to filter and
//! correlate one operation's log lines.

use attest_types::ContentId;
use tracing::{info_span, Span};

/// Span covering one engine operation, from permit to outcome.
pub fn operation_span(op: &str, content: &ContentId) -> Span {
    info_span!("operation", op = %op, content = %content)
}

/// Span covering a snapshot write or load.
pub fn snapshot_span(path: &str) -> Span {
    info_span!("snapshot", path = %path)
}
