//! Shared utilities for the attest workspace.

pub mod logging;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
