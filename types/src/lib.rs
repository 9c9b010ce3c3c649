//! Fundamental types for the attest verification engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! content identifiers, participant identifiers, heights, queue statuses, and the
//! verification policy parameters.

pub mod content;
pub mod error;
pub mod height;
pub mod params;
pub mod participant;
pub mod status;

pub use content::ContentId;
pub use error::TypesError;
pub use height::Height;
pub use params::VerificationParams;
pub use participant::ParticipantId;
pub use status::QueueStatus;
