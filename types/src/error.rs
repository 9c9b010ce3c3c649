//! Parse and validation errors for the shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid content id: {0}")]
    InvalidContentId(String),

    #[error("participant id must not be empty")]
    InvalidParticipant,

    #[error("unknown queue status: {0}")]
    InvalidStatus(String),

    #[error("invalid verification params: {0}")]
    InvalidParams(String),
}
