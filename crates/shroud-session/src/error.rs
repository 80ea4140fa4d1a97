//! Error types for session storage

use shroud_pii::MappingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mapping: {0}")]
    Mapping(#[from] MappingError),

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Invalid session key: {0}")]
    InvalidKey(String),

    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
