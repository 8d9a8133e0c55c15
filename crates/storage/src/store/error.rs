#![forbid(unsafe_code)]

use motion_core::MotionError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error(transparent)]
    Motion(#[from] MotionError),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("RESET_REQUIRED: {0}")]
    ResetRequired(&'static str),
    #[error("revision mismatch (expected={expected}, actual={actual})")]
    RevisionMismatch { expected: i64, actual: i64 },
    #[error("identifier already taken: {0}")]
    IdentifierTaken(String),
    #[error("unknown id")]
    UnknownId,
}
