//! Error taxonomy for the check workflow.

use thiserror::Error;

/// Banner text for a submission with an empty prompt or brand.
pub const INVALID_INPUT_MESSAGE: &str = "Please enter both a prompt and a brand name.";

/// Fallback text when the endpoint cannot be reached and the transport gave no reason.
pub const CONNECTION_FAILURE_MESSAGE: &str = "Unable to connect to backend...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ConnectionFailure,
    BackendError,
    Busy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("{}", INVALID_INPUT_MESSAGE)]
    InvalidInput,

    #[error("{0}")]
    ConnectionFailure(String),

    #[error("{0}")]
    BackendError(String),

    #[error("A check is already in progress.")]
    Busy,
}

impl CheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckError::InvalidInput => ErrorKind::InvalidInput,
            CheckError::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            CheckError::BackendError(_) => ErrorKind::BackendError,
            CheckError::Busy => ErrorKind::Busy,
        }
    }

    /// Whether a ledger entry was written for this failure.
    pub fn is_recorded(&self) -> bool {
        matches!(
            self,
            CheckError::ConnectionFailure(_) | CheckError::BackendError(_)
        )
    }
}
