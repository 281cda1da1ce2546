mod evaluation;

pub use evaluation::HttpBackend;

use crate::model::CheckRequest;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// What came back from the endpoint, whatever the status code.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: u16,
    /// Parsed JSON body, or `None` when the body was empty or not JSON.
    pub body: Option<Value>,
}

impl BackendReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a usable reply.
///
/// `message` is `None` when the endpoint could not be reached at all; callers
/// substitute their own default text in that case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", message.as_deref().unwrap_or("transport failure"))]
pub struct TransportFailure {
    pub message: Option<String>,
}

impl TransportFailure {
    pub fn unreachable() -> Self {
        Self { message: None }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

/// Seam to the external evaluation service.
#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    async fn evaluate(&self, request: &CheckRequest) -> Result<BackendReply, TransportFailure>;
}
