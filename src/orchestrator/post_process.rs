//! Post-call processing.
//!
//! Turns whatever the endpoint produced (reply of any status, or a transport
//! failure) into a ledger record plus the error classification for the caller.

use crate::engine::{BackendReply, TransportFailure};
use crate::error::{CheckError, CONNECTION_FAILURE_MESSAGE};
use crate::model::{CheckRequest, ResultRecord};
use crate::normalize::{decode_error, decode_mentioned, decode_position, normalize};
use serde_json::Value;

/// Interpret a settled check. The record is always fully populated; the
/// second element is `Some` exactly when the record carries an error.
pub(crate) fn interpret_outcome(
    request: &CheckRequest,
    outcome: Result<BackendReply, TransportFailure>,
) -> (ResultRecord, Option<CheckError>) {
    match outcome {
        Err(failure) => {
            let message = failure
                .message
                .unwrap_or_else(|| CONNECTION_FAILURE_MESSAGE.to_string());
            (
                ResultRecord::failed(&request.prompt, message.clone()),
                Some(CheckError::ConnectionFailure(message)),
            )
        }
        Ok(reply) if !reply.is_success() => {
            let body = reply.body.unwrap_or(Value::Null);
            let message = decode_error(&body)
                .unwrap_or_else(|| format!("Backend returned status {}", reply.status));
            let record = ResultRecord::new(
                request.prompt.clone(),
                decode_mentioned(&body),
                decode_position(&body),
                Some(message.clone()),
            );
            (record, Some(CheckError::BackendError(message)))
        }
        Ok(reply) => {
            let record = normalize(request, reply.body.as_ref().unwrap_or(&Value::Null));
            let failure = record
                .error()
                .map(|e| CheckError::BackendError(e.to_string()));
            (record, failure)
        }
    }
}
