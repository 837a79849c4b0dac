//! Request failure type handed to the retry loop.

use super::classify::Failure;

/// A failed request attempt: the classified failure plus the collaborator's message.
/// When the policy stops, this is the error propagated to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{failure}: {message}")]
pub struct RequestError {
    pub failure: Failure,
    pub message: String,
}

impl RequestError {
    pub fn new(failure: Failure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
        }
    }
}

impl From<Failure> for RequestError {
    fn from(failure: Failure) -> Self {
        let message = failure.to_string();
        Self { failure, message }
    }
}
