//! Failure categories reported by the request-execution layer, and their
//! classification into retry classes.

use std::fmt;

/// Kind of write that timed out. Carried as context only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    Simple,
    Batch,
    UnloggedBatch,
    Counter,
    BatchLog,
    Cas,
    View,
    Cdc,
}

/// Error reported by the coordinator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Coordinator is overloaded (rate limited).
    Overloaded,
    /// Replicas failed the write.
    WriteFailure,
    ReadFailure,
    Syntax,
    Invalid,
    Unauthorized,
    AlreadyExists,
    Truncate,
    Protocol,
    Server,
    FunctionFailure,
    Unprepared,
}

impl CoordinatorError {
    /// Only overload and write failures are retried, with backoff.
    pub fn is_backoff_retryable(self) -> bool {
        matches!(self, CoordinatorError::Overloaded | CoordinatorError::WriteFailure)
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoordinatorError::Overloaded => "overloaded",
            CoordinatorError::WriteFailure => "write failure",
            CoordinatorError::ReadFailure => "read failure",
            CoordinatorError::Syntax => "syntax error",
            CoordinatorError::Invalid => "invalid query",
            CoordinatorError::Unauthorized => "unauthorized",
            CoordinatorError::AlreadyExists => "already exists",
            CoordinatorError::Truncate => "truncate error",
            CoordinatorError::Protocol => "protocol error",
            CoordinatorError::Server => "server error",
            CoordinatorError::FunctionFailure => "function failure",
            CoordinatorError::Unprepared => "unprepared statement",
        };
        f.write_str(s)
    }
}

/// Why a request was aborted before a response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The connection carrying the request was closed.
    ConnectionClosed,
    /// The connection stopped answering heartbeats.
    HeartbeatFailed,
    /// Anything else (e.g. local encoding failure).
    Other(String),
}

impl AbortReason {
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, AbortReason::ConnectionClosed | AbortReason::HeartbeatFailed)
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ConnectionClosed => f.write_str("connection closed"),
            AbortReason::HeartbeatFailed => f.write_str("heartbeat failed"),
            AbortReason::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// One failed attempt, as observed by the request-execution layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    ReadTimeout {
        required: u32,
        received: u32,
        data_present: bool,
    },
    WriteTimeout {
        write_type: WriteType,
        required: u32,
        received: u32,
    },
    Unavailable {
        required: u32,
        alive: u32,
    },
    Coordinator(CoordinatorError),
    Aborted(AbortReason),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::ReadTimeout {
                required, received, ..
            } => write!(f, "read timeout ({}/{} responses)", received, required),
            Failure::WriteTimeout {
                write_type,
                required,
                received,
            } => write!(
                f,
                "write timeout ({:?}, {}/{} acks)",
                write_type, received, required
            ),
            Failure::Unavailable { required, alive } => {
                write!(f, "unavailable ({}/{} replicas alive)", alive, required)
            }
            Failure::Coordinator(e) => write!(f, "coordinator error: {}", e),
            Failure::Aborted(reason) => write!(f, "request aborted: {}", reason),
        }
    }
}

/// How the policy treats a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Retry without delay, possibly on another replica.
    Immediate,
    /// Retry the same target after a backoff wait.
    Backoff,
    /// Never retried.
    NonRetryable,
}

/// Classify a failure into a retry class.
pub fn classify(failure: &Failure) -> RetryClass {
    match failure {
        Failure::ReadTimeout { .. } | Failure::WriteTimeout { .. } | Failure::Unavailable { .. } => {
            RetryClass::Immediate
        }
        Failure::Aborted(reason) if reason.is_connection_loss() => RetryClass::Immediate,
        Failure::Aborted(_) => RetryClass::NonRetryable,
        Failure::Coordinator(e) if e.is_backoff_retryable() => RetryClass::Backoff,
        Failure::Coordinator(_) => RetryClass::NonRetryable,
    }
}
