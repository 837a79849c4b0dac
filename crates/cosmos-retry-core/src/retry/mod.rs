//! Retry decision policy.
//!
//! This module classifies request failures (timeouts, unavailable replicas,
//! coordinator errors, aborted requests) and decides per failure whether to
//! stop, retry immediately, or retry after a backoff. The execution loop in
//! [`run_with_retry`] drives a request through those decisions.

mod classify;
mod error;
mod jitter;
mod policy;
mod run;

pub use classify::{classify, AbortReason, CoordinatorError, Failure, RetryClass, WriteType};
pub use error::RequestError;
pub use jitter::{JitterSource, NoJitter, SeededJitter, ThreadRngJitter};
pub use policy::{RetryBudget, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, run_with_retry_stats, Attempt, RetryStats, Target};
