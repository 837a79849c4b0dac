//! Retry loop: run a request until success or the policy says stop.

use std::time::Duration;

use super::error::RequestError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

/// Where the next attempt should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// First attempt.
    Initial,
    /// Same coordinator as the previous attempt.
    Same,
    /// Any healthy coordinator, preferably a different one.
    Next,
}

/// One attempt handed to the request closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Number of retries before this attempt (0 for the first).
    pub number: u32,
    pub target: Target,
}

/// Counters for one request driven by [`run_with_retry_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Total time spent in backoff waits.
    pub backoff: Duration,
}

/// Runs a request until it succeeds or the retry policy says to stop.
/// On stop, or once `cancel` is cancelled, the failure of the last attempt is
/// returned unchanged.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, cancel: &CancelToken, f: F) -> Result<T, RequestError>
where
    F: FnMut(Attempt) -> Result<T, RequestError>,
{
    run_with_retry_stats(policy, cancel, f).0
}

/// Same as [`run_with_retry`], also reporting attempt and backoff counters.
pub fn run_with_retry_stats<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut f: F,
) -> (Result<T, RequestError>, RetryStats)
where
    F: FnMut(Attempt) -> Result<T, RequestError>,
{
    let mut stats = RetryStats::default();
    let mut attempt = Attempt {
        number: 0,
        target: Target::Initial,
    };
    loop {
        stats.attempts = stats.attempts.saturating_add(1);
        let err = match f(attempt) {
            Ok(v) => return (Ok(v), stats),
            Err(e) => e,
        };
        let target = match policy.on_failure(&err.failure, attempt.number, cancel) {
            RetryDecision::Stop => {
                tracing::debug!(retry = attempt.number, error = %err, "not retrying");
                return (Err(err), stats);
            }
            RetryDecision::RetryNextTarget => Target::Next,
            RetryDecision::RetrySameTarget => Target::Same,
            RetryDecision::RetryAfter(delay) => {
                stats.backoff = stats.backoff.saturating_add(delay);
                Target::Same
            }
        };
        if cancel.is_cancelled() {
            tracing::debug!(retry = attempt.number, error = %err, "cancelled, not retrying");
            return (Err(err), stats);
        }
        tracing::debug!(retry = attempt.number, error = %err, ?target, "retrying request");
        attempt = Attempt {
            number: attempt.number.saturating_add(1),
            target,
        };
    }
}
