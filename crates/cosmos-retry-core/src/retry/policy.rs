use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::classify::{AbortReason, CoordinatorError, Failure};
use super::jitter::{JitterSource, ThreadRngJitter};
use crate::config::{ConfigError, RetryConfig, DEFAULT_JITTER_CEILING_MILLIS};
use crate::control::CancelToken;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry; propagate the original failure.
    Stop,
    /// Retry on the same target without delay.
    RetrySameTarget,
    /// Retry immediately, possibly on a different replica.
    RetryNextTarget,
    /// Retry the same target after the given delay.
    RetryAfter(Duration),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        !matches!(self, RetryDecision::Stop)
    }

    /// Backoff carried by the decision, if any.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            RetryDecision::RetryAfter(d) => Some(*d),
            _ => None,
        }
    }
}

/// Retry budget: a cap on retries, or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    Unbounded,
    Bounded(u32),
}

impl RetryBudget {
    /// Parse the `maxRetryCount` form: -1 is unbounded, negatives below that are invalid.
    pub fn from_raw(max_retry_count: i32) -> Option<Self> {
        match max_retry_count {
            -1 => Some(RetryBudget::Unbounded),
            n if n >= 0 => Some(RetryBudget::Bounded(n as u32)),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            RetryBudget::Unbounded => -1,
            RetryBudget::Bounded(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        }
    }

    /// True if another retry is permitted after `retry_number` prior retries.
    pub fn allows(&self, retry_number: u32) -> bool {
        match self {
            RetryBudget::Unbounded => true,
            RetryBudget::Bounded(max) => retry_number < *max,
        }
    }
}

impl fmt::Display for RetryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryBudget::Unbounded => f.write_str("unbounded"),
            RetryBudget::Bounded(n) => write!(f, "{}", n),
        }
    }
}

/// Retry policy for timeouts, unavailability, overload and lost connections.
///
/// Timeouts, unavailable replicas and connection-loss aborts are retried
/// immediately on the next target while the budget allows. Overloaded and
/// write-failure coordinator errors are retried on the same target after a
/// backoff: a fixed delay when the budget is unbounded, otherwise
/// `growing * retry_number` plus random jitter. All other failures stop.
///
/// The policy is read-only after construction and can be shared across threads.
#[derive(Clone)]
pub struct RetryPolicy {
    budget: RetryBudget,
    fixed_backoff: Duration,
    growing_backoff: Duration,
    jitter_ceiling_millis: u64,
    jitter: Arc<dyn JitterSource>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("budget", &self.budget)
            .field("fixed_backoff", &self.fixed_backoff)
            .field("growing_backoff", &self.growing_backoff)
            .field("jitter_ceiling_millis", &self.jitter_ceiling_millis)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let cfg = RetryConfig::default();
        Self {
            budget: RetryBudget::Bounded(cfg.max_retry_count as u32),
            fixed_backoff: Duration::from_millis(cfg.fixed_back_off_time_millis),
            growing_backoff: Duration::from_millis(cfg.growing_back_off_time_millis),
            jitter_ceiling_millis: DEFAULT_JITTER_CEILING_MILLIS,
            jitter: Arc::new(ThreadRngJitter),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from configuration, with the default jitter ceiling and source.
    pub fn from_config(cfg: &RetryConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            budget: cfg.budget()?,
            fixed_backoff: Duration::from_millis(cfg.fixed_back_off_time_millis),
            growing_backoff: Duration::from_millis(cfg.growing_back_off_time_millis),
            ..Self::default()
        })
    }

    pub fn with_jitter_ceiling(mut self, ceiling_millis: u64) -> Self {
        self.jitter_ceiling_millis = ceiling_millis;
        self
    }

    pub fn with_jitter_source(mut self, source: Arc<dyn JitterSource>) -> Self {
        self.jitter = source;
        self
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// `maxRetryCount` in its raw form (-1 = unbounded).
    pub fn max_retry_count(&self) -> i32 {
        self.budget.as_raw()
    }

    pub fn jitter_ceiling_millis(&self) -> u64 {
        self.jitter_ceiling_millis
    }

    fn retry_next_or_stop(&self, retry_number: u32) -> RetryDecision {
        if self.budget.allows(retry_number) {
            RetryDecision::RetryNextTarget
        } else {
            RetryDecision::Stop
        }
    }

    pub fn on_read_timeout(&self, retry_number: u32) -> RetryDecision {
        self.retry_next_or_stop(retry_number)
    }

    pub fn on_write_timeout(&self, retry_number: u32) -> RetryDecision {
        self.retry_next_or_stop(retry_number)
    }

    pub fn on_unavailable(&self, retry_number: u32) -> RetryDecision {
        self.retry_next_or_stop(retry_number)
    }

    /// Connection-loss aborts follow the budget; any other abort stops.
    pub fn on_request_aborted(&self, reason: &AbortReason, retry_number: u32) -> RetryDecision {
        if reason.is_connection_loss() {
            self.retry_next_or_stop(retry_number)
        } else {
            RetryDecision::Stop
        }
    }

    /// Backoff before retry `retry_number`, or `None` if the budget is spent.
    /// Draws fresh jitter on every call when the budget is bounded.
    pub fn backoff_delay(&self, retry_number: u32) -> Option<Duration> {
        match self.budget {
            _ if !self.budget.allows(retry_number) => None,
            RetryBudget::Unbounded => Some(self.fixed_backoff),
            RetryBudget::Bounded(_) => {
                let jitter = self.jitter.draw(self.jitter_ceiling_millis);
                let delay = self
                    .growing_backoff
                    .saturating_mul(retry_number)
                    .saturating_add(Duration::from_millis(jitter));
                Some(delay)
            }
        }
    }

    /// Coordinator errors: overload and write failures wait out the backoff on
    /// `cancel`, then return `RetryAfter` with the delay already elapsed. An
    /// interrupted wait and every other error kind stop.
    pub fn on_error_response(
        &self,
        error: &CoordinatorError,
        retry_number: u32,
        cancel: &CancelToken,
    ) -> RetryDecision {
        if !error.is_backoff_retryable() {
            return RetryDecision::Stop;
        }
        match self.backoff_delay(retry_number) {
            Some(delay) => match cancel.wait_timeout(delay) {
                Ok(()) => RetryDecision::RetryAfter(delay),
                Err(_) => RetryDecision::Stop,
            },
            None => RetryDecision::Stop,
        }
    }

    /// Decision for any failure, sleeping where the category requires it.
    pub fn on_failure(
        &self,
        failure: &Failure,
        retry_number: u32,
        cancel: &CancelToken,
    ) -> RetryDecision {
        match failure {
            Failure::ReadTimeout { .. } => self.on_read_timeout(retry_number),
            Failure::WriteTimeout { .. } => self.on_write_timeout(retry_number),
            Failure::Unavailable { .. } => self.on_unavailable(retry_number),
            Failure::Coordinator(e) => self.on_error_response(e, retry_number, cancel),
            Failure::Aborted(reason) => self.on_request_aborted(reason, retry_number),
        }
    }

    /// Decision for any failure without sleeping. Backoff categories report the
    /// delay the caller would have to wait.
    pub fn plan(&self, failure: &Failure, retry_number: u32) -> RetryDecision {
        match failure {
            Failure::Coordinator(e) if e.is_backoff_retryable() => self
                .backoff_delay(retry_number)
                .map_or(RetryDecision::Stop, RetryDecision::RetryAfter),
            Failure::Coordinator(_) => RetryDecision::Stop,
            Failure::ReadTimeout { .. } => self.on_read_timeout(retry_number),
            Failure::WriteTimeout { .. } => self.on_write_timeout(retry_number),
            Failure::Unavailable { .. } => self.on_unavailable(retry_number),
            Failure::Aborted(reason) => self.on_request_aborted(reason, retry_number),
        }
    }
}
