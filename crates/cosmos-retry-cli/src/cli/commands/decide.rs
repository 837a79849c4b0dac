//! `cosmos-retry decide <category>` – print one decision.

use cosmos_retry_core::retry::{classify, RetryDecision, RetryPolicy};

use crate::cli::FailureCategory;

/// Human-readable form of a decision.
pub fn describe(decision: &RetryDecision) -> String {
    match decision {
        RetryDecision::Stop => "stop".to_string(),
        RetryDecision::RetrySameTarget => "retry same target".to_string(),
        RetryDecision::RetryNextTarget => "retry next target".to_string(),
        RetryDecision::RetryAfter(d) => format!("retry same target after {}ms", d.as_millis()),
    }
}

pub fn run_decide(policy: &RetryPolicy, category: FailureCategory, attempt: u32) {
    let failure = category.to_failure();
    let decision = policy.plan(&failure, attempt);
    println!(
        "{} (class {:?}) at retry {}: {}",
        failure,
        classify(&failure),
        attempt,
        describe(&decision)
    );
}
