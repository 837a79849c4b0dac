//! Tests for policy override flags.

use super::parse;
use crate::cli::{CliCommand, FailureCategory, PolicyArgs};
use cosmos_retry_core::config::RetryConfig;
use cosmos_retry_core::retry::{RetryBudget, RetryDecision};
use std::time::Duration;

fn policy_args(args: &[&str]) -> PolicyArgs {
    match parse(args) {
        CliCommand::Decide { policy, .. } => policy,
        _ => panic!("expected Decide"),
    }
}

#[test]
fn negative_max_retry_count_parses() {
    let p = policy_args(&["cosmos-retry", "decide", "unavailable", "--max-retry-count", "-1"]);
    assert_eq!(p.max_retry_count, Some(-1));
}

#[test]
fn overrides_replace_config_values() {
    let p = policy_args(&[
        "cosmos-retry",
        "decide",
        "overloaded",
        "--max-retry-count",
        "3",
        "--growing-ms",
        "100",
        "--config",
        "/tmp/retry.toml",
    ]);
    assert_eq!(p.config.as_deref(), Some(std::path::Path::new("/tmp/retry.toml")));
    let retry = p.apply(RetryConfig::default());
    assert_eq!(retry.max_retry_count, 3);
    assert_eq!(retry.growing_back_off_time_millis, 100);
    assert_eq!(retry.fixed_back_off_time_millis, 1000);
}

#[test]
fn built_policy_honours_overrides() {
    let p = policy_args(&[
        "cosmos-retry",
        "decide",
        "overloaded",
        "--max-retry-count",
        "3",
        "--growing-ms",
        "100",
        "--jitter-ceiling-ms",
        "0",
    ]);
    let policy = p.build_policy(&p.apply(RetryConfig::default())).unwrap();
    assert_eq!(policy.budget(), RetryBudget::Bounded(3));
    let failure = FailureCategory::Overloaded.to_failure();
    assert_eq!(
        policy.plan(&failure, 2),
        RetryDecision::RetryAfter(Duration::from_millis(200))
    );
    assert_eq!(policy.plan(&failure, 3), RetryDecision::Stop);
}

#[test]
fn invalid_max_retry_count_is_rejected_when_building() {
    let p = policy_args(&["cosmos-retry", "decide", "syntax", "--max-retry-count", "-5"]);
    assert!(p.build_policy(&p.apply(RetryConfig::default())).is_err());
}

#[test]
fn categories_map_to_expected_decisions() {
    let p = PolicyArgs::default();
    let policy = p
        .build_policy(&RetryConfig {
            max_retry_count: 1,
            ..RetryConfig::default()
        })
        .unwrap();
    assert_eq!(
        policy.plan(&FailureCategory::Heartbeat.to_failure(), 0),
        RetryDecision::RetryNextTarget
    );
    assert_eq!(
        policy.plan(&FailureCategory::AbortedOther.to_failure(), 0),
        RetryDecision::Stop
    );
    assert_eq!(
        policy.plan(&FailureCategory::ServerError.to_failure(), 0),
        RetryDecision::Stop
    );
}
