//! `cosmos-retry config` – show config path and effective policy.

use anyhow::Result;
use cosmos_retry_core::config;
use cosmos_retry_core::retry::RetryPolicy;
use std::path::Path;

pub fn run_config(path_override: Option<&Path>, policy: &RetryPolicy) -> Result<()> {
    let path = match path_override {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    let backoff = |n| {
        policy
            .backoff_delay(n)
            .map(|d| format!("{}ms", d.as_millis()))
            .unwrap_or_else(|| "-".to_string())
    };
    println!("config file:        {}", path.display());
    println!("max retries:        {}", policy.budget());
    println!("jitter ceiling:     {}ms", policy.jitter_ceiling_millis());
    println!("backoff (retry 0):  {}", backoff(0));
    println!("backoff (retry 1):  {}", backoff(1));
    Ok(())
}
