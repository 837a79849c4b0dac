//! `cosmos-retry simulate <category>` – run the retry loop against a synthetic failing request.

use anyhow::{Context, Result};
use cosmos_retry_core::control::SessionControl;
use cosmos_retry_core::retry::{run_with_retry_stats, RequestError, RetryPolicy};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::FailureCategory;

pub async fn run_simulate(policy: RetryPolicy, category: FailureCategory, limit: u32) -> Result<()> {
    let control = Arc::new(SessionControl::new());
    let cancel = control.register(0);
    let failure = category.to_failure();

    let task = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        run_with_retry_stats(&policy, &cancel, |attempt| {
            println!(
                "  attempt {:>4}  {:>8}ms  {:?}",
                attempt.number,
                start.elapsed().as_millis(),
                attempt.target
            );
            if attempt.number < limit {
                Err(RequestError::new(failure.clone(), "simulated"))
            } else {
                Ok(())
            }
        })
    });

    let interrupt = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling simulation");
                control.shutdown();
            }
        })
    };

    let (res, stats) = task.await.context("simulation task join")?;
    interrupt.abort();
    control.unregister(0);

    match res {
        Ok(()) => println!("succeeded after {} attempts", stats.attempts),
        Err(e) => println!("gave up after {} attempts: {}", stats.attempts, e),
    }
    println!("total backoff: {}ms", stats.backoff.as_millis());
    Ok(())
}
