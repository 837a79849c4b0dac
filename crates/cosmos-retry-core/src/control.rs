//! Session control for cancellation: shared cancel tokens per in-flight request.
//!
//! Each request driven by the execution loop is registered with a cancel token.
//! Aborting a request (or shutting down the whole session) cancels its token,
//! which wakes any backoff wait currently blocked on it.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// A wait was cut short because its token was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("wait interrupted by cancellation")]
pub struct Interrupted;

#[derive(Default)]
struct TokenState {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Cloneable cancellation flag with an interruptible timed wait.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the token and wake every waiter.
    pub fn cancel(&self) {
        *self.flag() = true;
        self.state.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Block for `timeout` unless the token is (or becomes) cancelled.
    /// A timeout too large to represent as a deadline waits until cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now().checked_add(timeout);
        let mut cancelled = self.flag();
        loop {
            if *cancelled {
                return Err(Interrupted);
            }
            cancelled = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    self.state
                        .cond
                        .wait_timeout(cancelled, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .state
                    .cond
                    .wait(cancelled)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

/// Shared registry of request id -> cancel token. The execution layer registers
/// each request before running it; session shutdown cancels them all.
#[derive(Default)]
pub struct SessionControl {
    requests: RwLock<HashMap<u64, CancelToken>>,
    shutdown: CancelToken,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-flight request; returns the token to pass to the retry loop.
    /// After shutdown the returned token is already cancelled.
    pub fn register(&self, request_id: u64) -> CancelToken {
        let token = CancelToken::new();
        let mut requests = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.is_cancelled() {
            token.cancel();
        }
        requests.insert(request_id, token.clone());
        token
    }

    /// Unregister a request (call when it finishes, success or failure).
    pub fn unregister(&self, request_id: u64) {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_id);
    }

    /// Cancel one request. Returns false if it is not registered.
    pub fn request_abort(&self, request_id: u64) -> bool {
        match self
            .requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request_id)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered request and every request registered from now on.
    pub fn shutdown(&self) {
        let requests = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.shutdown.cancel();
        for token in requests.values() {
            token.cancel();
        }
        tracing::debug!(in_flight = requests.len(), "session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn in_flight(&self) -> usize {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_completes_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert_eq!(token.wait_timeout(Duration::from_millis(20)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_on_cancelled_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert_eq!(token.wait_timeout(Duration::from_secs(10)), Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.wait_timeout(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert_eq!(waiter.join().unwrap(), Err(Interrupted));
    }

    #[test]
    fn request_abort_only_hits_target() {
        let control = SessionControl::new();
        let a = control.register(1);
        let b = control.register(2);
        assert!(control.request_abort(1));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!control.request_abort(3));
    }

    #[test]
    fn shutdown_cancels_registered_and_future_requests() {
        let control = SessionControl::new();
        let a = control.register(1);
        control.shutdown();
        assert!(control.is_shut_down());
        assert!(a.is_cancelled());
        assert!(control.register(2).is_cancelled());
    }

    #[test]
    fn unregister_removes_request() {
        let control = SessionControl::new();
        control.register(7);
        assert_eq!(control.in_flight(), 1);
        control.unregister(7);
        assert_eq!(control.in_flight(), 0);
        assert!(!control.request_abort(7));
    }
}
