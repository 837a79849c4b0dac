//! Random jitter sources for backoff delays.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Source of uniformly distributed jitter.
///
/// `draw(ceiling)` returns a value in `[0, ceiling)`, or 0 when `ceiling` is 0.
/// Implementations are shared across threads by the policy.
pub trait JitterSource: Send + Sync {
    fn draw(&self, ceiling_millis: u64) -> u64;
}

/// Draws from the thread-local RNG. Default for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn draw(&self, ceiling_millis: u64) -> u64 {
        if ceiling_millis == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..ceiling_millis)
    }
}

/// Deterministic source seeded once; repeated runs draw the same sequence.
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn draw(&self, ceiling_millis: u64) -> u64 {
        if ceiling_millis == 0 {
            return 0;
        }
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..ceiling_millis)
    }
}

/// Always 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn draw(&self, _ceiling_millis: u64) -> u64 {
        0
    }
}
