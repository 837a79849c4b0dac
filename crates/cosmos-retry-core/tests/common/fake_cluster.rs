//! Scripted replica set for integration tests.
//!
//! Each replica answers requests from a queue of scripted outcomes; once its
//! script is exhausted it succeeds. The cluster routes `Target::Next` to the
//! following replica and `Target::Same` back to the current one.

use std::collections::VecDeque;
use std::sync::Mutex;

use cosmos_retry_core::retry::{Attempt, Failure, RequestError, Target};

pub struct FakeCluster {
    replicas: Vec<Mutex<VecDeque<Failure>>>,
    current: Mutex<usize>,
    log: Mutex<Vec<(u32, usize)>>,
}

impl FakeCluster {
    pub fn new(scripts: Vec<Vec<Failure>>) -> Self {
        Self {
            replicas: scripts
                .into_iter()
                .map(|s| Mutex::new(s.into_iter().collect()))
                .collect(),
            current: Mutex::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Execute one attempt, returning the replica index that served it.
    pub fn execute(&self, attempt: Attempt) -> Result<usize, RequestError> {
        let mut current = self.current.lock().unwrap();
        if attempt.target == Target::Next {
            *current = (*current + 1) % self.replicas.len();
        }
        let replica = *current;
        self.log.lock().unwrap().push((attempt.number, replica));
        match self.replicas[replica].lock().unwrap().pop_front() {
            Some(failure) => Err(RequestError::new(failure, format!("replica {}", replica))),
            None => Ok(replica),
        }
    }

    /// (attempt number, replica) for every attempt seen so far.
    pub fn log(&self) -> Vec<(u32, usize)> {
        self.log.lock().unwrap().clone()
    }
}
