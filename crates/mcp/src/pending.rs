//! Correlation table of in-flight requests

use crate::error::{McpError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

type Waiter = oneshot::Sender<Result<Value>>;

/// Pending requests keyed by id. Each entry is settled at most once.
#[derive(Debug)]
pub struct PendingRequests {
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, Waiter>>,
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
        }
    }
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly increasing, starting at 1
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a waiter for `id`
    pub fn register(&self, id: u64) -> oneshot::Receiver<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(id, tx);
        rx
    }

    /// Settle `id`. Returns false when nothing was waiting.
    pub fn resolve(&self, id: u64, outcome: Result<Value>) -> bool {
        let waiter = self.waiters.lock().remove(&id);
        match waiter {
            Some(tx) => {
                // receiver gone means the caller already timed out
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop `id` without settling it
    pub fn remove(&self, id: u64) -> bool {
        self.waiters.lock().remove(&id).is_some()
    }

    /// Settle every waiter with an error built by `make_error`
    pub fn fail_all(&self, make_error: impl Fn() -> McpError) -> usize {
        let drained: Vec<Waiter> = self.waiters.lock().drain().map(|(_, tx)| tx).collect();
        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Err(make_error()));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
