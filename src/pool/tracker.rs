//! Completion tracking for worker loops
//!
//! [`CompletionTracker`] is a countdown latch. Each worker loop holds one
//! [`CompletionGuard`]; dropping the guard counts that worker as exited, so every
//! exit path (a closed queue or a panic escaping the loop) decrements exactly once.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Latch {
    remaining: Mutex<usize>,
    exited: Condvar,
}

/// Countdown latch that lets shutdown block until every worker loop has exited
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    latch: Arc<Latch>,
}

impl CompletionTracker {
    /// Create a tracker expecting `count` workers
    pub fn new(count: usize) -> Self {
        Self {
            latch: Arc::new(Latch {
                remaining: Mutex::new(count),
                exited: Condvar::new(),
            }),
        }
    }

    /// Hand out the guard a single worker loop holds for its lifetime
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            latch: Arc::clone(&self.latch),
        }
    }

    /// Number of workers that have not exited yet
    pub fn remaining(&self) -> usize {
        *self.latch.remaining.lock()
    }

    /// Block until every worker has exited
    pub fn wait(&self) {
        self.wait_at_most(0);
    }

    /// Block until no more than `limit` workers are left running
    pub fn wait_at_most(&self, limit: usize) {
        let mut remaining = self.latch.remaining.lock();
        while *remaining > limit {
            self.latch.exited.wait(&mut remaining);
        }
    }

    /// Block until every worker has exited or `timeout` elapses.
    ///
    /// Returns `true` when the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_at_most_timeout(0, timeout)
    }

    /// Like [`wait_at_most`](Self::wait_at_most), giving up after `timeout`.
    ///
    /// Returns `true` when the count dropped to `limit` or below.
    pub fn wait_at_most_timeout(&self, limit: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.latch.remaining.lock();
        while *remaining > limit {
            if self
                .latch
                .exited
                .wait_until(&mut remaining, deadline)
                .timed_out()
            {
                return *remaining <= limit;
            }
        }
        true
    }
}

impl Latch {
    fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        // Waiters may be waiting for any count, not only zero
        self.exited.notify_all();
    }
}

/// Decrements its tracker once when dropped
#[derive(Debug)]
pub struct CompletionGuard {
    latch: Arc<Latch>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
