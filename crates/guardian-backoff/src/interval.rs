//! A flat retry interval and a bounded attempt counter.
//!
//! The DocStore facade needs two distinct retry shapes (§4.1): an
//! immediate refetch-and-rebase retry on a version conflict, and a flat
//! 2-second sleep-and-retry on "collection missing", both capped at 5
//! attempts. Unlike the teacher's `ReconnectPolicy`, which grows its delay
//! exponentially across attempts, the collection-missing backoff observed
//! in the source this was distilled from never grows: every retry sleeps
//! the same fixed duration. `FixedInterval` models exactly that one
//! policy rather than the teacher's full exponential/jittered family.

use std::time::Duration;

/// A backoff that always waits the same duration, regardless of attempt
/// number. Default matches the DocStore contract's "starting 2s".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    delay: Duration,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Suspends the current task for this interval's delay.
    pub async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
        }
    }
}

/// A bounded count of retry attempts, shared by both of the DocStore's
/// retry loops (conflict-rebase and missing-collection).
#[derive(Debug, Clone, Copy)]
pub struct AttemptBudget {
    max: u32,
    used: u32,
}

impl AttemptBudget {
    pub fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    /// The 5-attempt cap used throughout the DocStore facade.
    pub fn docstore_default() -> Self {
        Self::new(5)
    }

    /// Records one attempt. Returns `false` once the budget is exhausted
    /// (the caller should surface `ConflictExhausted` or give up).
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn attempts_used(&self) -> u32 {
        self.used
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.max
    }
}
