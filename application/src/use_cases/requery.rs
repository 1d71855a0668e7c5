//! Re-query attempt tracking
//!
//! Bounds the re-queries run for one correlation id and spaces them by a
//! cooldown. Counting goes through the map's entry API, so concurrent
//! callers for the same id can never exceed the bound together.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    attempts: u32,
    /// Earliest moment the next attempt may start
    next_allowed: Instant,
    first_seen: Instant,
}

/// Answer to a request for another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeryPermit {
    /// Attempt number `attempt` (1-based) may run after waiting `wait`
    Granted { attempt: u32, wait: Duration },
    Exhausted,
}

#[derive(Debug)]
pub struct RequeryTracker {
    states: DashMap<String, AttemptState>,
    max_attempts: u32,
    cooldown: Duration,
    ttl: Duration,
}

impl RequeryTracker {
    pub fn new(max_attempts: u32, cooldown: Duration, ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            max_attempts,
            cooldown,
            ttl,
        }
    }

    /// Reserve the next attempt for `correlation_id`. The first attempt is
    /// spaced one cooldown after the id was first seen.
    pub fn try_acquire(&self, correlation_id: &str) -> RequeryPermit {
        let now = Instant::now();
        let mut state = self
            .states
            .entry(correlation_id.to_string())
            .or_insert_with(|| AttemptState {
                attempts: 0,
                next_allowed: now + self.cooldown,
                first_seen: now,
            });

        if state.attempts >= self.max_attempts {
            return RequeryPermit::Exhausted;
        }

        state.attempts += 1;
        let start = state.next_allowed.max(now);
        state.next_allowed = start + self.cooldown;
        debug!(
            correlation_id,
            attempt = state.attempts,
            "Re-query attempt reserved"
        );
        RequeryPermit::Granted {
            attempt: state.attempts,
            wait: start - now,
        }
    }

    pub fn attempts(&self, correlation_id: &str) -> u32 {
        self.states
            .get(correlation_id)
            .map(|s| s.attempts)
            .unwrap_or(0)
    }

    /// Drop counters older than the tracker TTL
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.states.len();
        self.states
            .retain(|_, s| now.duration_since(s.first_seen) < self.ttl);
        before - self.states.len()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
