//! Sliding-window rate limiting.
//!
//! A window is a list of admission timestamps pruned lazily on every check;
//! there is no background sweep and no queuing. Rejected calls are simply
//! refused.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use shoutout_shared::time::Clock;

/// Capacity of a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_events: usize,
    pub window_millis: i64,
}

impl RateLimitPolicy {
    /// Inbound events on one live connection
    pub const CONNECTION: Self = Self::new(5, 10_000);
    /// `POST /broadcast` and `POST /invite`, per network address
    pub const BROADCAST: Self = Self::new(10, 10_000);
    /// Listing endpoints, per credential or network address
    pub const LISTING: Self = Self::new(60, 60_000);

    pub const fn new(max_events: usize, window_millis: i64) -> Self {
        Self {
            max_events,
            window_millis,
        }
    }
}

/// A single sliding window, owned by whoever needs it (e.g. a connection task).
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    policy: RateLimitPolicy,
    recent: VecDeque<i64>,
}

impl SlidingWindow {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            recent: VecDeque::with_capacity(policy.max_events),
        }
    }

    /// Record an event at `now_millis` if the window has room.
    pub fn admit(&mut self, now_millis: i64) -> bool {
        self.prune(now_millis);
        if self.recent.len() >= self.policy.max_events {
            return false;
        }
        self.recent.push_back(now_millis);
        true
    }

    fn prune(&mut self, now_millis: i64) {
        while self
            .recent
            .front()
            .is_some_and(|&t| now_millis - t > self.policy.window_millis)
        {
            self.recent.pop_front();
        }
    }

    fn is_idle(&mut self, now_millis: i64) -> bool {
        self.prune(now_millis);
        self.recent.is_empty()
    }
}

/// Key count above which idle windows are dropped on the next check.
const COMPACT_THRESHOLD: usize = 1_024;

/// One sliding window per key (network address, credential, ...).
pub struct KeyedRateLimiter {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, SlidingWindow>>,
}

impl KeyedRateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        // A poisoned lock only means another request panicked mid-check; the
        // windows themselves are still usable.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() > COMPACT_THRESHOLD {
            windows.retain(|_, window| !window.is_idle(now));
        }

        windows
            .entry(key.to_string())
            .or_insert_with(|| SlidingWindow::new(self.policy))
            .admit(now)
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Rate-limit key: the credential when one was presented, else the peer address.
pub fn rate_limit_key(credential: Option<&str>, remote_address: &str) -> String {
    match credential {
        Some(token) if !token.is_empty() => format!("token:{token}"),
        _ => format!("addr:{remote_address}"),
    }
}
