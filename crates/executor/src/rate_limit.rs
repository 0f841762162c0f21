//! Per-venue sliding-window rate limiting.
//!
//! Each venue keeps the instants of its recent calls. A call is admitted
//! when fewer than `max_calls` happened within the trailing window; the
//! oldest entry ageing out is what frees the next slot.

use crate::{ExecutorError, ExecutorResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use triarb_core::Exchange;

/// Call budget for one venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Maximum calls within the window.
    pub max_calls: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimit {
    pub const fn new(max_calls: u32, window_ms: u64) -> Self {
        Self {
            max_calls,
            window_ms,
        }
    }

    /// Published REST limits for each venue.
    ///
    /// - **KuCoin**: 100 calls / 60 s
    /// - **Binance**: 1200 weight / 60 s
    /// - **OKX**: 20 calls / 10 s per endpoint
    pub fn for_exchange(exchange: Exchange) -> Self {
        match exchange {
            Exchange::Kucoin => Self::new(100, 60_000),
            Exchange::Binance => Self::new(1200, 60_000),
            Exchange::Okx => Self::new(20, 10_000),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug)]
struct SlidingWindow {
    limit: RateLimit,
    calls: VecDeque<Instant>,
}

impl SlidingWindow {
    fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            calls: VecDeque::with_capacity(limit.max_calls as usize),
        }
    }

    fn prune(&mut self, now: Instant) {
        let window = self.limit.window();
        while let Some(&front) = self.calls.front() {
            if front + window <= now {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a call, or return how long until one would be admitted.
    fn try_record(&mut self, now: Instant) -> Result<(), Duration> {
        self.prune(now);
        if (self.calls.len() as u32) < self.limit.max_calls.max(1) {
            self.calls.push_back(now);
            return Ok(());
        }
        let retry_after = self
            .calls
            .front()
            .map(|&front| (front + self.limit.window()).saturating_duration_since(now))
            .unwrap_or_else(|| self.limit.window());
        Err(retry_after)
    }
}

/// Rate limiter shared by every venue call.
#[derive(Debug, Default)]
pub struct RateLimiter {
    limits: HashMap<Exchange, RateLimit>,
    windows: DashMap<Exchange, SlidingWindow>,
}

impl RateLimiter {
    /// Limiter with explicit limits; unlisted venues use their defaults.
    pub fn new(limits: HashMap<Exchange, RateLimit>) -> Self {
        Self {
            limits,
            windows: DashMap::new(),
        }
    }

    pub fn limit_for(&self, venue: Exchange) -> RateLimit {
        self.limits
            .get(&venue)
            .copied()
            .unwrap_or_else(|| RateLimit::for_exchange(venue))
    }

    /// Admit a call now or fail with `RateLimitExceeded`.
    pub fn try_acquire(&self, venue: Exchange) -> ExecutorResult<()> {
        let now = Instant::now();
        let mut window = self
            .windows
            .entry(venue)
            .or_insert_with(|| SlidingWindow::new(self.limit_for(venue)));
        window
            .try_record(now)
            .map_err(|retry_after| ExecutorError::RateLimitExceeded { venue, retry_after })
    }

    /// Wait until a call is admitted.
    pub async fn acquire(&self, venue: Exchange) {
        loop {
            // The shard guard is released inside try_acquire before sleeping
            match self.try_acquire(venue) {
                Ok(()) => return,
                Err(ExecutorError::RateLimitExceeded { retry_after, .. }) => {
                    debug!("[{}] rate limited, waiting {:?}", venue, retry_after);
                    tokio::time::sleep(retry_after.max(Duration::from_millis(1))).await;
                }
                Err(_) => return,
            }
        }
    }

    /// Calls currently counted against the venue's window.
    pub fn recent_calls(&self, venue: Exchange) -> usize {
        let now = Instant::now();
        self.windows
            .get_mut(&venue)
            .map(|mut window| {
                window.prune(now);
                window.calls.len()
            })
            .unwrap_or(0)
    }
}
