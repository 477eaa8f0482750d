use std::time::{Duration, Instant};

use dashmap::DashMap;

const MAX_FAILURES: u32 = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Per-username login brute force limiter: 5 failures per 15 minutes.
pub struct LoginRateLimiter {
    /// username -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if a login attempt is allowed. Returns retry-after seconds when not.
    /// Does NOT increment the counter; call `record_failure()` on a bad password.
    pub fn check(&self, username: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&username.to_lowercase()) else {
            return Ok(());
        };

        let (count, start) = entry.value();

        if now.duration_since(*start) > WINDOW {
            return Ok(());
        }

        if *count >= MAX_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(WINDOW.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, username: &str) {
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(username.to_lowercase())
            .or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > WINDOW {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    /// Forget failures for a user after a successful login.
    pub fn reset(&self, username: &str) {
        self.entries.remove(&username.to_lowercase());
    }

    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < WINDOW);
    }
}
