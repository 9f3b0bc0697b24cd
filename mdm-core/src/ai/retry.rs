//! Sequential retry with exponential backoff
//!
//! After failed attempt `n` (zero-based) the caller blocks for
//! `base_delay * 2^n`; with the default one-second base the waits are 1s then
//! 2s. The last failure is returned unchanged.

use std::fmt::Display;
use std::time::Duration;

/// Blocks the calling thread between attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (zero-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// `progress` receives the user-facing attempt messages.
    pub fn run<T, E, F>(
        &self,
        sleeper: &dyn Sleeper,
        progress: &mut dyn FnMut(&str),
        mut op: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            progress(&format!("Attempt {} of {}...", attempt + 1, max));
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 >= max => return Err(err),
                Err(err) => {
                    let wait = self.delay(attempt);
                    log::warn!(
                        "attempt {}/{} failed: {}; retrying in {:?}",
                        attempt + 1,
                        max,
                        err,
                        wait
                    );
                    progress(&format!("Attempt {} failed, retrying...", attempt + 1));
                    sleeper.sleep(wait);
                    attempt += 1;
                }
            }
        }
    }
}
