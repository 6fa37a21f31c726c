//! Fixed-delay pacing between outbound calls to one source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Blocks for a fixed delay after every call to a source.
///
/// The pause count is kept so callers (and tests) can verify that every
/// call, successful or not, was followed by a pause.
#[derive(Debug)]
pub struct RateLimiter {
    source: String,
    delay: Duration,
    pauses: AtomicUsize,
}

impl RateLimiter {
    pub fn new(source: impl Into<String>, delay: Duration) -> Self {
        Self {
            source: source.into(),
            delay,
            pauses: AtomicUsize::new(0),
        }
    }

    /// Sleep for the configured delay.
    pub fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
        if self.delay.is_zero() {
            return;
        }
        tracing::trace!(source = %self.source, delay_ms = self.delay.as_millis() as u64, "rate-limit pause");
        std::thread::sleep(self.delay);
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of pauses taken so far.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn counts_every_pause() {
        let rl = RateLimiter::new("coingecko", Duration::ZERO);
        for _ in 0..4 {
            rl.pause();
        }
        assert_eq!(rl.pauses(), 4);
    }

    #[test]
    fn pause_blocks_for_delay() {
        let rl = RateLimiter::new("coinmarketcap", Duration::from_millis(20));
        let start = Instant::now();
        rl.pause();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
