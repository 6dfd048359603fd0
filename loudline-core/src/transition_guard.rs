//! Process-wide visual blanking window around gain-change edges
//! (§4.11). A service-locator-style singleton is intentionally
//! avoided (SPEC_FULL.md design notes): callers hold and share one
//! instance explicitly, typically via `Arc<TransitionGuard>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const BLANK_DURATION: Duration = Duration::from_millis(60);

pub struct TransitionGuard {
    epoch: Instant,
    blank_until_micros: AtomicU64,
}

impl TransitionGuard {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            blank_until_micros: AtomicU64::new(0),
        }
    }

    /// Marks a gain-change edge: widgets should not render until
    /// `BLANK_DURATION` has elapsed.
    pub fn trigger(&self, now: Instant) {
        let until = now.duration_since(self.epoch) + BLANK_DURATION;
        self.blank_until_micros
            .store(until.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn should_render(&self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.epoch).as_micros() as u64;
        elapsed >= self.blank_until_micros.load(Ordering::Relaxed)
    }
}

impl Default for TransitionGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_for_sixty_milliseconds_after_trigger() {
        let guard = TransitionGuard::new();
        let t0 = Instant::now();
        assert!(guard.should_render(t0));
        guard.trigger(t0);
        assert!(!guard.should_render(t0 + Duration::from_millis(10)));
        assert!(guard.should_render(t0 + Duration::from_millis(65)));
    }
}
