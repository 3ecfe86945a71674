//! Wall-clock source.
//!
//! The timer engine never measures time on its own; it asks a [`Clock`] for
//! the current epoch milliseconds and reconciles against the last stored
//! reading. Tests swap in a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Whole seconds between two readings, floored. A backwards step yields 0.
pub fn elapsed_whole_seconds(from_ms: u64, to_ms: u64) -> u64 {
    to_ms.saturating_sub(from_ms) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_floors_partial_seconds() {
        assert_eq!(elapsed_whole_seconds(1_000, 1_999), 0);
        assert_eq!(elapsed_whole_seconds(1_000, 2_000), 1);
        assert_eq!(elapsed_whole_seconds(1_000, 12_750), 11);
    }

    #[test]
    fn elapsed_saturates_when_clock_goes_backwards() {
        assert_eq!(elapsed_whole_seconds(5_000, 1_000), 0);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(10_000);
        clock.advance_secs(3);
        clock.advance_ms(250);
        assert_eq!(clock.now_ms(), 13_250);
        clock.set(0);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
