//! Focus-time batching.
//!
//! Elapsed seconds are accumulated locally and released to the sink in whole
//! multiples of the flush interval. Drift between local and sink totals is
//! bounded by one interval.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Focus seconds to credit to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusIncrement {
    pub task_id: String,
    pub seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushPolicy {
    interval_seconds: u64,
}

impl FlushPolicy {
    pub const SUPPORTED: [u64; 2] = [1, 60];

    /// One sink write per elapsed second.
    pub fn per_second() -> Self {
        Self { interval_seconds: 1 }
    }

    /// One sink write per full minute of focus.
    pub fn per_minute() -> Self {
        Self {
            interval_seconds: 60,
        }
    }

    pub fn from_interval(interval_seconds: u64) -> Result<Self, ConfigError> {
        if !Self::SUPPORTED.contains(&interval_seconds) {
            return Err(ConfigError::InvalidValue {
                key: "focus.flush_interval_seconds".into(),
                message: format!("must be one of {:?}, got {interval_seconds}", Self::SUPPORTED),
            });
        }
        Ok(Self { interval_seconds })
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::per_minute()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FocusAccumulator {
    policy: FlushPolicy,
    pending_seconds: u64,
}

impl FocusAccumulator {
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            pending_seconds: 0,
        }
    }

    /// Restore a previously persisted remainder.
    pub fn with_pending(policy: FlushPolicy, pending_seconds: u64) -> Self {
        Self {
            policy,
            pending_seconds,
        }
    }

    pub fn pending_seconds(&self) -> u64 {
        self.pending_seconds
    }

    /// Add elapsed focus seconds; returns the whole-interval part once due.
    pub fn add(&mut self, task_id: &str, seconds: u64) -> Option<FocusIncrement> {
        self.pending_seconds = self.pending_seconds.saturating_add(seconds);
        let interval = self.policy.interval_seconds;
        let due = self.pending_seconds / interval * interval;
        if due == 0 {
            return None;
        }
        self.pending_seconds -= due;
        Some(FocusIncrement {
            task_id: task_id.to_string(),
            seconds: due,
        })
    }

    /// Release whatever is pending, regardless of the interval.
    pub fn drain(&mut self, task_id: &str) -> Option<FocusIncrement> {
        let seconds = std::mem::take(&mut self.pending_seconds);
        (seconds > 0).then(|| FocusIncrement {
            task_id: task_id.to_string(),
            seconds,
        })
    }

    /// Forget the pending remainder without crediting anyone.
    pub fn discard(&mut self) -> u64 {
        std::mem::take(&mut self.pending_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_second_emits_every_second() {
        let mut acc = FocusAccumulator::new(FlushPolicy::per_second());
        let inc = acc.add("t1", 1).unwrap();
        assert_eq!(inc.seconds, 1);
        assert_eq!(acc.pending_seconds(), 0);
    }

    #[test]
    fn per_minute_holds_until_sixty() {
        let mut acc = FocusAccumulator::new(FlushPolicy::per_minute());
        for _ in 0..59 {
            assert!(acc.add("t1", 1).is_none());
        }
        let inc = acc.add("t1", 1).unwrap();
        assert_eq!(inc, FocusIncrement { task_id: "t1".into(), seconds: 60 });
        assert_eq!(acc.pending_seconds(), 0);
    }

    #[test]
    fn large_catch_up_emits_whole_minutes_and_keeps_remainder() {
        let mut acc = FocusAccumulator::with_pending(FlushPolicy::per_minute(), 10);
        let inc = acc.add("t1", 125).unwrap();
        assert_eq!(inc.seconds, 120);
        assert_eq!(acc.pending_seconds(), 15);
    }

    #[test]
    fn drain_releases_partial_remainder() {
        let mut acc = FocusAccumulator::new(FlushPolicy::per_minute());
        acc.add("t1", 42);
        assert_eq!(acc.drain("t1").unwrap().seconds, 42);
        assert!(acc.drain("t1").is_none());
    }

    #[test]
    fn huge_remainder_saturates_instead_of_overflowing() {
        let mut acc = FocusAccumulator::with_pending(FlushPolicy::per_second(), u64::MAX);
        let inc = acc.add("t1", 10).unwrap();
        assert_eq!(inc.seconds, u64::MAX);
        assert_eq!(acc.pending_seconds(), 0);
    }

    #[test]
    fn unsupported_interval_is_rejected() {
        assert!(FlushPolicy::from_interval(30).is_err());
        assert!(FlushPolicy::from_interval(0).is_err());
        assert_eq!(FlushPolicy::from_interval(1).unwrap(), FlushPolicy::per_second());
    }
}
