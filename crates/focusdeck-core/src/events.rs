use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerPhase;

/// Every state change of the countdown produces an Event.
/// The CLI prints them; runtime subscribers receive them over a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        task_id: String,
        task_text: String,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Wall-clock time was reconciled into the countdown.
    TimerTicked {
        elapsed_seconds: u64,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// The countdown reached zero and stopped.
    TimerExpired {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    TaskSwitched {
        from_task_id: Option<String>,
        to_task_id: Option<String>,
        running: bool,
        at: DateTime<Utc>,
    },
    /// Focus seconds handed to the sink for a task.
    FocusCredited {
        task_id: String,
        seconds: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        remaining_seconds: u64,
        running: bool,
        last_update_epoch_ms: u64,
        task_id: Option<String>,
        task_text: Option<String>,
        pending_focus_seconds: u64,
        display: String,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::TimerPaused {
            remaining_seconds: 42,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerPaused");
        assert_eq!(json["remaining_seconds"], 42);
    }
}
