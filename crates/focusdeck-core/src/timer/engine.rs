//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically (see [`crate::runtime`] for a driver).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle            (pause)
//!         Running -> Expired         (countdown reached zero)
//! any   -> Idle @ full session       (reset)
//! ```
//!
//! Every mutation is written through the [`TimerStore`] before the call
//! returns, so a reload loses at most the sub-second part of one tick.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::hydrate(clock, store, settings, active_task)?;
//! engine.start()?;
//! // Once per second, and whenever the host regains the foreground:
//! engine.tick()?;
//! for inc in engine.take_increments() { /* hand to a FocusSink */ }
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::clock::{elapsed_whole_seconds, Clock};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::focus::{FlushPolicy, FocusAccumulator, FocusIncrement};
use crate::storage::{Config, PersistedTimer, TimerStore};
use crate::task::TaskRef;

/// Length of one focus session: 25 minutes.
pub const SESSION_SECONDS: u64 = 25 * 60;

/// The countdown record owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub running: bool,
    /// Last reconciliation point (epoch milliseconds).
    pub last_update_epoch_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    /// Countdown reached zero. Only Reset leaves this phase.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub session_seconds: u64,
    pub flush_policy: FlushPolicy,
}

impl TimerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_seconds: config.timer.session_seconds.max(1),
            flush_policy: config.flush_policy(),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            session_seconds: SESSION_SECONDS,
            flush_policy: FlushPolicy::default(),
        }
    }
}

/// Core countdown engine.
///
/// Operates on wall-clock deltas read from a [`Clock`] -- no internal thread.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    store: TimerStore,
    settings: TimerSettings,
    state: TimerState,
    active_task: Option<TaskRef>,
    focus: FocusAccumulator,
    /// Increments emitted but not yet collected by the caller.
    outbox: Vec<FocusIncrement>,
}

impl TimerEngine {
    /// A fresh Idle engine with a full session. Nothing is read from `store`.
    pub fn new(clock: Arc<dyn Clock>, store: TimerStore, settings: TimerSettings) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            store,
            state: TimerState {
                remaining_seconds: settings.session_seconds,
                running: false,
                last_update_epoch_ms: now,
            },
            active_task: None,
            focus: FocusAccumulator::new(settings.flush_policy),
            outbox: Vec::new(),
            settings,
        }
    }

    /// Rebuild the engine from durable state.
    ///
    /// A running countdown is decayed by the wall time elapsed since it was
    /// persisted, and that time is credited to `active_task`. A persisted
    /// running flag without an active task comes back Idle. Malformed state
    /// is logged and treated as absent.
    ///
    /// # Errors
    /// Storage backend failures other than malformed values.
    pub fn hydrate(
        clock: Arc<dyn Clock>,
        store: TimerStore,
        settings: TimerSettings,
        active_task: Option<TaskRef>,
    ) -> Result<Self> {
        let persisted = match store.load() {
            Ok(p) => p,
            Err(CoreError::HydrationParseFailure { key, value }) => {
                tracing::warn!(%key, %value, "ignoring malformed timer state");
                None
            }
            Err(e) => return Err(e),
        };

        let mut engine = Self::new(clock, store, settings);
        engine.active_task = active_task;

        let Some(p) = persisted else {
            return Ok(engine);
        };

        engine.state = TimerState {
            remaining_seconds: p.remaining_seconds.min(settings.session_seconds),
            running: p.running,
            last_update_epoch_ms: p.last_update_epoch_ms,
        };
        // Credit is capped per session, so a larger remainder is corrupt.
        let pending = p.pending_focus_seconds.min(settings.session_seconds);
        engine.focus = FocusAccumulator::with_pending(settings.flush_policy, pending);

        if engine.state.running {
            let now = engine.clock.now_ms();
            let elapsed = engine.reconcile(now);
            if engine.active_task.is_none() {
                let dropped = engine.focus.discard();
                engine.state.running = false;
                tracing::warn!(
                    elapsed,
                    dropped_focus_seconds = dropped,
                    "timer was running without an active task; restored as idle"
                );
            } else if engine.state.remaining_seconds == 0 {
                engine.expire();
            }
        }

        tracing::debug!(
            remaining = engine.state.remaining_seconds,
            running = engine.state.running,
            "timer hydrated"
        );
        engine.persist()?;
        Ok(engine)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> TimerPhase {
        if self.state.running {
            TimerPhase::Running
        } else if self.state.remaining_seconds == 0 {
            TimerPhase::Expired
        } else {
            TimerPhase::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.remaining_seconds
    }

    pub fn active_task(&self) -> Option<&TaskRef> {
        self.active_task.as_ref()
    }

    pub fn pending_focus_seconds(&self) -> u64 {
        self.focus.pending_seconds()
    }

    /// Collect focus increments emitted since the last call.
    pub fn take_increments(&mut self) -> Vec<FocusIncrement> {
        std::mem::take(&mut self.outbox)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase(),
            remaining_seconds: self.state.remaining_seconds,
            running: self.state.running,
            last_update_epoch_ms: self.state.last_update_epoch_ms,
            task_id: self.active_task.as_ref().map(|t| t.id.clone()),
            task_text: self.active_task.as_ref().map(|t| t.text.clone()),
            pending_focus_seconds: self.focus.pending_seconds(),
            display: format_remaining(self.state.remaining_seconds),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down.
    ///
    /// Returns `Ok(None)` when already running.
    ///
    /// # Errors
    /// `NoTaskSelected` without an active task, `SessionExpired` at zero.
    /// State is untouched in both cases.
    pub fn start(&mut self) -> Result<Option<Event>> {
        if self.state.running {
            return Ok(None);
        }
        let Some(task) = self.active_task.clone() else {
            return Err(CoreError::NoTaskSelected);
        };
        if self.state.remaining_seconds == 0 {
            return Err(CoreError::SessionExpired);
        }

        self.state.running = true;
        self.state.last_update_epoch_ms = self.clock.now_ms();
        self.persist()?;
        tracing::debug!(task_id = %task.id, remaining = self.state.remaining_seconds, "timer started");
        Ok(Some(Event::TimerStarted {
            task_id: task.id,
            task_text: task.text,
            remaining_seconds: self.state.remaining_seconds,
            at: Utc::now(),
        }))
    }

    /// Stop counting down after one final reconciliation.
    ///
    /// Pending focus seconds below the flush interval are kept for the next
    /// run. Returns `TimerExpired` instead if the final reconciliation hit zero.
    pub fn pause(&mut self) -> Result<Option<Event>> {
        if !self.state.running {
            return Ok(None);
        }
        let now = self.clock.now_ms();
        self.reconcile(now);
        if self.state.remaining_seconds == 0 {
            let event = self.expire();
            self.persist()?;
            return Ok(Some(event));
        }
        self.state.running = false;
        self.persist()?;
        tracing::debug!(remaining = self.state.remaining_seconds, "timer paused");
        Ok(Some(Event::TimerPaused {
            remaining_seconds: self.state.remaining_seconds,
            at: Utc::now(),
        }))
    }

    /// Back to a full Idle session from any phase. Clears durable state.
    ///
    /// Time already counted is credited before the reset.
    pub fn reset(&mut self) -> Result<Event> {
        if self.state.running {
            let now = self.clock.now_ms();
            self.reconcile(now);
        }
        self.flush_pending();

        self.state = TimerState {
            remaining_seconds: self.settings.session_seconds,
            running: false,
            last_update_epoch_ms: self.clock.now_ms(),
        };
        self.store.clear()?;
        tracing::debug!("timer reset");
        Ok(Event::TimerReset {
            remaining_seconds: self.state.remaining_seconds,
            at: Utc::now(),
        })
    }

    /// Reconcile elapsed wall time into the countdown.
    ///
    /// Returns `TimerTicked` when at least one whole second passed,
    /// `TimerExpired` when the countdown reached zero, `None` otherwise.
    pub fn tick(&mut self) -> Result<Option<Event>> {
        if !self.state.running {
            return Ok(None);
        }
        let now = self.clock.now_ms();
        let elapsed = self.reconcile(now);
        if elapsed == 0 {
            return Ok(None);
        }
        if self.state.remaining_seconds == 0 {
            let event = self.expire();
            self.persist()?;
            return Ok(Some(event));
        }
        self.persist()?;
        Ok(Some(Event::TimerTicked {
            elapsed_seconds: elapsed,
            remaining_seconds: self.state.remaining_seconds,
            at: Utc::now(),
        }))
    }

    /// The host came back to the foreground: catch up immediately instead
    /// of waiting for a possibly throttled tick.
    pub fn on_visible(&mut self) -> Result<Option<Event>> {
        tracing::debug!("visibility regained; forcing tick");
        self.tick()
    }

    /// Change the task credited by the countdown.
    ///
    /// Time up to now and any pending remainder go to the previous task.
    /// A running countdown keeps running for a new task and pauses when the
    /// selection is cleared.
    pub fn select_task(&mut self, task: Option<TaskRef>) -> Result<Option<Event>> {
        let same = match (&self.active_task, &task) {
            (Some(a), Some(b)) => a.id == b.id,
            (None, None) => true,
            _ => false,
        };
        if same {
            self.active_task = task;
            return Ok(None);
        }

        if self.state.running {
            let now = self.clock.now_ms();
            self.reconcile(now);
        }
        self.flush_pending();

        let from_task_id = self.active_task.as_ref().map(|t| t.id.clone());
        self.active_task = task;

        let mut expired = None;
        if self.state.running {
            if self.state.remaining_seconds == 0 {
                expired = Some(self.expire());
            } else if self.active_task.is_none() {
                self.state.running = false;
            }
        }
        self.persist()?;

        if let Some(event) = expired {
            return Ok(Some(event));
        }
        tracing::debug!(
            from = ?from_task_id,
            to = ?self.active_task.as_ref().map(|t| &t.id),
            running = self.state.running,
            "active task switched"
        );
        Ok(Some(Event::TaskSwitched {
            from_task_id,
            to_task_id: self.active_task.as_ref().map(|t| t.id.clone()),
            running: self.state.running,
            at: Utc::now(),
        }))
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Fold whole elapsed seconds into the countdown and the focus
    /// accumulator. Returns the elapsed whole seconds.
    ///
    /// The sub-second part stays behind `last_update_epoch_ms`. Focus credit
    /// is capped at what was left of the session.
    fn reconcile(&mut self, now: u64) -> u64 {
        let elapsed = elapsed_whole_seconds(self.state.last_update_epoch_ms, now);
        if elapsed == 0 {
            return 0;
        }
        let credited = elapsed.min(self.state.remaining_seconds);
        self.state.remaining_seconds -= credited;
        self.state.last_update_epoch_ms += elapsed * 1000;

        if let Some(task) = &self.active_task {
            if let Some(inc) = self.focus.add(&task.id, credited) {
                self.outbox.push(inc);
            }
        }
        elapsed
    }

    fn expire(&mut self) -> Event {
        self.state.running = false;
        self.flush_pending();
        tracing::info!(
            task_id = ?self.active_task.as_ref().map(|t| &t.id),
            "focus session complete"
        );
        Event::TimerExpired {
            task_id: self.active_task.as_ref().map(|t| t.id.clone()),
            at: Utc::now(),
        }
    }

    fn flush_pending(&mut self) {
        match &self.active_task {
            Some(task) => {
                if let Some(inc) = self.focus.drain(&task.id) {
                    self.outbox.push(inc);
                }
            }
            None => {
                self.focus.discard();
            }
        }
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&PersistedTimer {
            remaining_seconds: self.state.remaining_seconds,
            running: self.state.running,
            last_update_epoch_ms: self.state.last_update_epoch_ms,
            pending_focus_seconds: self.focus.pending_seconds(),
        })
    }
}

/// `MM:SS` rendering of a second count.
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
