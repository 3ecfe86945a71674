//! Durable countdown state.
//!
//! [`TimerStore`] is the only place that reads or writes the persisted timer
//! keys. Values are string-encoded so any [`KvBackend`] can hold them.

use serde::{Deserialize, Serialize};

use super::KvBackend;
use crate::error::{CoreError, Result};

pub const KEY_REMAINING: &str = "pomodoroTimeRemaining";
pub const KEY_RUNNING: &str = "pomodoroIsRunning";
pub const KEY_LAST_UPDATED: &str = "pomodoroLastUpdated";
pub const KEY_PENDING_FOCUS: &str = "pomodoroPendingFocus";

/// The record that survives a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTimer {
    pub remaining_seconds: u64,
    pub running: bool,
    pub last_update_epoch_ms: u64,
    /// Focus seconds accumulated but not yet handed to the sink.
    #[serde(default)]
    pub pending_focus_seconds: u64,
}

pub struct TimerStore {
    backend: Box<dyn KvBackend>,
}

impl TimerStore {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Read the persisted record.
    ///
    /// Returns `Ok(None)` when nothing was ever saved (or it was cleared).
    ///
    /// # Errors
    /// `HydrationParseFailure` when a value is malformed or only part of the
    /// record is present. Backend errors propagate as-is.
    pub fn load(&self) -> Result<Option<PersistedTimer>> {
        let remaining = self.backend.get(KEY_REMAINING)?;
        let running = self.backend.get(KEY_RUNNING)?;
        let last_updated = self.backend.get(KEY_LAST_UPDATED)?;
        let pending = self.backend.get(KEY_PENDING_FOCUS)?;

        let (remaining, running, last_updated) = match (remaining, running, last_updated) {
            (None, None, None) => return Ok(None),
            (Some(r), Some(run), Some(l)) => (r, run, l),
            (r, run, l) => {
                let missing = [
                    (KEY_REMAINING, r.is_none()),
                    (KEY_RUNNING, run.is_none()),
                    (KEY_LAST_UPDATED, l.is_none()),
                ]
                .into_iter()
                .find(|(_, absent)| *absent)
                .map(|(key, _)| key)
                .unwrap_or(KEY_REMAINING);
                return Err(CoreError::HydrationParseFailure {
                    key: missing.to_string(),
                    value: String::new(),
                });
            }
        };

        Ok(Some(PersistedTimer {
            remaining_seconds: parse_u64(KEY_REMAINING, &remaining)?,
            running: parse_bool(KEY_RUNNING, &running)?,
            last_update_epoch_ms: parse_u64(KEY_LAST_UPDATED, &last_updated)?,
            pending_focus_seconds: match pending {
                Some(p) => parse_u64(KEY_PENDING_FOCUS, &p)?,
                None => 0,
            },
        }))
    }

    pub fn save(&self, state: &PersistedTimer) -> Result<()> {
        self.backend
            .set(KEY_REMAINING, &state.remaining_seconds.to_string())?;
        self.backend.set(KEY_RUNNING, &state.running.to_string())?;
        self.backend
            .set(KEY_LAST_UPDATED, &state.last_update_epoch_ms.to_string())?;
        self.backend
            .set(KEY_PENDING_FOCUS, &state.pending_focus_seconds.to_string())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        for key in [KEY_REMAINING, KEY_RUNNING, KEY_LAST_UPDATED, KEY_PENDING_FOCUS] {
            self.backend.remove(key)?;
        }
        Ok(())
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| CoreError::HydrationParseFailure {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CoreError::HydrationParseFailure {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;
    use std::sync::Arc;

    fn store() -> (Arc<MemoryKv>, TimerStore) {
        let kv = Arc::new(MemoryKv::new());
        (kv.clone(), TimerStore::new(kv))
    }

    #[test]
    fn empty_backend_loads_none() {
        let (_, store) = store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let (kv, store) = store();
        let state = PersistedTimer {
            remaining_seconds: 1490,
            running: true,
            last_update_epoch_ms: 1_700_000_000_000,
            pending_focus_seconds: 10,
        };
        store.save(&state).unwrap();
        assert_eq!(kv.get(KEY_RUNNING).unwrap().as_deref(), Some("true"));
        assert_eq!(kv.get(KEY_REMAINING).unwrap().as_deref(), Some("1490"));
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn missing_pending_key_defaults_to_zero() {
        let (kv, store) = store();
        kv.set(KEY_REMAINING, "900").unwrap();
        kv.set(KEY_RUNNING, "false").unwrap();
        kv.set(KEY_LAST_UPDATED, "1000").unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.pending_focus_seconds, 0);
        assert_eq!(loaded.remaining_seconds, 900);
    }

    #[test]
    fn malformed_value_is_parse_failure() {
        let (kv, store) = store();
        kv.set(KEY_REMAINING, "soon").unwrap();
        kv.set(KEY_RUNNING, "false").unwrap();
        kv.set(KEY_LAST_UPDATED, "1000").unwrap();
        match store.load() {
            Err(CoreError::HydrationParseFailure { key, value }) => {
                assert_eq!(key, KEY_REMAINING);
                assert_eq!(value, "soon");
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn partial_record_is_parse_failure() {
        let (kv, store) = store();
        kv.set(KEY_REMAINING, "900").unwrap();
        assert!(matches!(
            store.load(),
            Err(CoreError::HydrationParseFailure { .. })
        ));
    }

    #[test]
    fn clear_removes_every_key() {
        let (kv, store) = store();
        store
            .save(&PersistedTimer {
                remaining_seconds: 1,
                running: false,
                last_update_epoch_ms: 1,
                pending_focus_seconds: 0,
            })
            .unwrap();
        store.clear().unwrap();
        assert!(kv.is_empty());
        assert!(store.load().unwrap().is_none());
    }
}
