//! Task list and note log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task on the list. `focus_time` is cumulative focus seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub focus_time: u64,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn to_ref(&self) -> TaskRef {
        TaskRef::new(&self.id, &self.text)
    }
}

/// The active task as seen by the timer: identity plus display text.
///
/// The timer never owns the task; it only credits focus time to `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub text: String,
}

impl TaskRef {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A markdown note. Content is stored as written and never rendered here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
