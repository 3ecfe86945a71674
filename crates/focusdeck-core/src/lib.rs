//! # Focusdeck Core Library
//!
//! Business logic for Focusdeck, a focus timer paired with a task list and a
//! markdown note log. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock-based countdown state machine; the caller
//!   (or [`TimerRuntime`]) invokes `tick()` and collects focus increments
//! - **Focus sinks**: where credited focus time goes (local SQLite, a remote
//!   PostgREST store, or nowhere)
//! - **Storage**: SQLite for tasks, notes and durable timer state; TOML for
//!   configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: countdown state machine with hydration and reconciliation
//! - [`TimerRuntime`]: tokio driver owning the engine
//! - [`FocusSink`]: trait for focus time destinations
//! - [`Database`]: tasks, notes and key-value persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod focus;
pub mod runtime;
pub mod storage;
pub mod task;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use focus::{FlushPolicy, FocusIncrement, FocusSink};
pub use runtime::{RuntimeHandle, TimerRuntime};
pub use storage::{Config, Database, TimerStore};
pub use task::{Note, Task, TaskRef};
pub use timer::{TimerEngine, TimerPhase, TimerSettings, TimerState};
