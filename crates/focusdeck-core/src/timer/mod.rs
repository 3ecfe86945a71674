mod engine;

pub use engine::{format_remaining, TimerEngine, TimerPhase, TimerSettings, TimerState, SESSION_SECONDS};
