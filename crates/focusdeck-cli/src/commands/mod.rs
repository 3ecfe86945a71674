pub mod config;
pub mod note;
pub mod task;
pub mod timer;

use std::error::Error;
use std::sync::Arc;

use focusdeck_core::focus::{dispatch_increment, sink_from_config};
use focusdeck_core::{Config, Database, Event, SystemClock, TimerEngine, TimerSettings, TimerStore};
use serde::Serialize;

pub(crate) type CmdResult = Result<(), Box<dyn Error>>;

pub(crate) fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One CLI invocation's view of the timer: hydrated from disk on open, with
/// every change persisted by the engine as it happens.
pub(crate) struct Session {
    pub config: Config,
    pub db: Database,
    pub engine: TimerEngine,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let db = Database::open()?;
        let engine = TimerEngine::hydrate(
            Arc::new(SystemClock),
            TimerStore::new(Database::open()?),
            TimerSettings::from_config(&config),
            db.active_task()?,
        )?;
        Ok(Self { config, db, engine })
    }

    /// Write collected focus increments to the configured sink and wait for
    /// them. Failed writes are logged and skipped.
    pub fn flush(&mut self) -> Result<Vec<Event>, Box<dyn Error>> {
        let increments = self.engine.take_increments();
        if increments.is_empty() {
            return Ok(Vec::new());
        }
        let sink = sink_from_config(&self.config, Database::open)?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let credited = rt.block_on(async {
            let mut credited = Vec::new();
            for increment in increments {
                if dispatch_increment(sink.as_ref(), &increment).await {
                    credited.push(Event::FocusCredited {
                        task_id: increment.task_id,
                        seconds: increment.seconds,
                        at: chrono::Utc::now(),
                    });
                }
            }
            credited
        });
        Ok(credited)
    }

    /// Print `event`, or the current state when the command changed nothing,
    /// followed by any focus credited on the way.
    pub fn finish(mut self, event: Option<Event>) -> CmdResult {
        print_json(&event.unwrap_or_else(|| self.engine.snapshot()))?;
        self.print_credits()
    }

    pub fn print_credits(&mut self) -> CmdResult {
        for credited in self.flush()? {
            print_json(&credited)?;
        }
        Ok(())
    }
}
