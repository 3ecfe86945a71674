//! Cooperative driver for [`TimerEngine`].
//!
//! One tokio task owns the engine. It waits on the countdown interval (armed
//! only while the engine is running) and on a command channel, one event at a
//! time, so the engine needs no locking. Focus increments are queued to a
//! single writer task that hands them to the sink in order, one at a time;
//! their outcome is only logged. Shutdown waits for the queue to drain.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::focus::{dispatch_increment, FocusIncrement, FocusSink};
use crate::task::TaskRef;
use crate::timer::TimerEngine;

const EVENT_CAPACITY: usize = 256;

enum Command {
    Start,
    Pause,
    Reset,
    SelectTask(Option<TaskRef>),
    Visible,
    Snapshot,
    Shutdown,
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<Option<Event>>>,
}

/// Cloneable control surface of a running [`TimerRuntime`].
#[derive(Clone)]
pub struct RuntimeHandle {
    commands: mpsc::Sender<Request>,
    events: broadcast::Sender<Event>,
}

impl RuntimeHandle {
    async fn request(&self, command: Command) -> Result<Option<Event>> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| CoreError::RuntimeStopped)?;
        response.await.map_err(|_| CoreError::RuntimeStopped)?
    }

    /// # Errors
    /// `NoTaskSelected` when no task is active.
    pub async fn start(&self) -> Result<Option<Event>> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<Option<Event>> {
        self.request(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<Option<Event>> {
        self.request(Command::Reset).await
    }

    pub async fn select_task(&self, task: Option<TaskRef>) -> Result<Option<Event>> {
        self.request(Command::SelectTask(task)).await
    }

    /// The host regained the foreground.
    pub async fn visible(&self) -> Result<Option<Event>> {
        self.request(Command::Visible).await
    }

    pub async fn snapshot(&self) -> Result<Event> {
        self.request(Command::Snapshot)
            .await?
            .ok_or(CoreError::RuntimeStopped)
    }

    /// Receive every event the runtime publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

pub struct TimerRuntime {
    handle: RuntimeHandle,
    join: JoinHandle<TimerEngine>,
}

impl TimerRuntime {
    /// Move `engine` onto a tokio task. Must be called within a runtime.
    pub fn spawn(engine: TimerEngine, sink: Arc<dyn FocusSink>, tick_every: Duration) -> Self {
        let (commands, rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let join = tokio::spawn(drive(engine, sink, tick_every, rx, events.clone()));
        Self {
            handle: RuntimeHandle { commands, events },
            join,
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Cancel the recurring tick, wait for pending sink writes and hand the
    /// engine back.
    pub async fn shutdown(self) -> Result<TimerEngine> {
        // A send error means the loop already ended; the join below still
        // returns the engine.
        let _ = self.handle.request(Command::Shutdown).await;
        self.join.await.map_err(|_| CoreError::RuntimeStopped)
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn drive(
    mut engine: TimerEngine,
    sink: Arc<dyn FocusSink>,
    tick_every: Duration,
    mut commands: mpsc::Receiver<Request>,
    events: broadcast::Sender<Event>,
) -> TimerEngine {
    let mut countdown = ticker(tick_every);
    let (writes, queue) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_focus(sink, queue, events.clone()));

    loop {
        tokio::select! {
            _ = countdown.tick(), if engine.is_running() => {
                match engine.tick() {
                    Ok(Some(event)) => publish(&events, event),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(error = %err, "tick failed"),
                }
            }
            request = commands.recv() => {
                // Every handle dropped: treat as shutdown.
                let Some(Request { command, reply }) = request else { break };
                let was_running = engine.is_running();
                let stop = matches!(command, Command::Shutdown);
                let result = apply(&mut engine, command);
                if let Ok(Some(event)) = &result {
                    if !matches!(event, Event::StateSnapshot { .. }) {
                        publish(&events, event.clone());
                    }
                }
                if !was_running && engine.is_running() {
                    countdown = ticker(tick_every);
                }
                let _ = reply.send(result);
                if stop {
                    flush(&mut engine, &writes);
                    break;
                }
            }
        }
        flush(&mut engine, &writes);
    }

    drop(writes);
    if writer.await.is_err() {
        tracing::warn!("focus writer task failed");
    }
    tracing::debug!("timer runtime stopped");
    engine
}

fn apply(engine: &mut TimerEngine, command: Command) -> Result<Option<Event>> {
    match command {
        Command::Start => engine.start(),
        Command::Pause => engine.pause(),
        Command::Reset => engine.reset().map(Some),
        Command::SelectTask(task) => engine.select_task(task),
        Command::Visible => engine.on_visible(),
        Command::Snapshot | Command::Shutdown => Ok(Some(engine.snapshot())),
    }
}

fn publish(events: &broadcast::Sender<Event>, event: Event) {
    // No subscribers is fine.
    let _ = events.send(event);
}

fn flush(engine: &mut TimerEngine, writes: &mpsc::UnboundedSender<FocusIncrement>) {
    for increment in engine.take_increments() {
        // The writer only stops after this sender is dropped.
        let _ = writes.send(increment);
    }
}

/// Sole caller of the sink. Writes never overlap, so a read-modify-write
/// sink sees its own previous total.
async fn write_focus(
    sink: Arc<dyn FocusSink>,
    mut queue: mpsc::UnboundedReceiver<FocusIncrement>,
    events: broadcast::Sender<Event>,
) {
    while let Some(increment) = queue.recv().await {
        if dispatch_increment(sink.as_ref(), &increment).await {
            publish(
                &events,
                Event::FocusCredited {
                    task_id: increment.task_id,
                    seconds: increment.seconds,
                    at: chrono::Utc::now(),
                },
            );
        }
    }
}
