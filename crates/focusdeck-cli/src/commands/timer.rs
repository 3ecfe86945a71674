use std::time::Duration;

use clap::Subcommand;
use focusdeck_core::focus::sink_from_config;
use focusdeck_core::{Database, Event, TimerRuntime};
use tokio::sync::broadcast::error::RecvError;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown for the selected task
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and restore a full session
    Reset,
    /// Catch up with wall time and print the current state as JSON
    Status,
    /// Run the countdown in the foreground until it expires (ctrl-c detaches)
    Run,
}

pub fn run(action: TimerAction) -> CmdResult {
    let mut session = Session::open()?;

    match action {
        TimerAction::Start => {
            let event = session.engine.start()?;
            session.finish(event)
        }
        TimerAction::Pause => {
            let event = session.engine.pause()?;
            session.finish(event)
        }
        TimerAction::Reset => {
            let event = session.engine.reset()?;
            session.finish(Some(event))
        }
        TimerAction::Status => {
            let event = session.engine.tick()?;
            print_json(&session.engine.snapshot())?;
            // Only an expiry is worth reporting next to the snapshot.
            if let Some(expired @ Event::TimerExpired { .. }) = event {
                print_json(&expired)?;
            }
            session.print_credits()
        }
        TimerAction::Run => run_foreground(session),
    }
}

fn run_foreground(mut session: Session) -> CmdResult {
    if !session.engine.is_running() {
        if let Some(event) = session.engine.start()? {
            print_json(&event)?;
        }
    }
    let Session { config, engine, .. } = session;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let sink = sink_from_config(&config, Database::open)?;
        let runtime = TimerRuntime::spawn(
            engine,
            sink,
            Duration::from_millis(config.timer.tick_interval_ms),
        );
        let handle = runtime.handle();
        let mut events = handle.subscribe();
        let mut resumed = Resumed::listen()?;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    // Leave the countdown running; the next invocation catches up.
                    tracing::info!("received ctrl-c, detaching");
                    break;
                }
                Some(()) = resumed.recv() => {
                    handle.visible().await?;
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        print_json(&event)?;
                        if matches!(event, Event::TimerExpired { .. }) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event output fell behind");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        let engine = runtime.shutdown().await?;
        // Credits published while shutting down.
        while let Ok(event) = events.try_recv() {
            print_json(&event)?;
        }
        print_json(&engine.snapshot())
    })
}

/// The process was continued after a stop (e.g. `fg` after ctrl-z), which is
/// when a terminal session regains the foreground.
struct Resumed {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl Resumed {
    fn listen() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                signal: signal(SignalKind::from_raw(libc::SIGCONT))?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    async fn recv(&mut self) -> Option<()> {
        #[cfg(unix)]
        {
            self.signal.recv().await
        }
        #[cfg(not(unix))]
        {
            std::future::pending().await
        }
    }
}
