//! The focus time sink seam.
//!
//! A sink records per-task focus seconds somewhere outside the engine. Writes
//! are best-effort: [`dispatch_increment`] logs failures and moves on, the
//! local countdown never waits on or rolls back for a sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::FocusIncrement;
use crate::error::{CoreError, Result};

#[async_trait]
pub trait FocusSink: Send + Sync {
    /// Short identifier used in logs (e.g. "local", "remote").
    fn name(&self) -> &str;

    /// Atomically add `seconds` to the task's total. Safe with concurrent writers.
    async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()>;

    /// Overwrite the task's total. Only correct with a single writer.
    async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()>;

    /// Current total as the sink sees it, when the sink can answer.
    async fn read_focus_time(&self, _task_id: &str) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Hand one increment to the sink. Returns whether the write succeeded.
///
/// Failures are logged at `warn` and swallowed; there is no retry.
pub async fn dispatch_increment(sink: &dyn FocusSink, increment: &FocusIncrement) -> bool {
    match sink
        .increment_focus_time(&increment.task_id, increment.seconds)
        .await
    {
        Ok(()) => {
            tracing::debug!(
                sink = sink.name(),
                task_id = %increment.task_id,
                seconds = increment.seconds,
                "focus time recorded"
            );
            true
        }
        Err(err) => {
            tracing::warn!(
                sink = sink.name(),
                task_id = %increment.task_id,
                seconds = increment.seconds,
                error = %err,
                "focus time write failed; increment dropped"
            );
            false
        }
    }
}

pub(crate) fn write_failure(
    sink: &str,
    task_id: &str,
    seconds: u64,
    message: impl std::fmt::Display,
) -> CoreError {
    CoreError::SinkWriteFailure {
        sink: sink.to_string(),
        task_id: task_id.to_string(),
        seconds,
        message: message.to_string(),
    }
}

#[async_trait]
impl<T: FocusSink + ?Sized> FocusSink for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()> {
        (**self).increment_focus_time(task_id, seconds).await
    }

    async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()> {
        (**self).update_focus_time(task_id, new_total).await
    }

    async fn read_focus_time(&self, task_id: &str) -> Result<Option<u64>> {
        (**self).read_focus_time(task_id).await
    }
}

/// Discards everything. Used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl FocusSink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn increment_focus_time(&self, _task_id: &str, _seconds: u64) -> Result<()> {
        Ok(())
    }

    async fn update_focus_time(&self, _task_id: &str, _new_total: u64) -> Result<()> {
        Ok(())
    }
}

/// Applies increments as absolute updates, tracking totals itself.
///
/// Totals come from [`with_totals`](Self::with_totals) or, failing that, from
/// the inner sink's `read_focus_time`. Calls through one adapter are
/// serialized; two adapters (or processes) writing the same task still
/// overwrite each other's progress.
pub struct ReadModifyWriteSink<S> {
    inner: S,
    totals: Mutex<HashMap<String, u64>>,
    /// Held across read, update and cache insert.
    write_gate: tokio::sync::Mutex<()>,
}

impl<S: FocusSink> ReadModifyWriteSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            totals: Mutex::new(HashMap::new()),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_totals(inner: S, totals: HashMap<String, u64>) -> Self {
        Self {
            inner,
            totals: Mutex::new(totals),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn known_total(&self, task_id: &str) -> Option<u64> {
        self.lock().get(task_id).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<S: FocusSink> FocusSink for ReadModifyWriteSink<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let known = self.known_total(task_id);
        let prior = match known {
            Some(total) => total,
            None => self
                .inner
                .read_focus_time(task_id)
                .await?
                .ok_or_else(|| {
                    write_failure(self.name(), task_id, seconds, "no authoritative prior total")
                })?,
        };
        let new_total = prior + seconds;
        self.inner.update_focus_time(task_id, new_total).await?;
        self.lock().insert(task_id.to_string(), new_total);
        Ok(())
    }

    async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.inner.update_focus_time(task_id, new_total).await?;
        self.lock().insert(task_id.to_string(), new_total);
        Ok(())
    }

    async fn read_focus_time(&self, task_id: &str) -> Result<Option<u64>> {
        if let Some(total) = self.known_total(task_id) {
            return Ok(Some(total));
        }
        self.inner.read_focus_time(task_id).await
    }
}

/// In-memory sink that remembers every write. Can be switched into a
/// failing mode to exercise the best-effort path.
#[derive(Debug, Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<FocusIncrement>>,
    totals: Mutex<HashMap<String, u64>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every successful increment, in arrival order.
    pub fn writes(&self) -> Vec<FocusIncrement> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn total(&self, task_id: &str) -> u64 {
        self.totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    fn check(&self, task_id: &str, seconds: u64) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(write_failure("recording", task_id, seconds, "sink offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl FocusSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()> {
        self.check(task_id, seconds)?;
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(FocusIncrement {
                task_id: task_id.to_string(),
                seconds,
            });
        *self
            .totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(task_id.to_string())
            .or_insert(0) += seconds;
        Ok(())
    }

    async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()> {
        self.check(task_id, new_total)?;
        self.totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(task_id.to_string(), new_total);
        Ok(())
    }

    async fn read_focus_time(&self, task_id: &str) -> Result<Option<u64>> {
        Ok(self
            .totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(task_id)
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inc(task: &str, seconds: u64) -> FocusIncrement {
        FocusIncrement {
            task_id: task.into(),
            seconds,
        }
    }

    #[tokio::test]
    async fn dispatch_records_on_success() {
        let sink = RecordingSink::new();
        assert!(dispatch_increment(&sink, &inc("t1", 60)).await);
        assert_eq!(sink.total("t1"), 60);
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let sink = RecordingSink::new();
        sink.set_failing(true);
        assert!(!dispatch_increment(&sink, &inc("t1", 60)).await);
        assert!(sink.writes().is_empty());
        assert_eq!(sink.total("t1"), 0);
    }

    #[tokio::test]
    async fn read_modify_write_uses_seeded_totals() {
        let rmw = ReadModifyWriteSink::with_totals(
            RecordingSink::new(),
            HashMap::from([("t1".to_string(), 300)]),
        );
        rmw.increment_focus_time("t1", 60).await.unwrap();
        assert_eq!(rmw.known_total("t1"), Some(360));
        assert_eq!(rmw.inner.total("t1"), 360);
        // Went through update, not increment.
        assert!(rmw.inner.writes().is_empty());
    }

    #[tokio::test]
    async fn read_modify_write_reads_prior_total_from_inner() {
        let inner = RecordingSink::new();
        inner.update_focus_time("t1", 100).await.unwrap();
        let rmw = ReadModifyWriteSink::new(inner);
        rmw.increment_focus_time("t1", 20).await.unwrap();
        assert_eq!(rmw.inner.total("t1"), 120);
    }

    #[tokio::test]
    async fn read_modify_write_without_prior_total_fails() {
        let rmw = ReadModifyWriteSink::new(NullSink);
        assert!(matches!(
            rmw.increment_focus_time("t1", 20).await,
            Err(CoreError::SinkWriteFailure { .. })
        ));
    }

    /// Inner sink whose absolute updates take a while to land.
    struct SlowSink(RecordingSink);

    #[async_trait]
    impl FocusSink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()> {
            self.0.increment_focus_time(task_id, seconds).await
        }

        async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()> {
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
            self.0.update_focus_time(task_id, new_total).await
        }

        async fn read_focus_time(&self, task_id: &str) -> Result<Option<u64>> {
            self.0.read_focus_time(task_id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_calls_on_one_adapter_keep_every_increment() {
        let rmw = ReadModifyWriteSink::with_totals(
            SlowSink(RecordingSink::new()),
            HashMap::from([("t1".to_string(), 0)]),
        );
        let (a, b, c) = tokio::join!(
            rmw.increment_focus_time("t1", 1),
            rmw.increment_focus_time("t1", 1),
            rmw.increment_focus_time("t1", 1),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(rmw.inner.0.total("t1"), 3);
        assert_eq!(rmw.known_total("t1"), Some(3));
    }

    #[tokio::test]
    async fn read_modify_write_loses_concurrent_progress() {
        // Two writers seeded with the same stale total overwrite each other.
        let shared = std::sync::Arc::new(RecordingSink::new());
        shared.update_focus_time("t1", 0).await.unwrap();
        let a = ReadModifyWriteSink::with_totals(shared.clone(), HashMap::from([("t1".into(), 0)]));
        let b = ReadModifyWriteSink::with_totals(shared.clone(), HashMap::from([("t1".into(), 0)]));
        a.increment_focus_time("t1", 60).await.unwrap();
        b.increment_focus_time("t1", 60).await.unwrap();
        assert_eq!(shared.total("t1"), 60);

        // The atomic path keeps both.
        let atomic = RecordingSink::new();
        atomic.increment_focus_time("t1", 60).await.unwrap();
        atomic.increment_focus_time("t1", 60).await.unwrap();
        assert_eq!(atomic.total("t1"), 120);
    }
}
