//! The tail engine: state machine, start-up read and monitoring loop.

use crate::config::TailConfig;
use crate::error::{Error, Result};
use crate::model::{TailEvent, TailState};
use crate::position::Position;
use crate::reader::{self, Truncation};
use crate::stream::TailEvents;
use crate::watcher::{ChangeDetector, ChangeSignal, SIGNAL_CAPACITY};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Tails one file, publishing [`TailEvent`]s to the paired [`TailEvents`].
///
/// Control methods take `&self` and may be called from any thread while the
/// monitoring loop runs. `start` needs a tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// use log_tail::{TailConfig, TailEngine, TailEvent};
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (engine, mut events) = TailEngine::new("app.log", TailConfig::default())?;
///     engine.start().await?;
///
///     while let Some(event) = events.next().await {
///         if let TailEvent::LinesAdded(lines) = event {
///             for line in lines {
///                 println!("{:>6} {}", line.line_number(), line.content());
///             }
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct TailEngine {
    shared: Arc<Shared>,
    config: TailConfig,
    run: Mutex<Option<Run>>,
}

/// State visible to both the caller side and the monitoring task.
struct Shared {
    file_path: PathBuf,
    state: AtomicU8,
    total_lines: AtomicU64,
    events: mpsc::UnboundedSender<TailEvent>,
    /// Serializes state transitions with event delivery.
    publish: Mutex<()>,
}

/// One started monitoring loop.
struct Run {
    cancel: CancellationToken,
    _detector: Option<ChangeDetector>,
    handle: JoinHandle<()>,
}

impl TailEngine {
    /// Creates an idle engine for `path`.
    pub fn new<P: AsRef<Path>>(path: P, config: TailConfig) -> Result<(Self, TailEvents)> {
        let file_path = path.as_ref().to_path_buf();
        if file_path.file_name().is_none() {
            return Err(Error::InvalidPath {
                message: format!("{} does not name a file", file_path.display()),
            });
        }
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            file_path,
            state: AtomicU8::new(TailState::Idle as u8),
            total_lines: AtomicU64::new(0),
            events: tx,
            publish: Mutex::new(()),
        });

        let engine = Self {
            shared,
            config,
            run: Mutex::new(None),
        };
        Ok((engine, TailEvents::new(rx)))
    }

    pub fn file_path(&self) -> &Path {
        &self.shared.file_path
    }

    pub fn state(&self) -> TailState {
        self.shared.state()
    }

    /// Highest line number assigned since the last start.
    pub fn total_lines_read(&self) -> u64 {
        self.shared.total_lines.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Reads the last `tail_window` lines, arms the watcher and starts the
    /// monitoring loop.
    ///
    /// Does nothing unless the engine is idle, failed or waiting for a
    /// missing file.
    pub async fn start(&self) -> Result<()> {
        self.start_with(|path, tx| ChangeDetector::arm(path, tx)).await
    }

    /// `start` with the watcher set-up supplied by the caller.
    async fn start_with<F>(&self, arm: F) -> Result<()>
    where
        F: FnOnce(&Path, mpsc::Sender<ChangeSignal>) -> Result<ChangeDetector>,
    {
        if !self.state().can_start() {
            return Ok(());
        }

        let file_path = &self.shared.file_path;
        match tokio::fs::try_exists(file_path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(path = %file_path.display(), "Cannot start tail, file not found");
                let publish = self.shared.lock_publish();
                self.shared
                    .set_state(&publish, TailState::can_start, TailState::FileMissing);
                self.shared
                    .send(&publish, TailEvent::Error(self.shared.not_found()));
                return Err(self.shared.not_found());
            }
            Err(e) => {
                self.cancel_run();
                return Err(self.fail_start(e.into()));
            }
        }

        // A loop left over from a degraded or missing-file run is replaced.
        self.cancel_run();

        let initial = match reader::read_initial_tail(file_path, self.config.tail_window).await {
            Ok(initial) => initial,
            Err(e) => return Err(self.fail_start(e)),
        };

        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CAPACITY);
        let (detector, watch_error) = match arm(file_path, signal_tx) {
            Ok(detector) => (Some(detector), None),
            Err(e) => {
                tracing::warn!(
                    path = %file_path.display(),
                    error = %e,
                    "File watcher unavailable, tailing by polling only"
                );
                (None, Some(e))
            }
        };

        self.commit_start(initial, detector, watch_error, signal_rx);
        Ok(())
    }

    /// Moves to `Error` and publishes `e`, handing it back for the caller.
    fn fail_start(&self, e: Error) -> Error {
        tracing::warn!(path = %self.shared.file_path.display(), error = %e, "Cannot start tail");
        let publish = self.shared.lock_publish();
        self.shared
            .set_state(&publish, TailState::can_start, TailState::Error);
        self.shared.send(&publish, TailEvent::Error(e.duplicate()));
        e
    }

    fn commit_start(
        &self,
        initial: reader::InitialRead,
        detector: Option<ChangeDetector>,
        watch_error: Option<Error>,
        signals: mpsc::Receiver<ChangeSignal>,
    ) {
        let mut run = self.lock_run();
        // A concurrent start got here first.
        if !self.state().can_start() {
            return;
        }
        if let Some(previous) = run.take() {
            previous.cancel.cancel();
        }

        let settled = if watch_error.is_some() {
            TailState::Error
        } else {
            TailState::Running
        };
        let cancel = CancellationToken::new();

        {
            let publish = self.shared.lock_publish();
            self.shared
                .total_lines
                .store(initial.position.line_number(), Ordering::Release);
            self.shared.set_state(&publish, TailState::can_start, settled);
            tracing::info!(
                path = %self.shared.file_path.display(),
                lines = initial.lines.len(),
                offset = initial.position.byte_offset(),
                "Tail started"
            );
            self.shared
                .send(&publish, TailEvent::LinesAdded(initial.lines));
            if let Some(e) = watch_error {
                self.shared.send(&publish, TailEvent::Error(e));
            }
        }

        let monitor = Monitor {
            shared: Arc::clone(&self.shared),
            position: initial.position,
            cancel: cancel.clone(),
            settled,
        };
        let handle = tokio::spawn(monitor.run(signals, self.config.poll_interval));

        *run = Some(Run {
            cancel,
            _detector: detector,
            handle,
        });
    }

    /// Moves from `Running` to `Paused`. Returns whether the state changed.
    pub fn pause(&self) -> bool {
        self.shared
            .transition(|state| state == TailState::Running, TailState::Paused)
    }

    /// Moves from `Paused` back to `Running`. The next signal or poll tick
    /// reads everything written meanwhile.
    pub fn resume(&self) -> bool {
        self.shared
            .transition(|state| state == TailState::Paused, TailState::Running)
    }

    /// Cancels the monitoring loop, drops the watcher and goes `Idle`.
    ///
    /// Never blocks on the loop; no event of the stopped run is published
    /// after this returns.
    pub fn stop(&self) {
        if self.cancel_run().is_some() {
            tracing::info!(path = %self.shared.file_path.display(), "Tail stopped");
        }
        self.shared.transition(|_| true, TailState::Idle);
    }

    /// Like [`stop`](Self::stop), then waits for the monitoring task to exit.
    pub async fn shutdown(&self) {
        let handle = self.cancel_run();
        self.shared.transition(|_| true, TailState::Idle);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Cancels and detaches the current run, returning its task handle.
    fn cancel_run(&self) -> Option<JoinHandle<()>> {
        let run = self.lock_run().take()?;
        {
            let _publish = self.shared.lock_publish();
            run.cancel.cancel();
        }
        Some(run.handle)
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TailEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn state(&self) -> TailState {
        TailState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn lock_publish(&self) -> MutexGuard<'_, ()> {
        self.publish.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `to` when the current state passes `from`, publishing
    /// `StateChanged` only for an actual change.
    fn set_state(
        &self,
        publish: &MutexGuard<'_, ()>,
        from: impl Fn(TailState) -> bool,
        to: TailState,
    ) -> bool {
        let changed = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = TailState::from_u8(current);
                (current != to && from(current)).then_some(to as u8)
            })
            .is_ok();

        if changed {
            tracing::debug!(path = %self.file_path.display(), state = %to, "State changed");
            self.send(publish, TailEvent::StateChanged(to));
        }
        changed
    }

    fn send(&self, _publish: &MutexGuard<'_, ()>, event: TailEvent) {
        // Nobody listening is not an error for the engine.
        let _ = self.events.send(event);
    }

    fn transition(&self, from: impl Fn(TailState) -> bool, to: TailState) -> bool {
        let publish = self.lock_publish();
        self.set_state(&publish, from, to)
    }

    fn not_found(&self) -> Error {
        Error::FileNotFound {
            path: self.file_path.display().to_string(),
        }
    }
}

/// The monitoring loop's exclusive state.
struct Monitor {
    shared: Arc<Shared>,
    position: Position,
    cancel: CancellationToken,
    /// `Running`, or `Error` when tailing without a watcher.
    settled: TailState,
}

impl Monitor {
    async fn run(mut self, mut signals: mpsc::Receiver<ChangeSignal>, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial read just ran.
        ticker.tick().await;
        let mut watching = true;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                signal = signals.recv(), if watching => match signal {
                    Some(ChangeSignal::Changed) => {}
                    Some(ChangeSignal::Failed(message)) => {
                        tracing::warn!(error = %message, "File watcher reported an error");
                        self.publish(TailEvent::Error(Error::WatcherEvent { message }));
                    }
                    None => {
                        watching = false;
                        continue;
                    }
                },

                _ = ticker.tick() => {}
            }

            self.read_cycle().await;
        }

        tracing::debug!(path = %self.shared.file_path.display(), "Monitoring loop exited");
    }

    async fn read_cycle(&mut self) {
        let state = self.shared.state();
        if !state.reads_file() {
            return;
        }

        let file_path = self.shared.file_path.clone();
        match tokio::fs::try_exists(&file_path).await {
            Ok(true) => {}
            Ok(false) => {
                let lost = self.transition(
                    |state| matches!(state, TailState::Running | TailState::Error),
                    TailState::FileMissing,
                );
                if lost {
                    tracing::warn!(path = %file_path.display(), "Tailed file disappeared");
                    self.publish(TailEvent::Error(self.shared.not_found()));
                }
                return;
            }
            Err(e) => {
                self.publish(TailEvent::Error(e.into()));
                return;
            }
        }

        if state == TailState::FileMissing {
            // Recreated or rotated back into place: read it from the top.
            self.position.rewind();
            if !self.transition(|state| state == TailState::FileMissing, self.settled) {
                return;
            }
            tracing::info!(path = %file_path.display(), "Tailed file is back, reading from the beginning");
        }

        // Read against a copy; the cursor only moves once the batch is out.
        let mut position = self.position.clone();
        match reader::read_new_lines(&file_path, &mut position).await {
            Ok(batch) => self.publish_batch(&file_path, position, batch),
            Err(e) => {
                // Retried on the next signal or tick.
                tracing::debug!(path = %file_path.display(), error = %e, "Read cycle failed");
                self.publish(TailEvent::Error(e));
            }
        }
    }

    /// Publishes `batch` and moves the cursor to `position`, unless the engine
    /// was paused or stopped during the read. A dropped batch is read again
    /// by the first cycle after `resume`.
    fn publish_batch(&mut self, file_path: &Path, position: Position, batch: reader::ReadBatch) {
        let publish = self.shared.lock_publish();
        if self.cancel.is_cancelled() || !self.shared.state().reads_file() {
            tracing::trace!(path = %file_path.display(), "Batch discarded, not reading");
            return;
        }

        if let Some(Truncation { offset, length }) = batch.truncation {
            tracing::warn!(path = %file_path.display(), offset, length, "File truncated");
            self.shared.send(
                &publish,
                TailEvent::Error(Error::Truncated {
                    path: file_path.display().to_string(),
                    offset,
                    length,
                }),
            );
        }
        if !batch.lines.is_empty() {
            tracing::debug!(
                lines = batch.lines.len(),
                offset = position.byte_offset(),
                "Read new lines"
            );
            self.shared
                .total_lines
                .store(position.line_number(), Ordering::Release);
            self.shared.send(&publish, TailEvent::LinesAdded(batch.lines));
        }
        self.position = position;
    }

    /// Publishes unless this run has been cancelled.
    fn publish(&self, event: TailEvent) {
        let publish = self.shared.lock_publish();
        if !self.cancel.is_cancelled() {
            self.shared.send(&publish, event);
        }
    }

    fn transition(&self, from: impl Fn(TailState) -> bool, to: TailState) -> bool {
        let publish = self.shared.lock_publish();
        !self.cancel.is_cancelled() && self.shared.set_state(&publish, from, to)
    }
}
