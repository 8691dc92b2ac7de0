//! The render engine shared by bars and spinners.
//!
//! An [`Animator`] owns the start/stop state machine of one indicator and the
//! background workers of its current run:
//!
//! * **Ticker** (timer-driven painters only): draws one frame per interval.
//! * **Resize watcher** (auto-width painters only): re-measures and redraws on
//!   `SIGWINCH`.
//!
//! # Locking
//!
//! Locks are always taken in the order *control -> state -> sink*.
//!
//! * `control` serializes `start`/`stop`/`reset` and owns the workers. It is held across
//!   the join in `stop`, so a second concurrent `stop` also returns only after teardown.
//! * `state` guards [`RenderState`]. Workers and callers draw while holding it, which
//!   orders every frame exactly like the updates that produced it.
//! * The [`Sink`] lock is taken per write.
//!
//! Workers never touch `control`, so `stop` can join them without deadlocking.

use std::{
    error::Error as StdError,
    panic,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, select};
use parking_lot::Mutex;
use web_time::Instant;

use crate::{
    error::{Error, Result},
    sink::Sink,
    state::{Lifecycle, RenderState, Snapshot},
    width::ResizeWatcher,
};

/// Composes the visible text of one frame.
pub(crate) trait Painter: Send + Sync + 'static {
    /// The line for the current state, without the leading carriage return.
    fn paint(&self, state: &RenderState) -> String;

    /// Columns the painted line can occupy, used to size the clearing pass.
    fn span(&self, state: &RenderState) -> usize;

    /// Track width for the next run; re-evaluated on every start and resize.
    fn measure(&self) -> usize {
        0
    }

    /// Whether the width follows the terminal.
    fn auto_width(&self) -> bool {
        false
    }

    /// Redraw period for timer-driven painters.
    fn interval(&self) -> Option<Duration> {
        None
    }
}

/// State reachable from the workers.
pub(crate) struct Shared<P> {
    pub(crate) state: Mutex<RenderState>,
    pub(crate) painter: P,
    sink: Sink,
}

impl<P: Painter> Shared<P> {
    fn draw(&self, state: &mut RenderState) {
        let line = self.painter.paint(state);
        state.note_drawn(line.chars().count());
        self.sink.emit_lossy(&format!("\r{line}"));
    }

    /// Blanks the line and parks the cursor at column zero.
    fn clear(&self, state: &mut RenderState) {
        let columns = state.take_drawn().max(self.painter.span(state));
        self.sink
            .emit_lossy(&format!("\r{:columns$}\r", "", columns = columns));
    }

    /// One ticker beat: draw the current frame, then advance.
    fn tick(&self) {
        let mut state = self.state.lock();
        if state.is_running() {
            self.draw(&mut state);
            state.advance_frame();
        }
    }

    fn resize(&self) {
        let mut state = self.state.lock();
        if !state.is_running() {
            return;
        }
        let width = self.painter.measure();
        if width != state.width() {
            tracing::trace!(from = state.width(), to = width, "track width changed");
            state.set_width(width);
        }
        self.draw(&mut state);
    }
}

/// Background workers of one run. Dropping them cancels and joins.
struct Workers {
    cancel: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
    watcher: Option<ResizeWatcher>,
}

impl Workers {
    fn shutdown(&mut self) {
        // Disconnecting is the cancellation signal every worker listens for.
        drop(self.cancel.take());
        if let Some(watcher) = self.watcher.take() {
            watcher.shutdown();
        }
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                tracing::warn!("ticker thread panicked");
            }
        }
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lifecycle manager and renderer for one indicator.
pub(crate) struct Animator<P> {
    shared: Arc<Shared<P>>,
    control: Mutex<Option<Workers>>,
}

impl<P: Painter> Animator<P> {
    pub(crate) fn new(painter: P, sink: Sink, mut state: RenderState) -> Self {
        state.set_width(painter.measure());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                painter,
                sink,
            }),
            control: Mutex::new(None),
        }
    }

    pub(crate) fn painter(&self) -> &P {
        &self.shared.painter
    }

    pub(crate) fn sink(&self) -> &Sink {
        &self.shared.sink
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Starts a run. A no-op while already running.
    pub(crate) fn start(&self) {
        let mut control = self.control.lock();
        let kind = {
            let mut state = self.shared.state.lock();
            if state.is_running() {
                return;
            }
            if self.shared.painter.auto_width() {
                state.set_width(self.shared.painter.measure());
            }
            self.shared.clear(&mut state);
            state.begin(Instant::now());
            state.kind()
        };

        let (cancel, cancelled) = crossbeam_channel::bounded::<()>(0);

        let ticker = self
            .shared
            .painter
            .interval()
            .and_then(|every| spawn_ticker(Arc::clone(&self.shared), every, cancelled.clone()));

        let watcher = if self.shared.painter.auto_width() {
            let shared = Arc::clone(&self.shared);
            ResizeWatcher::spawn(move || shared.resize(), cancelled)
        } else {
            None
        };

        tracing::debug!(
            ?kind,
            ticker = ticker.is_some(),
            watcher = watcher.is_some(),
            "indicator started"
        );

        *control = Some(Workers {
            cancel: Some(cancel),
            ticker,
            watcher,
        });
    }

    /// Stops the run and returns once every worker has exited and the line is clear.
    /// A no-op unless running.
    pub(crate) fn stop(&self) {
        let mut control = self.control.lock();
        self.stop_locked(&mut control);
    }

    /// Stops if needed and returns to a fresh `Idle` state.
    pub(crate) fn reset(&self) {
        let mut control = self.control.lock();
        self.stop_locked(&mut control);
        self.shared.state.lock().reset();
    }

    fn stop_locked(&self, control: &mut Option<Workers>) {
        {
            let mut state = self.shared.state.lock();
            if !state.is_running() {
                return;
            }
            // From here on updates are discarded.
            state.end(Instant::now());
        }

        drop(control.take());

        let mut state = self.shared.state.lock();
        self.shared.clear(&mut state);
        tracing::debug!(kind = ?state.kind(), elapsed = ?state.elapsed(), "indicator stopped");
    }

    // ========================================================================
    // State access
    // ========================================================================

    /// Applies `update` and redraws, but only while running.
    ///
    /// Returns `false` if the update was discarded.
    pub(crate) fn update(&self, update: impl FnOnce(&mut RenderState)) -> bool {
        let mut state = self.shared.state.lock();
        if !state.is_running() {
            tracing::trace!("discarding update on idle indicator");
            return false;
        }
        update(&mut state);
        self.shared.draw(&mut state);
        true
    }

    /// Applies `edit` without drawing, whatever the lifecycle.
    pub(crate) fn edit<T>(&self, edit: impl FnOnce(&mut RenderState) -> T) -> T {
        edit(&mut self.shared.state.lock())
    }

    /// Reads the state under the lock.
    pub(crate) fn read<T>(&self, read: impl FnOnce(&RenderState) -> T) -> T {
        read(&self.shared.state.lock())
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.read(RenderState::lifecycle)
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.read(RenderState::snapshot)
    }

    /// Re-measures the width and redraws; what the resize watcher does on a signal.
    pub(crate) fn refresh_width(&self) {
        self.shared.resize();
    }

    // ========================================================================
    // Run helpers
    // ========================================================================

    /// Runs `task` on a scoped thread between `start` and `stop`.
    ///
    /// A panic in `task` still stops the indicator before being resumed here.
    pub(crate) fn run<T, F>(&self, task: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        self.start();
        let _stop = StopOnDrop(self);
        thread::scope(|scope| match scope.spawn(task).join() {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        })
    }

    /// Like [`run`](Self::run), but gives up after `timeout`.
    ///
    /// On timeout the indicator is stopped while `task` keeps running detached.
    pub(crate) fn run_with_timeout<T, E, F>(&self, timeout: Duration, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        self.start();
        let _stop = StopOnDrop(self);

        let (done, outcome) = crossbeam_channel::bounded(1);
        thread::Builder::new()
            .name("progress-task".into())
            .spawn(move || {
                // The receiver is gone if we already timed out.
                let _ = done.send(task());
            })?;

        select! {
            recv(outcome) -> outcome => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(Error::Task(err.into())),
                Err(_) => Err(Error::Panicked),
            },
            recv(crossbeam_channel::after(timeout)) -> _ => {
                tracing::debug!(?timeout, "task timed out");
                Err(Error::Timeout(timeout))
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn runs(&self) -> u64 {
        self.read(RenderState::runs)
    }

    #[cfg(test)]
    pub(crate) fn has_workers(&self) -> bool {
        self.control.lock().is_some()
    }
}

struct StopOnDrop<'a, P: Painter>(&'a Animator<P>);

impl<P: Painter> Drop for StopOnDrop<'_, P> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

fn spawn_ticker<P: Painter>(
    shared: Arc<Shared<P>>,
    every: Duration,
    cancelled: Receiver<()>,
) -> Option<JoinHandle<()>> {
    thread::Builder::new()
        .name("progress-ticker".into())
        .spawn(move || {
            let ticks = crossbeam_channel::tick(every);
            loop {
                select! {
                    recv(ticks) -> _ => shared.tick(),
                    recv(cancelled) -> _ => break,
                }
            }
        })
        .map_err(|err| tracing::warn!(error = %err, "cannot spawn ticker, indicator will not animate"))
        .ok()
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::{Animator, Painter};
    use crate::{
        sink::{SharedBuffer, Sink},
        state::{IndicatorKind, Lifecycle, RenderState},
    };

    /// Draws the frame counter so tests can read the sequence back.
    struct Counter;

    impl Painter for Counter {
        fn paint(&self, state: &RenderState) -> String {
            format!("<{}>", state.frame())
        }

        fn span(&self, _state: &RenderState) -> usize {
            4
        }

        fn interval(&self) -> Option<Duration> {
            Some(Duration::from_millis(2))
        }
    }

    fn animator() -> (Animator<Counter>, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let state = RenderState::new(IndicatorKind::Spinner, 0, "".into(), "".into());
        (Animator::new(Counter, Sink::from(buffer.clone()), state), buffer)
    }

    /// Idempotent Start
    /// A second start while running neither restarts nor spawns a second ticker.
    #[test]
    fn test_double_start() {
        let (animator, _buffer) = animator();
        animator.start();
        animator.start();
        assert_eq!(animator.runs(), 1);
        assert!(animator.has_workers());

        animator.stop();
        assert!(!animator.has_workers());
        assert_eq!(animator.lifecycle(), Lifecycle::Stopped);
    }

    /// Join Before Return
    /// Nothing reaches the sink after `stop` returns, and it ends on a cleared line.
    #[test]
    fn test_stop_is_final() {
        let (animator, buffer) = animator();
        animator.start();
        thread::sleep(Duration::from_millis(20));
        animator.stop();

        let len = buffer.len();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(buffer.len(), len, "no output after stop");
        assert!(buffer.contents().ends_with('\r'));
    }

    /// Ordered Frames
    /// Ticks produce a gapless, ordered sequence starting at zero.
    #[test]
    fn test_frames_in_order() {
        let (animator, buffer) = animator();
        animator.start();
        thread::sleep(Duration::from_millis(30));
        animator.stop();

        let drawn: Vec<u64> = buffer
            .contents()
            .split('\r')
            .filter_map(|s| s.strip_prefix('<')?.strip_suffix('>')?.parse().ok())
            .collect();
        assert!(!drawn.is_empty());
        assert!(drawn.iter().copied().eq(0..drawn.len() as u64));
    }

    /// Redundant Stop
    /// Stopping an idle or stopped animator writes nothing.
    #[test]
    fn test_redundant_stop() {
        let (animator, buffer) = animator();
        animator.stop();
        assert!(buffer.is_empty());
        assert_eq!(animator.lifecycle(), Lifecycle::Idle);
    }

    /// Discarded Updates
    /// Updates outside a run are refused.
    #[test]
    fn test_update_requires_running() {
        let (animator, _buffer) = animator();
        assert!(!animator.update(RenderState::advance_frame));
        animator.start();
        assert!(animator.update(|_| {}));
        animator.stop();
        assert!(!animator.update(|_| {}));
    }

    /// Concurrent Stop
    /// Several threads stopping at once all return after teardown.
    #[test]
    fn test_concurrent_stop() {
        let (animator, buffer) = animator();
        animator.start();
        thread::sleep(Duration::from_millis(10));

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    animator.stop();
                    assert!(!animator.has_workers());
                });
            }
        });

        let len = buffer.len();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(buffer.len(), len);
    }
}
