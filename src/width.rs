//! Terminal width detection and live resize handling.
//!
//! [`WidthProbe`] answers "how many columns do I have?" and never fails: when stdout is
//! not a terminal, or the query errors, it falls back to [`FALLBACK_WIDTH`].
//!
//! The resize watcher is a secondary worker that blocks on `SIGWINCH` and asks its
//! indicator to re-measure and redraw. It only exists on unix; elsewhere the width
//! chosen at start is kept for the whole run.

use std::{
    fmt,
    io::{self, IsTerminal as _},
    sync::Arc,
};

/// Width used when the terminal cannot be measured.
pub const FALLBACK_WIDTH: usize = 60;

/// Smallest track a bar is shrunk to on narrow terminals.
pub const MIN_TRACK_WIDTH: usize = 10;

/// Columns kept free at the end of the line so the cursor never wraps.
const MARGIN: usize = 2;

type Query = dyn Fn() -> Option<usize> + Send + Sync;

/// Measures the number of columns available for rendering.
#[derive(Clone)]
pub struct WidthProbe {
    query: Arc<Query>,
}

impl WidthProbe {
    /// Queries the terminal attached to stdout.
    #[must_use]
    pub fn terminal() -> Self {
        Self::from_fn(|| {
            if !io::stdout().is_terminal() {
                return None;
            }
            crossterm::terminal::size()
                .ok()
                .map(|(cols, _)| usize::from(cols))
        })
    }

    /// Always reports `columns`.
    #[must_use]
    pub fn fixed(columns: usize) -> Self {
        Self::from_fn(move || Some(columns))
    }

    /// Uses a custom query; `None` means "unknown" and triggers the fallback.
    pub fn from_fn(query: impl Fn() -> Option<usize> + Send + Sync + 'static) -> Self {
        Self {
            query: Arc::new(query),
        }
    }

    /// The raw column count, if the query succeeded.
    #[must_use]
    pub fn columns(&self) -> Option<usize> {
        (self.query)().filter(|&cols| cols > 0)
    }

    /// The column count, or [`FALLBACK_WIDTH`].
    #[must_use]
    pub fn measure(&self) -> usize {
        self.columns().unwrap_or(FALLBACK_WIDTH)
    }

    /// Width left for a bar's track once `reserved` columns of text are set aside.
    ///
    /// Never goes below [`MIN_TRACK_WIDTH`]; an unmeasurable terminal yields
    /// [`FALLBACK_WIDTH`] as-is.
    #[must_use]
    pub fn track_width(&self, reserved: usize) -> usize {
        self.columns().map_or(FALLBACK_WIDTH, |cols| {
            cols.saturating_sub(reserved + MARGIN).max(MIN_TRACK_WIDTH)
        })
    }
}

impl Default for WidthProbe {
    fn default() -> Self {
        Self::terminal()
    }
}

impl fmt::Debug for WidthProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidthProbe")
            .field("columns", &self.columns())
            .finish()
    }
}

#[cfg(unix)]
pub(crate) use watcher::ResizeWatcher;

#[cfg(unix)]
mod watcher {
    use std::thread::{self, JoinHandle};

    use crossbeam_channel::{Receiver, TryRecvError};
    use signal_hook::{consts::SIGWINCH, iterator::Signals, iterator::Handle};

    /// Worker thread redrawing an indicator whenever the terminal is resized.
    pub(crate) struct ResizeWatcher {
        handle: Handle,
        thread: JoinHandle<()>,
    }

    impl ResizeWatcher {
        /// Registers for `SIGWINCH` and spawns the worker.
        ///
        /// The registration happens before this returns, so a resize raised right after
        /// start is not lost. Returns `None` (logged) if either step fails.
        pub(crate) fn spawn(
            on_resize: impl Fn() + Send + 'static,
            cancelled: Receiver<()>,
        ) -> Option<Self> {
            let mut signals = match Signals::new([SIGWINCH]) {
                Ok(signals) => signals,
                Err(err) => {
                    tracing::warn!(error = %err, "cannot watch terminal resizes");
                    return None;
                }
            };
            let handle = signals.handle();

            let spawned = thread::Builder::new()
                .name("progress-resize".into())
                .spawn(move || {
                    for _ in signals.forever() {
                        if matches!(cancelled.try_recv(), Err(TryRecvError::Disconnected)) {
                            break;
                        }
                        tracing::trace!("terminal resized");
                        on_resize();
                    }
                });

            match spawned {
                Ok(thread) => Some(Self { handle, thread }),
                Err(err) => {
                    handle.close();
                    tracing::warn!(error = %err, "cannot spawn resize watcher");
                    None
                }
            }
        }

        /// Wakes the worker out of its signal wait and joins it.
        pub(crate) fn shutdown(self) {
            self.handle.close();
            if self.thread.join().is_err() {
                tracing::warn!("resize watcher panicked");
            }
        }
    }
}

#[cfg(not(unix))]
pub(crate) struct ResizeWatcher;

#[cfg(not(unix))]
impl ResizeWatcher {
    pub(crate) fn spawn(
        _on_resize: impl Fn() + Send + 'static,
        _cancelled: crossbeam_channel::Receiver<()>,
    ) -> Option<Self> {
        None
    }

    pub(crate) fn shutdown(self) {}
}
