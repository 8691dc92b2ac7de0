//! Determinate progress bars.
//!
//! A [`Bar`] has no timer: every [`Bar::set_progress`] draws one line synchronously
//! on the calling thread, under the bar's state lock. Updates may come from any number
//! of threads; the lock orders them and their frames identically.
//!
//! Bars with `width == 0` follow the terminal: the width is measured on every start
//! and, on unix, whenever the terminal reports a resize.
//!
//! ```no_run
//! use live_progress::Bar;
//!
//! let bar = Bar::new();
//! bar.run(|bar| {
//!     for step in 1..=10 {
//!         bar.set_progress(f64::from(step) / 10.0);
//!     }
//! });
//! ```

use std::{error::Error as StdError, fmt, fmt::Write as _, sync::Arc, time::Duration};

use compact_str::CompactString;

use crate::{
    animator::{Animator, Painter},
    builder::{BarBuilder, check_text},
    error::{Error, Result},
    frames::Track,
    sink::Sink,
    state::{IndicatorKind, Lifecycle, RenderState, Snapshot, format_eta},
    width::WidthProbe,
};

/// Columns taken by the ` 100%` suffix.
const PERCENT_COLUMNS: usize = 5;
/// Columns taken by the ` ETA: 00:00` suffix.
const ETA_COLUMNS: usize = 12;

/// Rendering options of a [`Bar`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarConfig {
    /// Track width in cells; `0` follows the terminal.
    pub width: usize,
    /// Filled and empty glyphs.
    pub track: Track,
    /// Append the completion percentage.
    pub show_percent: bool,
    /// Append the estimated time remaining.
    pub show_eta: bool,
    /// Text before the track.
    pub prefix: CompactString,
    /// Text after every other field.
    pub suffix: CompactString,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            width: 0,
            track: Track::default(),
            show_percent: true,
            show_eta: false,
            prefix: CompactString::default(),
            suffix: CompactString::default(),
        }
    }
}

impl BarConfig {
    /// `█` on `░`, with percentage.
    #[must_use]
    pub fn blocks() -> Self {
        Self::styled('█', '░', true)
    }

    /// `●` on `○`, with percentage.
    #[must_use]
    pub fn dots() -> Self {
        Self::styled('●', '○', true)
    }

    /// `=` on `-`, bare.
    #[must_use]
    pub fn minimal() -> Self {
        Self::styled('=', '-', false)
    }

    fn styled(filled: char, empty: char, show_percent: bool) -> Self {
        Self {
            track: Track { filled, empty },
            show_percent,
            ..Self::default()
        }
    }

    /// Columns needed next to the track by the enabled fields.
    #[must_use]
    pub fn reserved(&self) -> usize {
        let mut reserved = self.prefix.chars().count() + self.suffix.chars().count();
        if self.show_percent {
            reserved += PERCENT_COLUMNS;
        }
        if self.show_eta {
            reserved += ETA_COLUMNS;
        }
        reserved
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let Track { filled, empty } = self.track;
        if filled.is_control() || empty.is_control() {
            return Err(Error::InvalidConfig("bar glyphs must be printable"));
        }
        if filled == empty {
            return Err(Error::InvalidConfig("filled and empty glyphs must differ"));
        }
        check_text(&self.prefix, "bar prefix must not contain control characters")?;
        check_text(&self.suffix, "bar suffix must not contain control characters")
    }
}

pub(crate) struct BarPainter {
    config: BarConfig,
    probe: WidthProbe,
}

impl Painter for BarPainter {
    fn paint(&self, state: &RenderState) -> String {
        let snapshot = state.snapshot();
        let mut line = String::with_capacity(state.width() + self.config.reserved());

        line.push_str(&self.config.prefix);
        line.push_str(&self.config.track.render(state.width(), state.progress()));
        if self.config.show_percent {
            let _ = write!(line, " {:3}%", snapshot.percent());
        }
        if self.config.show_eta {
            let _ = write!(line, " ETA: {}", format_eta(snapshot.eta()));
        }
        line.push_str(&self.config.suffix);
        line
    }

    fn span(&self, state: &RenderState) -> usize {
        state.width() + self.config.reserved()
    }

    fn measure(&self) -> usize {
        match self.config.width {
            0 => self.probe.track_width(self.config.reserved()),
            fixed => fixed,
        }
    }

    fn auto_width(&self) -> bool {
        self.config.width == 0
    }
}

/// A thread-safe, cloneable handle to a terminal progress bar.
///
/// Clones share the same bar: any clone may update progress while another starts or
/// stops it.
#[derive(Clone)]
pub struct Bar {
    inner: Arc<Animator<BarPainter>>,
}

impl Bar {
    /// A bar with the default style on stdout, sized to the terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(BarConfig::default(), Sink::stdout(), WidthProbe::terminal())
    }

    /// Starts a [`BarBuilder`].
    #[must_use]
    pub fn builder() -> BarBuilder {
        BarBuilder::new()
    }

    /// A bar on stdout with the given configuration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn with_config(config: BarConfig) -> Result<Self> {
        BarBuilder::from_config(config).build()
    }

    pub(crate) fn from_parts(config: BarConfig, sink: Sink, probe: WidthProbe) -> Self {
        let state = RenderState::new(
            IndicatorKind::Bar,
            0,
            CompactString::default(),
            CompactString::default(),
        );
        Self {
            inner: Arc::new(Animator::new(BarPainter { config, probe }, sink, state)),
        }
    }

    /// The configuration this bar was built with.
    #[must_use]
    pub fn config(&self) -> &BarConfig {
        &self.inner.painter().config
    }

    pub(crate) fn sink(&self) -> &Sink {
        self.inner.sink()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Clears the line, zeroes progress, and begins accepting updates.
    ///
    /// A no-op while already running.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Stops the resize watcher, waits for it, and clears the line.
    ///
    /// When this returns nothing else will be written by this bar. A no-op unless
    /// running.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stops, then starts again from zero.
    pub fn restart(&self) {
        self.stop();
        self.start();
    }

    /// Stops if running and returns to a fresh, never-started state.
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle()
    }

    /// Shorthand for `lifecycle() == Lifecycle::Running`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    // ========================================================================
    // Progress
    // ========================================================================

    /// Sets the completion fraction and redraws.
    ///
    /// Values outside `[0, 1]` are clamped. Ignored unless running.
    pub fn set_progress(&self, progress: f64) {
        self.inner.update(|state| state.set_progress(progress));
    }

    /// Adds `delta` to the completion fraction and redraws.
    pub fn increment(&self, delta: f64) {
        self.inner
            .update(|state| state.set_progress(state.progress() + delta));
    }

    /// Current completion fraction in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.inner.read(RenderState::progress)
    }

    /// Current track width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.inner.read(RenderState::width)
    }

    /// Estimated time remaining, `None` until some progress was made.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        self.snapshot().eta()
    }

    /// A consistent copy of the bar's state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    /// Re-measures the terminal and redraws at the new width.
    ///
    /// The resize watcher calls this on every `SIGWINCH`; call it yourself on
    /// platforms without that signal. Ignored unless running.
    pub fn refresh_width(&self) {
        self.inner.refresh_width();
    }

    // ========================================================================
    // Run helpers
    // ========================================================================

    /// Starts the bar, runs `task` on a separate thread with this bar, then stops.
    ///
    /// The bar is stopped even if `task` panics; the panic is then resumed here.
    pub fn run<T, F>(&self, task: F) -> T
    where
        F: FnOnce(&Self) -> T + Send,
        T: Send,
    {
        self.inner.run(|| task(self))
    }

    /// Like [`run`](Self::run), but stops waiting after `timeout`.
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] if `task` is still running after `timeout`. The task is
    ///   not interrupted; only the bar stops.
    /// * [`Error::Task`] if `task` returned an error.
    /// * [`Error::Panicked`] if `task` panicked.
    /// * [`Error::Spawn`] if no thread could be spawned for `task`.
    pub fn run_with_timeout<T, E, F>(&self, timeout: Duration, task: F) -> Result<T>
    where
        F: FnOnce(Self) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        let bar = self.clone();
        self.inner.run_with_timeout(timeout, move || task(bar))
    }
}

impl Default for Bar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bar")
            .field("config", self.config())
            .field("state", &self.snapshot())
            .finish()
    }
}
