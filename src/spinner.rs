//! Indeterminate spinners.
//!
//! A running [`Spinner`] owns one ticker thread that draws `prefix`, the current
//! glyph, and `suffix` once per interval. The text around the glyph can be changed
//! from any thread while it spins.

use std::{error::Error as StdError, fmt, sync::Arc, time::Duration};

use compact_str::{CompactString, format_compact};

use crate::{
    animator::{Animator, Painter},
    builder::{SpinnerBuilder, check_text},
    error::{Error, Result},
    frames::Frames,
    sink::Sink,
    state::{IndicatorKind, Lifecycle, RenderState, Snapshot},
};

/// Interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Rendering options of a [`Spinner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpinnerConfig {
    /// Glyphs to cycle through.
    pub frames: Frames,
    /// Time between frames.
    pub interval: Duration,
    /// Initial text before the glyph.
    pub prefix: CompactString,
    /// Initial text after the glyph.
    pub suffix: CompactString,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            frames: Frames::default(),
            interval: DEFAULT_INTERVAL,
            prefix: CompactString::default(),
            suffix: CompactString::default(),
        }
    }
}

impl SpinnerConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig("frame interval must be positive"));
        }
        check_text(&self.prefix, "spinner prefix must not contain control characters")?;
        check_text(&self.suffix, "spinner suffix must not contain control characters")
    }
}

pub(crate) struct SpinnerPainter {
    config: SpinnerConfig,
}

impl Painter for SpinnerPainter {
    fn paint(&self, state: &RenderState) -> String {
        let glyph = self.config.frames.glyph(state.frame());
        format!("{}{glyph}{}", state.prefix(), state.suffix())
    }

    fn span(&self, state: &RenderState) -> usize {
        state.prefix().chars().count() + 1 + state.suffix().chars().count()
    }

    fn interval(&self) -> Option<Duration> {
        Some(self.config.interval)
    }
}

/// A thread-safe, cloneable handle to a terminal spinner.
#[derive(Clone)]
pub struct Spinner {
    inner: Arc<Animator<SpinnerPainter>>,
}

impl Spinner {
    /// `| / - \` every 100 ms on stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(SpinnerConfig::default(), Sink::stdout())
    }

    /// A default spinner showing `message` before the glyph.
    #[must_use]
    pub fn with_message(message: &str) -> Self {
        let config = SpinnerConfig {
            prefix: printable(format_compact!("{message} ")),
            ..SpinnerConfig::default()
        };
        Self::from_parts(config, Sink::stdout())
    }

    /// Starts a [`SpinnerBuilder`].
    #[must_use]
    pub fn builder() -> SpinnerBuilder {
        SpinnerBuilder::new()
    }

    /// A spinner on stdout with the given configuration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn with_config(config: SpinnerConfig) -> Result<Self> {
        SpinnerBuilder::from_config(config).build()
    }

    pub(crate) fn from_parts(config: SpinnerConfig, sink: Sink) -> Self {
        let state = RenderState::new(
            IndicatorKind::Spinner,
            0,
            config.prefix.clone(),
            config.suffix.clone(),
        );
        Self {
            inner: Arc::new(Animator::new(SpinnerPainter { config }, sink, state)),
        }
    }

    /// Runs `task` while a spinner labelled `message` animates on stdout.
    pub fn perform<T, F>(message: &str, task: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        Self::with_message(message).run(task)
    }

    /// The configuration this spinner was built with.
    #[must_use]
    pub fn config(&self) -> &SpinnerConfig {
        &self.inner.painter().config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Clears the line and starts animating from the first frame.
    ///
    /// A no-op while already running.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Stops the ticker, waits for it to exit, and clears the line.
    ///
    /// When this returns nothing else will be written by this spinner. A no-op unless
    /// running.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stops, then starts again from the first frame.
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

    /// Frames drawn during the current run.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.inner.read(RenderState::frame)
    }

    /// A consistent copy of the spinner's state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    // ========================================================================
    // Text
    // ========================================================================

    /// Current text before the glyph.
    #[must_use]
    pub fn prefix(&self) -> CompactString {
        self.inner.read(|state| state.prefix().into())
    }

    /// Replaces the text before the glyph; shown from the next frame on.
    ///
    /// Control characters are dropped.
    pub fn set_prefix(&self, prefix: impl Into<CompactString>) {
        let prefix = printable(prefix.into());
        self.inner.edit(|state| state.set_prefix(prefix));
    }

    /// Current text after the glyph.
    #[must_use]
    pub fn suffix(&self) -> CompactString {
        self.inner.read(|state| state.suffix().into())
    }

    /// Replaces the text after the glyph; shown from the next frame on.
    ///
    /// Control characters are dropped.
    pub fn set_suffix(&self, suffix: impl Into<CompactString>) {
        let suffix = printable(suffix.into());
        self.inner.edit(|state| state.set_suffix(suffix));
    }

    // ========================================================================
    // Run helpers
    // ========================================================================

    /// Starts spinning, runs `task` on a separate thread, then stops.
    ///
    /// The spinner is stopped even if `task` panics; the panic is then resumed here.
    pub fn run<T, F>(&self, task: F) -> T
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        self.inner.run(task)
    }

    /// Like [`run`](Self::run), but stops waiting after `timeout`.
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] if `task` is still running after `timeout`. The task is
    ///   not interrupted; only the spinner stops.
    /// * [`Error::Task`] if `task` returned an error.
    /// * [`Error::Panicked`] if `task` panicked.
    /// * [`Error::Spawn`] if no thread could be spawned for `task`.
    pub fn run_with_timeout<T, E, F>(&self, timeout: Duration, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        self.inner.run_with_timeout(timeout, task)
    }
}

fn printable(text: CompactString) -> CompactString {
    if text.chars().any(char::is_control) {
        text.chars().filter(|c| !c.is_control()).collect()
    } else {
        text
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Spinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinner")
            .field("config", self.config())
            .field("state", &self.snapshot())
            .finish()
    }
}
