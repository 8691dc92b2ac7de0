//! The mutable state behind one indicator.
//!
//! [`RenderState`] holds every field that the caller, the ticker thread, and the
//! resize watcher may touch. It is always reached through the indicator's
//! [`Mutex`](parking_lot::Mutex), which is what keeps a progress update from racing a
//! redraw. Nothing in here knows about threads or terminals.
//!
//! # Snapshots
//!
//! [`Snapshot`] is a plain copy of the state at one instant, with derived metrics such
//! as [`Snapshot::eta`]. It is what callers and registries hand out; it requires no
//! locking to read.

use std::time::Duration;

use compact_str::CompactString;
use web_time::Instant;

/// Where an indicator is in its start/stop cycle.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifecycle {
    /// Constructed (or reset) and never started since.
    #[default]
    Idle,
    /// Drawing; background workers are alive.
    Running,
    /// Workers joined and the line cleared.
    Stopped,
}

/// Which kind of indicator a state belongs to.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndicatorKind {
    /// Indeterminate, timer-driven.
    #[default]
    Spinner,
    /// Determinate, caller-driven.
    Bar,
}

/// Clamps a completion fraction into `[0.0, 1.0]`; `NaN` counts as no progress.
#[must_use]
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Lock-protected fields of one indicator.
#[derive(Debug)]
pub(crate) struct RenderState {
    kind: IndicatorKind,
    lifecycle: Lifecycle,
    progress: f64,
    frame: u64,
    width: usize,
    started: Option<Instant>,
    stopped: Option<Instant>,
    prefix: CompactString,
    suffix: CompactString,
    /// Widest line written since the last clear.
    drawn: usize,
    runs: u64,
}

impl RenderState {
    pub(crate) fn new(
        kind: IndicatorKind,
        width: usize,
        prefix: CompactString,
        suffix: CompactString,
    ) -> Self {
        Self {
            kind,
            lifecycle: Lifecycle::Idle,
            progress: 0.0,
            frame: 0,
            width,
            started: None,
            stopped: None,
            prefix,
            suffix,
            drawn: 0,
            runs: 0,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub(crate) const fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub(crate) const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Enters `Running` with zeroed progress and a fresh start time.
    pub(crate) fn begin(&mut self, now: Instant) {
        self.lifecycle = Lifecycle::Running;
        self.progress = 0.0;
        self.frame = 0;
        self.started = Some(now);
        self.stopped = None;
        self.runs += 1;
    }

    /// Enters `Stopped`, freezing the elapsed time.
    pub(crate) fn end(&mut self, now: Instant) {
        self.lifecycle = Lifecycle::Stopped;
        self.stopped = Some(now);
    }

    /// Back to a fresh `Idle` state. Width and text are configuration and survive.
    pub(crate) fn reset(&mut self) {
        self.lifecycle = Lifecycle::Idle;
        self.progress = 0.0;
        self.frame = 0;
        self.started = None;
        self.stopped = None;
    }

    /// Number of times this state entered `Running`.
    pub(crate) const fn runs(&self) -> u64 {
        self.runs
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub(crate) const fn progress(&self) -> f64 {
        self.progress
    }

    pub(crate) fn set_progress(&mut self, progress: f64) {
        self.progress = clamp_progress(progress);
    }

    pub(crate) const fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    pub(crate) const fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn set_prefix(&mut self, prefix: CompactString) {
        self.prefix = prefix;
    }

    pub(crate) fn suffix(&self) -> &str {
        &self.suffix
    }

    pub(crate) fn set_suffix(&mut self, suffix: CompactString) {
        self.suffix = suffix;
    }

    // ========================================================================
    // Drawing bookkeeping
    // ========================================================================

    pub(crate) fn note_drawn(&mut self, columns: usize) {
        self.drawn = self.drawn.max(columns);
    }

    /// Returns the widest line drawn since the last call and starts over.
    pub(crate) fn take_drawn(&mut self) -> usize {
        std::mem::take(&mut self.drawn)
    }

    /// Time since start, frozen at stop. `None` before the first start.
    pub(crate) fn elapsed(&self) -> Option<Duration> {
        let started = self.started?;
        Some(
            self.stopped
                .map_or_else(|| started.elapsed(), |stopped| stopped.duration_since(started)),
        )
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            kind: self.kind,
            lifecycle: self.lifecycle,
            progress: self.progress,
            frame: self.frame,
            width: self.width,
            elapsed: self.elapsed(),
        }
    }
}

/// A plain-data copy of an indicator's state at a specific point in time.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    kind: IndicatorKind,
    lifecycle: Lifecycle,
    progress: f64,
    frame: u64,
    width: usize,
    elapsed: Option<Duration>,
}

impl Snapshot {
    /// Returns the kind of indicator.
    #[must_use]
    pub const fn kind(&self) -> IndicatorKind {
        self.kind
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Completion fraction in `[0, 1]` (always `0` for spinners).
    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Number of spinner frames drawn during the current run.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Track width in cells.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Time since start, frozen once stopped.
    #[must_use]
    pub const fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Whole percent complete, truncated (`0..=100`).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn percent(&self) -> u8 {
        (self.progress * 100.0) as u8
    }

    /// Estimates the time remaining from the average rate since start.
    ///
    /// The total duration is extrapolated as `elapsed / progress`; the remainder is
    /// floored at zero. Returns `None` while no progress has been made or the
    /// indicator was never started.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        if self.progress <= 0.0 {
            return None;
        }
        let elapsed = self.elapsed?;
        let total = Duration::try_from_secs_f64(elapsed.as_secs_f64() / self.progress).ok()?;
        Some(total.saturating_sub(elapsed))
    }
}

/// Formats an ETA as `mm:ss`, or `--:--` when unknown.
#[must_use]
pub fn format_eta(eta: Option<Duration>) -> String {
    eta.map_or_else(
        || "--:--".to_owned(),
        |eta| {
            let secs = eta.as_secs();
            format!("{:02}:{:02}", secs / 60, secs % 60)
        },
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use web_time::Instant;

    use super::{IndicatorKind, Lifecycle, RenderState, Snapshot, clamp_progress, format_eta};

    fn bar_state() -> RenderState {
        RenderState::new(IndicatorKind::Bar, 10, "".into(), "".into())
    }

    /// Clamping
    /// Every input lands in `[0, 1]`, never rejected.
    #[test]
    #[allow(clippy::float_cmp)]
    fn test_clamp() {
        let mut state = bar_state();
        for (input, expected) in [
            (-1.0, 0.0),
            (0.0, 0.0),
            (0.25, 0.25),
            (1.0, 1.0),
            (1.5, 1.0),
            (f64::INFINITY, 1.0),
            (f64::NEG_INFINITY, 0.0),
        ] {
            state.set_progress(input);
            assert_eq!(state.progress(), expected, "input {input}");
        }
        assert_eq!(clamp_progress(f64::NAN), 0.0);
    }

    /// Lifecycle
    /// `begin` zeroes values, `end` freezes elapsed time, `reset` forgets timestamps.
    #[test]
    #[allow(clippy::float_cmp)]
    fn test_lifecycle_transitions() {
        let mut state = bar_state();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert!(state.elapsed().is_none());

        let t0 = Instant::now();
        state.begin(t0);
        state.set_progress(0.7);
        state.advance_frame();
        assert!(state.is_running());

        state.end(t0 + Duration::from_secs(3));
        assert_eq!(state.lifecycle(), Lifecycle::Stopped);
        assert_eq!(state.elapsed(), Some(Duration::from_secs(3)));

        state.begin(Instant::now());
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.frame(), 0);
        assert_eq!(state.runs(), 2);

        state.reset();
        assert_eq!(state.lifecycle(), Lifecycle::Idle);
        assert!(state.elapsed().is_none());
        assert_eq!(state.width(), 10);
    }

    /// ETA Math
    /// Half done after 10s means 10s left; no progress means unknown.
    #[test]
    fn test_eta() {
        let half = Snapshot {
            kind: IndicatorKind::Bar,
            lifecycle: Lifecycle::Running,
            progress: 0.5,
            elapsed: Some(Duration::from_secs(10)),
            ..Snapshot::default()
        };
        assert_eq!(half.eta(), Some(Duration::from_secs(10)));
        assert_eq!(half.percent(), 50);

        let done = Snapshot {
            progress: 1.0,
            ..half.clone()
        };
        assert_eq!(done.eta(), Some(Duration::ZERO));

        let none = Snapshot {
            progress: 0.0,
            ..half
        };
        assert!(none.eta().is_none());
        assert!(Snapshot::default().eta().is_none());
    }

    /// ETA Formatting
    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(None), "--:--");
        assert_eq!(format_eta(Some(Duration::from_secs(75))), "01:15");
        assert_eq!(format_eta(Some(Duration::from_secs(6000))), "100:00");
    }

    /// Drawn Width
    /// The clearing pass covers the widest line since the previous clear.
    #[test]
    fn test_drawn_tracking() {
        let mut state = bar_state();
        state.note_drawn(12);
        state.note_drawn(4);
        assert_eq!(state.take_drawn(), 12);
        assert_eq!(state.take_drawn(), 0);
    }
}
