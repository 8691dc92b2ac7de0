//! Fluent interface for constructing [`Bar`] and [`Spinner`] instances.
//!
//! Simple indicators can be created with [`Bar::new`] or [`Spinner::new`]; the builders
//! cover everything else:
//!
//! * **Rendering options:** glyphs, fixed or automatic width, percentage and ETA
//!   suffixes, prefix/suffix text, frame sequence and interval.
//! * **Output:** any [`Sink`] (or plain writer). Indicators that should share the
//!   terminal must share one sink; [`Registry`](crate::Registry) does this for you.
//! * **Width source:** a custom [`WidthProbe`], for embedding in something that is not
//!   a terminal or for tests.
//!
//! Configuration mistakes are reported by `build`, never mid-run.

use std::{borrow::Cow, io::Write, time::Duration};

use compact_str::CompactString;

use crate::{
    bar::{Bar, BarConfig},
    error::Result,
    frames::Frames,
    sink::Sink,
    spinner::{Spinner, SpinnerConfig},
    width::WidthProbe,
};

/// A builder for [`Bar`].
#[derive(Debug, Default)]
pub struct BarBuilder {
    config: BarConfig,
    sink: Option<Sink>,
    probe: Option<WidthProbe>,
}

impl BarBuilder {
    /// Starts from the default style (`#` on blank, percentage shown).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, such as one of the named styles.
    #[must_use]
    pub fn from_config(config: BarConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Fixes the track width. `0` follows the terminal.
    #[must_use]
    pub const fn width(mut self, width: usize) -> Self {
        self.config.width = width;
        self
    }

    /// Glyph for the completed part of the track.
    #[must_use]
    pub const fn filled(mut self, glyph: char) -> Self {
        self.config.track.filled = glyph;
        self
    }

    /// Glyph for the remaining part of the track.
    #[must_use]
    pub const fn empty(mut self, glyph: char) -> Self {
        self.config.track.empty = glyph;
        self
    }

    /// Shows or hides the ` 42%` suffix.
    #[must_use]
    pub const fn show_percent(mut self, show: bool) -> Self {
        self.config.show_percent = show;
        self
    }

    /// Shows or hides the ` ETA: mm:ss` suffix.
    #[must_use]
    pub const fn show_eta(mut self, show: bool) -> Self {
        self.config.show_eta = show;
        self
    }

    /// Text drawn before the track.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<CompactString>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Text drawn after every other field.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<CompactString>) -> Self {
        self.config.suffix = suffix.into();
        self
    }

    /// Output destination. Defaults to stdout.
    #[must_use]
    pub fn sink(mut self, sink: Sink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Output destination as a plain writer.
    #[must_use]
    pub fn writer(self, writer: impl Write + Send + 'static) -> Self {
        self.sink(Sink::new(writer))
    }

    /// Width source for automatic sizing. Defaults to the terminal.
    #[must_use]
    pub fn probe(mut self, probe: WidthProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Validates the configuration and returns an idle [`Bar`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`](crate::Error::InvalidConfig) when the glyphs or text
    /// would break in-place redraws.
    pub fn build(self) -> Result<Bar> {
        self.config.validate()?;
        Ok(Bar::from_parts(
            self.config,
            self.sink.unwrap_or_default(),
            self.probe.unwrap_or_default(),
        ))
    }
}

/// A builder for [`Spinner`].
#[derive(Debug, Default)]
pub struct SpinnerBuilder {
    config: SpinnerConfig,
    sink: Option<Sink>,
}

impl SpinnerBuilder {
    /// Starts from the defaults (`| / - \` every 100 ms).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[must_use]
    pub fn from_config(config: SpinnerConfig) -> Self {
        Self { config, sink: None }
    }

    /// Frame sequence to cycle through.
    #[must_use]
    pub fn frames(mut self, frames: Frames) -> Self {
        self.config.frames = frames;
        self
    }

    /// Frame sequence from raw glyphs; validated by [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`](crate::Error::InvalidConfig) for an empty or
    /// non-printable sequence.
    pub fn glyphs(self, glyphs: impl Into<Cow<'static, [char]>>) -> Result<Self> {
        Ok(self.frames(Frames::new(glyphs)?))
    }

    /// Time between frames.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Text drawn before the glyph.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<CompactString>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Text drawn after the glyph.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<CompactString>) -> Self {
        self.config.suffix = suffix.into();
        self
    }

    /// Output destination. Defaults to stdout.
    #[must_use]
    pub fn sink(mut self, sink: Sink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Output destination as a plain writer.
    #[must_use]
    pub fn writer(self, writer: impl Write + Send + 'static) -> Self {
        self.sink(Sink::new(writer))
    }

    /// Validates the configuration and returns an idle [`Spinner`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`](crate::Error::InvalidConfig) for a zero interval or
    /// non-printable text.
    pub fn build(self) -> Result<Spinner> {
        self.config.validate()?;
        Ok(Spinner::from_parts(self.config, self.sink.unwrap_or_default()))
    }
}

/// Rejects text that would move the cursor off the indicator's line.
pub(crate) fn check_text(text: &str, what: &'static str) -> Result<()> {
    if text.chars().any(char::is_control) {
        return Err(crate::Error::InvalidConfig(what));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{BarBuilder, SpinnerBuilder};
    use crate::{Error, frames::Frames, state::Lifecycle, width::WidthProbe};

    /// Bar Options
    /// Every option lands in the built bar's configuration.
    #[test]
    fn test_bar_options() {
        let bar = BarBuilder::new()
            .width(24)
            .filled('=')
            .empty('-')
            .show_percent(false)
            .show_eta(true)
            .prefix("dl ")
            .suffix(" !")
            .writer(Vec::new())
            .build()
            .unwrap();

        let config = bar.config();
        assert_eq!(config.width, 24);
        assert_eq!((config.track.filled, config.track.empty), ('=', '-'));
        assert!(!config.show_percent && config.show_eta);
        assert_eq!(bar.width(), 24);
        assert_eq!(bar.lifecycle(), Lifecycle::Idle);
    }

    /// Automatic Width
    /// A zero width defers to the probe, minus the reserved percentage column.
    #[test]
    fn test_bar_auto_width() {
        let bar = BarBuilder::new()
            .probe(WidthProbe::fixed(40))
            .writer(Vec::new())
            .build()
            .unwrap();
        assert_eq!(bar.width(), 40 - 5 - 2);
    }

    /// Invalid Bars
    /// Glyphs and text that would corrupt the line are rejected at build time.
    #[test]
    fn test_bar_rejects() {
        let same = BarBuilder::new().filled('x').empty('x').build();
        assert!(matches!(same, Err(Error::InvalidConfig(_))));

        let control = BarBuilder::new().filled('\t').build();
        assert!(matches!(control, Err(Error::InvalidConfig(_))));

        let newline = BarBuilder::new().prefix("a\nb").build();
        assert!(matches!(newline, Err(Error::InvalidConfig(_))));
    }

    /// Invalid Spinners
    #[test]
    fn test_spinner_rejects() {
        let zero = SpinnerBuilder::new().interval(Duration::ZERO).build();
        assert!(matches!(zero, Err(Error::InvalidConfig(_))));

        assert!(SpinnerBuilder::new().glyphs(Vec::<char>::new()).is_err());

        let suffix = SpinnerBuilder::new().suffix("\r").build();
        assert!(matches!(suffix, Err(Error::InvalidConfig(_))));
    }

    /// Spinner Options
    #[test]
    fn test_spinner_options() {
        let spinner = SpinnerBuilder::new()
            .frames(Frames::dots())
            .interval(Duration::from_millis(40))
            .prefix("Loading ")
            .writer(Vec::new())
            .build()
            .unwrap();

        assert_eq!(spinner.config().frames, Frames::dots());
        assert_eq!(spinner.config().interval, Duration::from_millis(40));
        assert_eq!(spinner.prefix(), "Loading ");
    }
}
