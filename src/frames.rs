//! Frame sources: the pure part of rendering.
//!
//! * [`Frames`]: an ordered, non-empty glyph sequence cycled by spinners.
//! * [`Track`]: a filled/empty glyph pair that draws a bar of a given width.
//!
//! Nothing here holds state or touches the terminal.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// Classic rotating bar.
pub const LINES: &[char] = &['|', '/', '-', '\\'];
/// Braille dot ring.
pub const DOTS: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];
/// Bouncing dot.
pub const BOUNCE: &[char] = &['.', 'o', 'O', 'o'];
/// Rotating arrow.
pub const ARROWS: &[char] = &['↖', '↗', '↘', '↙'];
/// Braille trail.
pub const BRAILLE: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// A non-empty sequence of spinner glyphs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frames {
    glyphs: Cow<'static, [char]>,
}

impl Frames {
    /// Builds a sequence from arbitrary glyphs.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `glyphs` is empty or contains control characters,
    /// which would break in-place redraws.
    pub fn new(glyphs: impl Into<Cow<'static, [char]>>) -> Result<Self> {
        let glyphs = glyphs.into();
        if glyphs.is_empty() {
            return Err(Error::InvalidConfig("frame sequence is empty"));
        }
        if glyphs.iter().any(|c| c.is_control()) {
            return Err(Error::InvalidConfig("frame glyphs must be printable"));
        }
        Ok(Self { glyphs })
    }

    /// [`LINES`]
    #[must_use]
    pub const fn lines() -> Self {
        Self::preset(LINES)
    }

    /// [`DOTS`]
    #[must_use]
    pub const fn dots() -> Self {
        Self::preset(DOTS)
    }

    /// [`BOUNCE`]
    #[must_use]
    pub const fn bounce() -> Self {
        Self::preset(BOUNCE)
    }

    /// [`ARROWS`]
    #[must_use]
    pub const fn arrows() -> Self {
        Self::preset(ARROWS)
    }

    /// [`BRAILLE`]
    #[must_use]
    pub const fn braille() -> Self {
        Self::preset(BRAILLE)
    }

    const fn preset(glyphs: &'static [char]) -> Self {
        Self {
            glyphs: Cow::Borrowed(glyphs),
        }
    }

    /// The glyph shown for a frame counter, wrapping around the sequence.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn glyph(&self, counter: u64) -> char {
        let len = self.glyphs.len() as u64;
        self.glyphs[(counter % len) as usize]
    }

    /// Number of glyphs in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl Default for Frames {
    fn default() -> Self {
        Self::lines()
    }
}

/// The visual track of a bar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Track {
    /// Glyph for the completed portion.
    pub filled: char,
    /// Glyph for the remaining portion.
    pub empty: char,
}

impl Track {
    /// Draws `width` cells for a completion fraction, clamped to `[0, 1]`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn render(&self, width: usize, progress: f64) -> String {
        let progress = crate::state::clamp_progress(progress);
        let filled = ((width as f64 * progress) as usize).min(width);

        let mut out = String::with_capacity(width * 4);
        out.extend(std::iter::repeat_n(self.filled, filled));
        out.extend(std::iter::repeat_n(self.empty, width - filled));
        out
    }
}

impl Default for Track {
    fn default() -> Self {
        Self {
            filled: '#',
            empty: ' ',
        }
    }
}
