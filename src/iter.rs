//! Iterator adapters for automatic progress tracking.
//!
//! This module provides the [`ProgressIteratorExt`] trait, which adds helper methods
//! to any [`ExactSizeIterator`]. This allows you to attach a progress bar to a loop
//! with a single method call; the length known up front is the bar's 100%.
//!
//! # Example
//!
//! ```no_run
//! use live_progress::ProgressIteratorExt;
//!
//! for item in vec![1, 2, 3].into_iter().progress() {
//!     // ...
//! #   let _ = item;
//! }
//! ```

use crate::bar::Bar;

/// An iterator adapter that moves a [`Bar`] on every call to `next()`.
///
/// Adapters created by [`ProgressIteratorExt::progress`] own their bar: it is started
/// on creation and stopped once the iterator is exhausted or dropped. Adapters over a
/// caller's bar leave its lifecycle alone.
#[derive(Debug)]
pub struct ProgressIter<I> {
    iter: I,
    bar: Bar,
    total: usize,
    seen: usize,
    owned: bool,
}

impl<I: ExactSizeIterator> ProgressIter<I> {
    /// Wraps `iter`, driving a bar the caller starts and stops.
    pub fn new(iter: I, bar: Bar) -> Self {
        Self {
            total: iter.len(),
            iter,
            bar,
            seen: 0,
            owned: false,
        }
    }

    /// Wraps `iter`, starting `bar` now and stopping it when the adapter is done.
    pub fn owned(iter: I, bar: Bar) -> Self {
        bar.start();
        let mut adapter = Self::new(iter, bar);
        adapter.owned = true;
        adapter
    }
}

impl<I> ProgressIter<I> {
    /// The driven bar.
    pub const fn bar(&self) -> &Bar {
        &self.bar
    }

    /// Items yielded so far.
    pub const fn position(&self) -> usize {
        self.seen
    }

    fn finish(&self) {
        if self.owned {
            self.bar.stop();
        }
    }
}

impl<I: Iterator> Iterator for ProgressIter<I> {
    type Item = I::Item;

    #[allow(clippy::cast_precision_loss)]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next();

        if item.is_some() {
            self.seen += 1;
            if self.total > 0 {
                self.bar.set_progress(self.seen as f64 / self.total as f64);
            }
        } else {
            self.finish();
        }

        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<I: ExactSizeIterator> ExactSizeIterator for ProgressIter<I> {}

impl<I> Drop for ProgressIter<I> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Extension trait to easily attach a progress bar to any sized iterator.
pub trait ProgressIteratorExt: ExactSizeIterator + Sized {
    /// Wraps the iterator in a default [`Bar`] on stdout, started immediately.
    fn progress(self) -> ProgressIter<Self> {
        ProgressIter::owned(self, Bar::new())
    }

    /// Wraps the iterator using an existing [`Bar`], leaving its lifecycle to the caller.
    fn progress_with(self, bar: Bar) -> ProgressIter<Self> {
        ProgressIter::new(self, bar)
    }
}

impl<I: ExactSizeIterator> ProgressIteratorExt for I {}

#[cfg(test)]
mod tests {
    use super::{ProgressIter, ProgressIteratorExt as _};
    use crate::{bar::Bar, sink::SharedBuffer, state::Lifecycle};

    fn bar() -> (Bar, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let bar = Bar::builder()
            .width(5)
            .writer(buffer.clone())
            .build()
            .unwrap();
        (bar, buffer)
    }

    /// Iterator Integration
    /// A caller's bar reaches 100% over the items but stays running.
    #[test]
    fn test_iterator_adapter() {
        let (bar, _buffer) = bar();
        bar.start();
        let data = [1, 2, 3, 4, 5];

        let iter = data.iter().progress_with(bar.clone());
        assert_eq!(iter.len(), 5);
        let sum: i32 = iter.sum();

        assert_eq!(sum, 15);
        assert!((bar.progress() - 1.0).abs() < 1e-9);
        assert_eq!(bar.lifecycle(), Lifecycle::Running);
        bar.stop();
    }

    /// Owned Bars
    /// An owned bar stops on exhaustion, or on drop when abandoned early.
    #[test]
    fn test_owned_bar() {
        let (bar, buffer) = bar();
        let mut iter = ProgressIter::owned(0..4, bar.clone());
        assert_eq!(bar.lifecycle(), Lifecycle::Running);
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.position(), 1);
        assert!(buffer.contents().contains(&format!("\r#{}  25%", " ".repeat(4))));
        drop(iter);
        assert_eq!(bar.lifecycle(), Lifecycle::Stopped);

        let (bar, _buffer) = self::bar();
        let iter = ProgressIter::owned(0..3, bar.clone());
        assert_eq!(iter.count(), 3);
        assert_eq!(bar.lifecycle(), Lifecycle::Stopped);
    }

    /// Empty Iterators
    /// Nothing to count means nothing is drawn.
    #[test]
    fn test_empty() {
        let (bar, buffer) = bar();
        bar.start();
        let before = buffer.len();
        assert_eq!(std::iter::empty::<u8>().progress_with(bar.clone()).count(), 0);
        assert_eq!(buffer.len(), before);
        bar.stop();
    }
}
