//! I/O wrappers that drive a [`Bar`] from data transfer.
//!
//! [`ProgressReader`] and [`ProgressWriter`] wrap any [`std::io::Read`] or
//! [`std::io::Write`] with a known total byte count. Every successful call moves the
//! bar to `transferred / total`, which is useful for:
//!
//! * File downloads/uploads.
//! * Hashing large files.
//! * Compressing/Decompressing data streams.
//!
//! The bar must be started by the caller; updates to an idle bar are dropped.

use std::io::{self, Read, Write};

use crate::bar::Bar;

/// Byte counter shared by both wrappers.
#[derive(Debug)]
struct Transfer {
    bar: Bar,
    total: u64,
    done: u64,
}

impl Transfer {
    const fn new(bar: Bar, total: u64) -> Self {
        Self { bar, total, done: 0 }
    }

    #[allow(clippy::cast_precision_loss)]
    fn advance(&mut self, n: usize) {
        if n == 0 || self.total == 0 {
            return;
        }
        self.done = self.done.saturating_add(n as u64);
        self.bar.set_progress(self.done as f64 / self.total as f64);
    }
}

/// A wrapper around [`Read`] that moves a [`Bar`] as bytes are read.
#[derive(Debug)]
pub struct ProgressReader<R> {
    inner: R,
    transfer: Transfer,
}

impl<R> ProgressReader<R> {
    /// Wraps `inner`, expecting `total` bytes in all.
    ///
    /// A `total` of zero never moves the bar.
    pub const fn new(inner: R, bar: Bar, total: u64) -> Self {
        Self {
            inner,
            transfer: Transfer::new(bar, total),
        }
    }

    /// Bytes read so far.
    pub const fn transferred(&self) -> u64 {
        self.transfer.done
    }

    /// The driven bar.
    pub const fn bar(&self) -> &Bar {
        &self.transfer.bar
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.transfer.advance(n);
        Ok(n)
    }
}

/// A wrapper around [`Write`] that moves a [`Bar`] as bytes are written.
#[derive(Debug)]
pub struct ProgressWriter<W> {
    inner: W,
    transfer: Transfer,
}

impl<W> ProgressWriter<W> {
    /// Wraps `inner`, expecting `total` bytes in all.
    ///
    /// A `total` of zero never moves the bar.
    pub const fn new(inner: W, bar: Bar, total: u64) -> Self {
        Self {
            inner,
            transfer: Transfer::new(bar, total),
        }
    }

    /// Bytes written so far.
    pub const fn transferred(&self) -> u64 {
        self.transfer.done
    }

    /// The driven bar.
    pub const fn bar(&self) -> &Bar {
        &self.transfer.bar
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.transfer.advance(n);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read as _, Write as _};

    use super::{ProgressReader, ProgressWriter};
    use crate::{bar::Bar, sink::SharedBuffer};

    fn bar() -> (Bar, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let bar = Bar::builder()
            .width(10)
            .writer(buffer.clone())
            .build()
            .unwrap();
        (bar, buffer)
    }

    /// Reader Tracking
    /// Bytes read move the bar proportionally and draw it.
    #[test]
    fn test_io_reader() {
        let (bar, buffer) = bar();
        bar.start();
        let data = vec![0u8; 100];
        let mut reader = ProgressReader::new(Cursor::new(&data), bar.clone(), 100);

        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(reader.transferred(), 10);
        assert!((bar.progress() - 0.1).abs() < 1e-9);
        let line = format!("\r#{}  10%", " ".repeat(9));
        assert!(buffer.contents().contains(&line));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert!((bar.progress() - 1.0).abs() < 1e-9);
        bar.stop();
    }

    /// Writer Tracking
    /// Bytes written are counted; an unknown total leaves the bar alone.
    #[test]
    fn test_io_writer() {
        let (bar, _buffer) = bar();
        bar.start();
        let mut writer = ProgressWriter::new(Vec::new(), bar.clone(), 50);
        writer.write_all(&[1, 2, 3, 4, 5]).unwrap();
        assert!((bar.progress() - 0.1).abs() < 1e-9);
        assert_eq!(writer.into_inner(), [1, 2, 3, 4, 5]);

        let mut unknown = ProgressWriter::new(Vec::new(), bar.clone(), 0);
        unknown.write_all(&[0; 8]).unwrap();
        assert_eq!(unknown.transferred(), 0);
        assert!((bar.progress() - 0.1).abs() < 1e-9);
        bar.stop();
    }
}
