//! Output destinations for rendered frames.
//!
//! A [`Sink`] is a cloneable handle to one locked writer. Every frame is written and
//! flushed while the lock is held, so indicators sharing a sink (for example all the
//! entries of a [`Registry`](crate::Registry)) never interleave partial lines.

use std::{
    fmt,
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// A shared, lock-protected writer that receives rendered lines.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Sink {
    /// Wraps any writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// The process's standard output stream.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// The process's standard error stream.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Writes `text` and flushes, holding the lock for both.
    pub(crate) fn emit(&self, text: &str) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }

    /// Writes `text`, logging instead of propagating a failure.
    pub(crate) fn emit_lossy(&self, text: &str) {
        if let Err(err) = self.emit(text) {
            tracing::debug!(error = %err, "dropping output after write failure");
        }
    }

    /// Returns `true` if both handles point at the same writer.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}

impl From<SharedBuffer> for Sink {
    fn from(buffer: SharedBuffer) -> Self {
        Self::new(buffer)
    }
}

/// An in-memory writer whose contents stay readable through any clone.
///
/// Useful for capturing indicator output in tests or when the terminal is not the
/// final destination.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{io, thread};

    use super::{SharedBuffer, Sink};

    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Whole Writes
    /// Concurrent emitters must never split each other's lines.
    #[test]
    fn test_emits_are_not_interleaved() {
        let buffer = SharedBuffer::new();
        let sink = Sink::from(buffer.clone());

        let handles: Vec<_> = ["aaaa", "bbbb", "cccc"]
            .into_iter()
            .map(|word| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        sink.emit(&format!("{word}\n")).unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let out = buffer.contents();
        assert_eq!(out.lines().count(), 600);
        assert!(out.lines().all(|l| ["aaaa", "bbbb", "cccc"].contains(&l)));
    }

    /// Write Failures
    /// A failing writer surfaces through `emit` and is swallowed by `emit_lossy`.
    #[test]
    fn test_write_failure() {
        let sink = Sink::new(Broken);
        assert!(sink.emit("x").is_err());
        sink.emit_lossy("x");
    }
}
