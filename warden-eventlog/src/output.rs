//! Swappable process log destination.
//!
//! The tracing subscriber writes through a [`LogOutput`]. The destination
//! behind it starts as stderr and can be replaced for a scope with
//! [`LogOutput::install`]; dropping the returned [`OutputGuard`] puts the
//! previous destination back, including on early return or panic.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;

type Destination = Box<dyn Write + Send>;

/// Cloneable handle to the current log destination.
#[derive(Clone)]
pub struct LogOutput {
    inner: Arc<Mutex<Destination>>,
}

impl LogOutput {
    pub fn new(destination: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(destination))),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Route output to `destination` until the guard is dropped.
    ///
    /// Guards nest: each one restores exactly what it replaced, so drop them
    /// in reverse order of installation.
    pub fn install(&self, destination: impl Write + Send + 'static) -> OutputGuard {
        let previous = std::mem::replace(&mut *self.lock(), Box::new(destination));
        OutputGuard {
            inner: Arc::clone(&self.inner),
            previous: Some(previous),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Destination> {
        lock(&self.inner)
    }
}

impl Default for LogOutput {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogOutput").finish_non_exhaustive()
    }
}

impl Write for LogOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogOutput {
    type Writer = LogOutput;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Restores the destination replaced by [`LogOutput::install`] on drop.
#[must_use = "dropping the guard immediately restores the previous log destination"]
pub struct OutputGuard {
    inner: Arc<Mutex<Destination>>,
    previous: Option<Destination>,
}

impl fmt::Debug for OutputGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputGuard").finish_non_exhaustive()
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut slot = lock(&self.inner);
            let _ = slot.flush();
            *slot = previous;
        }
    }
}

fn lock(inner: &Mutex<Destination>) -> MutexGuard<'_, Destination> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn guard_restores_previous_destination() {
        let base = Buffer::default();
        let scoped = Buffer::default();
        let mut output = LogOutput::new(base.clone());

        {
            let _guard = output.install(scoped.clone());
            output.write_all(b"inside").unwrap();
        }
        output.write_all(b"outside").unwrap();

        assert_eq!(scoped.text(), "inside");
        assert_eq!(base.text(), "outside");
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let base = Buffer::default();
        let first = Buffer::default();
        let second = Buffer::default();
        let mut output = LogOutput::new(base.clone());

        let outer = output.install(first.clone());
        let inner = output.install(second.clone());
        output.write_all(b"2").unwrap();
        drop(inner);
        output.write_all(b"1").unwrap();
        drop(outer);
        output.write_all(b"0").unwrap();

        assert_eq!(second.text(), "2");
        assert_eq!(first.text(), "1");
        assert_eq!(base.text(), "0");
    }

    #[test]
    fn guard_restores_on_panic() {
        let base = Buffer::default();
        let output = LogOutput::new(base.clone());

        let scoped_output = output.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = scoped_output.install(Buffer::default());
            panic!("controller blew up");
        }));
        assert!(result.is_err());

        let mut output = output;
        output.write_all(b"after panic").unwrap();
        assert_eq!(base.text(), "after panic");
    }
}
