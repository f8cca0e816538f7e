//! In-memory output provider that counts acquisitions and releases.

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::converter::{OutputHint, OutputProvider, ScopedOutput};

#[derive(Debug, Default)]
struct Counters {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
}

/// Mock implementation of [`OutputProvider`].
///
/// Outputs live in memory. Counters are shared with every output handed out,
/// so releases are observed even after the output has been moved away.
///
/// # Example
///
/// ```rust,ignore
/// use phono_core::testing::CountingOutputProvider;
///
/// let outputs = CountingOutputProvider::new();
/// // run a job with &outputs ...
/// assert_eq!(outputs.acquisitions(), outputs.releases());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountingOutputProvider {
    counters: Arc<Counters>,
    fail_acquire: bool,
    fail_release: bool,
}

impl CountingOutputProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose `acquire` always fails.
    pub fn failing() -> Self {
        Self {
            fail_acquire: true,
            ..Self::default()
        }
    }

    /// A provider whose outputs fail to release (still counted).
    pub fn failing_release() -> Self {
        Self {
            fail_release: true,
            ..Self::default()
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.counters.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }
}

impl OutputProvider for CountingOutputProvider {
    fn acquire(&self, hint: &OutputHint) -> io::Result<Box<dyn ScopedOutput>> {
        if self.fail_acquire {
            return Err(io::Error::other("no space left for test output"));
        }
        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryOutput {
            data: Cursor::new(Vec::new()),
            name: format!("memory:{}{}", hint.job_id, hint.extension),
            counters: Arc::clone(&self.counters),
            fail_release: self.fail_release,
        }))
    }
}

struct MemoryOutput {
    data: Cursor<Vec<u8>>,
    name: String,
    counters: Arc<Counters>,
    fail_release: bool,
}

impl Read for MemoryOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryOutput {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

impl ScopedOutput for MemoryOutput {
    fn location(&self) -> String {
        self.name.clone()
    }

    fn release(self: Box<Self>) -> io::Result<()> {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            Err(io::Error::other("simulated release failure"))
        } else {
            Ok(())
        }
    }
}
