//! Scoped output storage.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

/// Exclusively owned, seekable output of one job.
///
/// `release` closes the resource and removes it if it is temporary.
pub trait ScopedOutput: Read + Write + Seek + Send {
    /// Human-readable location for logs.
    fn location(&self) -> String;

    fn release(self: Box<Self>) -> io::Result<()>;
}

/// Hands out scoped outputs.
pub trait OutputProvider: Send + Sync {
    fn acquire(&self, hint: &OutputHint) -> io::Result<Box<dyn ScopedOutput>>;
}

/// What the provider knows about the output it is asked for.
#[derive(Debug, Clone)]
pub struct OutputHint {
    pub job_id: Uuid,
    /// Extension of the encoded output, with leading dot.
    pub extension: String,
}

/// Creates named temporary files in a directory.
#[derive(Debug, Clone)]
pub struct TempFileProvider {
    dir: PathBuf,
}

impl TempFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl OutputProvider for TempFileProvider {
    fn acquire(&self, hint: &OutputHint) -> io::Result<Box<dyn ScopedOutput>> {
        let file = tempfile::Builder::new()
            .prefix("phono-")
            .suffix(&hint.extension)
            .tempfile_in(&self.dir)?;
        debug!(job_id = %hint.job_id, path = %file.path().display(), "Created temporary output");
        Ok(Box::new(TempOutput(file)))
    }
}

struct TempOutput(NamedTempFile);

impl Read for TempOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for TempOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Seek for TempOutput {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl ScopedOutput for TempOutput {
    fn location(&self) -> String {
        self.0.path().display().to_string()
    }

    fn release(self: Box<Self>) -> io::Result<()> {
        self.0.close()
    }
}

/// Releases the wrapped output exactly once, on [`release`](Self::release) or drop.
pub(crate) struct OutputGuard {
    output: Option<Box<dyn ScopedOutput>>,
    job_id: Uuid,
}

impl OutputGuard {
    pub(crate) fn new(output: Box<dyn ScopedOutput>, job_id: Uuid) -> Self {
        Self {
            output: Some(output),
            job_id,
        }
    }

    pub(crate) fn output_mut(&mut self) -> io::Result<&mut Box<dyn ScopedOutput>> {
        self.output
            .as_mut()
            .ok_or_else(|| io::Error::other("output already released"))
    }

    pub(crate) fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(output) = self.output.take() {
            let location = output.location();
            match output.release() {
                Ok(()) => debug!(job_id = %self.job_id, location = %location, "Released output"),
                Err(e) => warn!(
                    job_id = %self.job_id,
                    location = %location,
                    error = %e,
                    "Failed to release output"
                ),
            }
        }
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}
