//! Trait definitions for the codec seam.

use std::io::{Read, Seek, Write};

use super::error::CodecError;
use super::frame::{FrameBuffer, StreamProperties};

/// Seekable input a decoder can own and move across threads.
pub trait InputStream: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> InputStream for T {}

/// Output an encoder writes to. WAV headers are patched after the data, so
/// sinks need to seek.
pub trait WriteSeek: Write + Seek {}

impl<T: Write + Seek> WriteSeek for T {}

/// Produces decoded frames from an input stream.
pub trait Decoder: Send {
    /// Sample rate and channel count of the decoded stream.
    fn properties(&self) -> StreamProperties;

    /// Clears `buffer`, fills it with up to `buffer.capacity()` frames and
    /// returns the number written. `0` means end of stream.
    fn read(&mut self, buffer: &mut FrameBuffer) -> Result<usize, CodecError>;
}

/// Consumes decoded frames and writes an encoded stream.
pub trait Encoder {
    /// Encodes every frame in `buffer`.
    fn write(&mut self, buffer: &FrameBuffer) -> Result<(), CodecError>;

    /// Drains internal state and finishes the container.
    fn flush(self: Box<Self>) -> Result<(), CodecError>;
}
