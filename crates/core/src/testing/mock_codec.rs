//! Scripted codecs for pipeline and job tests.

use std::sync::{Arc, Mutex};

use crate::codec::{CodecError, Decoder, Encoder, FrameBuffer, InputStream, StreamProperties};
use crate::converter::{BoundEncoder, CodecFactory};
use crate::format::Format;

/// Decoder producing a fixed number of synthetic frames.
///
/// Optionally fails on the n-th call to `read`.
#[derive(Debug, Clone)]
pub struct ScriptedDecoder {
    properties: StreamProperties,
    remaining: usize,
    produced: usize,
    reads: usize,
    fail_after: Option<usize>,
}

impl ScriptedDecoder {
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            properties: StreamProperties {
                sample_rate: 44_100,
                channels,
            },
            remaining: frames,
            produced: 0,
            reads: 0,
            fail_after: None,
        }
    }

    /// Fails once `reads` buffers have been handed out.
    pub fn fail_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }
}

impl Decoder for ScriptedDecoder {
    fn properties(&self) -> StreamProperties {
        self.properties
    }

    fn read(&mut self, buffer: &mut FrameBuffer) -> Result<usize, CodecError> {
        if self.fail_after == Some(self.reads) {
            return Err(CodecError::decode("scripted decode failure"));
        }
        self.reads += 1;

        buffer.clear();
        let frames = self.remaining.min(buffer.capacity());
        for _ in 0..frames {
            let value = ((self.produced % 200) as f64 / 100.0) - 1.0;
            let frame = vec![value * 0.5; buffer.channels()];
            buffer.push_samples(&frame);
            self.produced += 1;
        }
        self.remaining -= frames;
        Ok(frames)
    }
}

/// What a [`RecordingEncoder`] saw.
#[derive(Debug, Default)]
pub struct EncoderLog {
    /// Frames per `write` call.
    pub writes: Vec<usize>,
    pub flushed: bool,
}

/// Encoder that records calls and writes nothing.
#[derive(Debug)]
pub struct RecordingEncoder {
    log: Arc<Mutex<EncoderLog>>,
}

impl RecordingEncoder {
    pub fn new() -> (Self, Arc<Mutex<EncoderLog>>) {
        let log = Arc::new(Mutex::new(EncoderLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl Encoder for RecordingEncoder {
    fn write(&mut self, buffer: &FrameBuffer) -> Result<(), CodecError> {
        if let Ok(mut log) = self.log.lock() {
            log.writes.push(buffer.frames());
        }
        Ok(())
    }

    fn flush(self: Box<Self>) -> Result<(), CodecError> {
        if let Ok(mut log) = self.log.lock() {
            log.flushed = true;
        }
        Ok(())
    }
}

/// Wraps a real encoder and fails after a number of writes.
struct FailingEncoder<'a> {
    inner: Box<dyn Encoder + 'a>,
    writes_left: usize,
}

impl Encoder for FailingEncoder<'_> {
    fn write(&mut self, buffer: &FrameBuffer) -> Result<(), CodecError> {
        if self.writes_left == 0 {
            return Err(CodecError::encode("scripted encode failure"));
        }
        self.writes_left -= 1;
        self.inner.write(buffer)
    }

    fn flush(self: Box<Self>) -> Result<(), CodecError> {
        self.inner.flush()
    }
}

/// Codec factory that ignores the input and decodes synthetic frames.
///
/// Encoders are the real ones for the configured format, optionally wrapped
/// to fail mid-stream.
#[derive(Debug, Clone)]
pub struct ScriptedCodecs {
    channels: u16,
    frames: usize,
    fail_decode_after: Option<usize>,
    fail_encode_after: Option<usize>,
}

impl ScriptedCodecs {
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            channels,
            frames,
            fail_decode_after: None,
            fail_encode_after: None,
        }
    }

    pub fn fail_decode_after(mut self, reads: usize) -> Self {
        self.fail_decode_after = Some(reads);
        self
    }

    pub fn fail_encode_after(mut self, writes: usize) -> Self {
        self.fail_encode_after = Some(writes);
        self
    }
}

impl CodecFactory for ScriptedCodecs {
    fn build_decoder(
        &self,
        _format: &Format,
        _input: Box<dyn InputStream>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        let decoder = ScriptedDecoder::new(self.channels, self.frames);
        let decoder = match self.fail_decode_after {
            Some(reads) => decoder.fail_after(reads),
            None => decoder,
        };
        Ok(Box::new(decoder))
    }

    fn open_encoder<'a>(
        &self,
        encoder: BoundEncoder<'a>,
        properties: StreamProperties,
    ) -> Result<Box<dyn Encoder + 'a>, CodecError> {
        let inner = encoder.open(properties)?;
        let encoder: Box<dyn Encoder + 'a> = match self.fail_encode_after {
            Some(writes) => Box::new(FailingEncoder {
                inner,
                writes_left: writes,
            }),
            None => inner,
        };
        Ok(encoder)
    }
}
