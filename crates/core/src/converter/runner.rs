//! Bounded-buffer streaming from a decoder into an encoder.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use super::error::ConvertError;
use crate::codec::{Decoder, Encoder, FrameBuffer};

/// Lifecycle of a [`PipelineRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub frames: u64,
    pub buffers: u64,
}

/// Pumps frames one buffer at a time; buffer N is encoded before N+1 is decoded.
///
/// A runner is single-use.
#[derive(Debug)]
pub struct PipelineRunner {
    buffer_size: usize,
    state: PipelineState,
    cancel: Option<Arc<AtomicBool>>,
}

impl PipelineRunner {
    /// `buffer_size` is in frames; zero is bumped to one.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            state: PipelineState::Idle,
            cancel: None,
        }
    }

    /// Stops the run before the next buffer once `flag` is set.
    pub fn with_cancellation(mut self, flag: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = flag;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Streams until the decoder reports end of stream, then flushes the encoder.
    pub fn run(
        &mut self,
        decoder: &mut dyn Decoder,
        encoder: Box<dyn Encoder + '_>,
    ) -> Result<PipelineReport, ConvertError> {
        if self.state != PipelineState::Idle {
            return Err(ConvertError::InvalidState {
                state: self.state.to_string(),
            });
        }

        self.state = PipelineState::Running;
        match self.pump(decoder, encoder) {
            Ok(report) => {
                self.state = PipelineState::Completed;
                Ok(report)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn pump(
        &self,
        decoder: &mut dyn Decoder,
        mut encoder: Box<dyn Encoder + '_>,
    ) -> Result<PipelineReport, ConvertError> {
        let properties = decoder.properties();
        let mut buffer = FrameBuffer::new(self.buffer_size, properties.channels as usize);
        let mut report = PipelineReport::default();

        loop {
            if self.is_cancelled() {
                debug!(buffers = report.buffers, "Pipeline cancelled");
                return Err(ConvertError::Interrupted {
                    reason: "cancelled".to_string(),
                });
            }
            let frames = decoder.read(&mut buffer)?;
            if frames == 0 {
                break;
            }
            encoder.write(&buffer)?;
            report.frames += frames as u64;
            report.buffers += 1;
            trace!(buffer = report.buffers, frames, "Pumped buffer");
        }

        encoder.flush()?;
        Ok(report)
    }
}
