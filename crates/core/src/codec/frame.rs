//! Bounded sample buffer shared between pump and sink.

use serde::Serialize;

/// Shape of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamProperties {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Interleaved samples holding at most `capacity` frames.
///
/// A frame is one sample per channel.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    channels: usize,
    capacity: usize,
    samples: Vec<f64>,
}

impl FrameBuffer {
    pub fn new(capacity: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        let capacity = capacity.max(1);
        Self {
            channels,
            capacity,
            samples: Vec::with_capacity(capacity * channels),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Maximum number of frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of complete frames currently held.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity * self.channels
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Room left, in samples.
    pub fn remaining_samples(&self) -> usize {
        self.capacity * self.channels - self.samples.len()
    }

    /// Appends as many interleaved samples as fit and returns how many were taken.
    pub fn push_samples(&mut self, samples: &[f64]) -> usize {
        let taken = samples.len().min(self.remaining_samples());
        self.samples.extend_from_slice(&samples[..taken]);
        taken
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Iterates over complete frames.
    pub fn frames_iter(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.chunks_exact(self.channels)
    }
}
