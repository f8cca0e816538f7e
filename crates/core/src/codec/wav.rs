//! PCM WAV encoder.

use hound::{SampleFormat, WavSpec, WavWriter};

use super::error::CodecError;
use super::frame::{FrameBuffer, StreamProperties};
use super::traits::{Encoder, WriteSeek};
use crate::params::WavConfig;

/// Writes integer PCM at the configured bit depth.
pub struct WavEncoder<'a> {
    writer: WavWriter<&'a mut dyn WriteSeek>,
    bits: u16,
}

impl<'a> WavEncoder<'a> {
    pub fn new(
        output: &'a mut dyn WriteSeek,
        config: &WavConfig,
        properties: StreamProperties,
    ) -> Result<Self, CodecError> {
        let spec = WavSpec {
            channels: properties.channels,
            sample_rate: properties.sample_rate,
            bits_per_sample: config.bit_depth(),
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::new(output, spec).map_err(|e| CodecError::encode(e.to_string()))?;

        Ok(Self {
            writer,
            bits: config.bit_depth(),
        })
    }
}

/// Scales a normalised sample to a signed integer of `bits` bits.
fn quantize(sample: f64, bits: u16) -> i32 {
    let scale = (1i64 << (bits - 1)) as f64;
    let value = (sample * scale).round();
    value.clamp(-scale, scale - 1.0) as i32
}

impl Encoder for WavEncoder<'_> {
    fn write(&mut self, buffer: &FrameBuffer) -> Result<(), CodecError> {
        for &sample in buffer.samples() {
            let value = quantize(sample, self.bits);
            let result = match self.bits {
                8 => self.writer.write_sample(value as i8),
                16 => self.writer.write_sample(value as i16),
                _ => self.writer.write_sample(value),
            };
            result.map_err(|e| CodecError::encode(e.to_string()))?;
        }
        Ok(())
    }

    fn flush(self: Box<Self>) -> Result<(), CodecError> {
        self.writer
            .finalize()
            .map_err(|e| CodecError::encode(e.to_string()))
    }
}
