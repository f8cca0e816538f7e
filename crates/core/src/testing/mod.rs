//! Testing utilities and mock implementations.
//!
//! This module provides test doubles for the codec and storage seams, so
//! jobs can be driven without real audio or disk access.
//!
//! # Example
//!
//! ```rust,ignore
//! use phono_core::testing::{fixtures, CountingOutputProvider, ScriptedCodecs};
//!
//! let outputs = CountingOutputProvider::new();
//! let codecs = ScriptedCodecs::new(2, 10_000).fail_decode_after(3);
//!
//! // Build a ConversionService with these, run a job...
//! assert_eq!(outputs.acquisitions(), outputs.releases());
//! ```

mod mock_codec;
mod mock_output;

pub use mock_codec::{EncoderLog, RecordingEncoder, ScriptedCodecs, ScriptedDecoder};
pub use mock_output::CountingOutputProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;
    use std::path::Path;

    use hound::{SampleFormat, WavSpec, WavWriter};

    /// Interleaved 16-bit samples of a 440 Hz tone at half amplitude.
    pub fn sine_samples(sample_rate: u32, channels: u16, frames: usize) -> Vec<i16> {
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for n in 0..frames {
            let t = n as f64 / sample_rate as f64;
            let value = (t * 440.0 * std::f64::consts::TAU).sin() * 0.5;
            let sample = (value * i16::MAX as f64) as i16;
            for _ in 0..channels {
                samples.push(sample);
            }
        }
        samples
    }

    fn spec(sample_rate: u32, channels: u16, bits: u16) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: SampleFormat::Int,
        }
    }

    /// Encodes 16-bit samples as a WAV file of the given bit depth.
    pub fn wav_bytes(sample_rate: u32, channels: u16, bits: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec(sample_rate, channels, bits))
                .expect("wav header");
            for &sample in samples {
                match bits {
                    8 => writer.write_sample((sample >> 8) as i8),
                    16 => writer.write_sample(sample),
                    _ => writer.write_sample((sample as i32) << (bits - 16)),
                }
                .expect("wav sample");
            }
            writer.finalize().expect("wav finalize");
        }
        cursor.into_inner()
    }

    /// Writes a short 16-bit stereo tone to `path`.
    pub fn write_wav_file(path: &Path, frames: usize) {
        let samples = sine_samples(44_100, 2, frames);
        std::fs::write(path, wav_bytes(44_100, 2, 16, &samples)).expect("write wav fixture");
    }
}
