//! MP3 encoder backed by LAME.

use mp3lame_encoder::{
    ffi, max_required_buffer_size, Bitrate, Builder, DualPcm, FlushNoGap, Mode, MonoPcm,
    Quality, VbrMode,
};

use super::error::CodecError;
use super::frame::{FrameBuffer, StreamProperties};
use super::traits::{Encoder, WriteSeek};
use crate::format::ChannelMode;
use crate::params::{BitRateMode, Mp3Config};

/// Encodes up to two channels; further channels are dropped.
pub struct Mp3Encoder<'a> {
    encoder: mp3lame_encoder::Encoder,
    output: &'a mut dyn WriteSeek,
    input_channels: usize,
    left: Vec<i16>,
    right: Vec<i16>,
    encoded: Vec<u8>,
}

impl<'a> Mp3Encoder<'a> {
    pub fn new(
        output: &'a mut dyn WriteSeek,
        config: &Mp3Config,
        properties: StreamProperties,
    ) -> Result<Self, CodecError> {
        let mut builder =
            Builder::new().ok_or_else(|| CodecError::encode("failed to allocate LAME encoder"))?;

        let stereo = properties.channels >= 2;
        let num_channels = if stereo { 2 } else { 1 };
        builder
            .set_num_channels(num_channels)
            .map_err(|e| config_error("channels", e))?;
        builder
            .set_sample_rate(properties.sample_rate)
            .map_err(|e| config_error("sample rate", e))?;

        let mode = match (stereo, config.channel_mode()) {
            (false, _) | (_, ChannelMode::Mono) => Mode::Mono,
            (true, ChannelMode::Stereo) => Mode::Stereo,
            (true, ChannelMode::JointStereo) => Mode::JointStereo,
        };
        builder.set_mode(mode).map_err(|e| config_error("mode", e))?;

        match config.bit_rate_mode() {
            BitRateMode::Vbr { quality } => {
                builder
                    .set_vbr_mode(VbrMode::Mtrh)
                    .map_err(|e| config_error("vbr mode", e))?;
                builder
                    .set_vbr_quality(lame_quality(quality))
                    .map_err(|e| config_error("vbr quality", e))?;
            }
            BitRateMode::Cbr { kbps } => {
                builder
                    .set_vbr_mode(VbrMode::Off)
                    .map_err(|e| config_error("vbr mode", e))?;
                builder
                    .set_brate(lame_bitrate(kbps))
                    .map_err(|e| config_error("bit rate", e))?;
            }
            BitRateMode::Abr { kbps } => {
                builder
                    .set_vbr_mode(VbrMode::Abr)
                    .map_err(|e| config_error("vbr mode", e))?;
                set_mean_bitrate(&mut builder, kbps)?;
            }
        }

        if let Some(quality) = config.quality() {
            builder
                .set_quality(lame_quality(quality))
                .map_err(|e| config_error("quality", e))?;
        }

        let encoder = builder
            .build()
            .map_err(|e| CodecError::encode(format!("failed to initialise LAME: {:?}", e)))?;

        Ok(Self {
            encoder,
            output,
            input_channels: properties.channels as usize,
            left: Vec::new(),
            right: Vec::new(),
            encoded: Vec::new(),
        })
    }

    fn write_encoded(&mut self) -> Result<(), CodecError> {
        self.output
            .write_all(&self.encoded)
            .map_err(|e| CodecError::encode(e.to_string()))
    }
}

/// ABR targets the mean bit rate; the builder only exposes the CBR rate.
fn set_mean_bitrate(builder: &mut Builder, kbps: u16) -> Result<(), CodecError> {
    // SAFETY: the pointer belongs to `builder`, which outlives the call and is not closed here.
    let rc = unsafe { ffi::lame_set_VBR_mean_bitrate_kbps(builder.as_ptr(), i32::from(kbps)) };
    if rc == 0 {
        Ok(())
    } else {
        Err(config_error("mean bit rate", rc))
    }
}

/// LAME needs room for a final frame on flush.
const FLUSH_BUFFER_SIZE: usize = 7200;

fn config_error(setting: &str, err: impl std::fmt::Debug) -> CodecError {
    CodecError::encode(format!("invalid LAME {}: {:?}", setting, err))
}

/// Maps 0 (best) ..= 9 (worst) onto LAME's quality scale.
fn lame_quality(value: u8) -> Quality {
    match value {
        0 => Quality::Best,
        1 => Quality::SecondBest,
        2 => Quality::NearBest,
        3 => Quality::VeryNice,
        4 => Quality::Nice,
        5 => Quality::Good,
        6 => Quality::Decent,
        7 => Quality::Ok,
        8 => Quality::SecondWorst,
        _ => Quality::Worst,
    }
}

/// Snaps a bit rate down to the nearest standard MPEG step.
fn lame_bitrate(kbps: u16) -> Bitrate {
    match kbps {
        0..=15 => Bitrate::Kbps8,
        16..=23 => Bitrate::Kbps16,
        24..=31 => Bitrate::Kbps24,
        32..=39 => Bitrate::Kbps32,
        40..=47 => Bitrate::Kbps40,
        48..=63 => Bitrate::Kbps48,
        64..=79 => Bitrate::Kbps64,
        80..=95 => Bitrate::Kbps80,
        96..=111 => Bitrate::Kbps96,
        112..=127 => Bitrate::Kbps112,
        128..=159 => Bitrate::Kbps128,
        160..=191 => Bitrate::Kbps160,
        192..=223 => Bitrate::Kbps192,
        224..=255 => Bitrate::Kbps224,
        256..=319 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

fn to_pcm16(sample: f64) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

impl Encoder for Mp3Encoder<'_> {
    fn write(&mut self, buffer: &FrameBuffer) -> Result<(), CodecError> {
        self.left.clear();
        self.right.clear();
        for frame in buffer.frames_iter() {
            self.left.push(to_pcm16(frame[0]));
            if self.input_channels >= 2 {
                self.right.push(to_pcm16(frame[1]));
            }
        }

        self.encoded.clear();
        self.encoded
            .reserve(max_required_buffer_size(self.left.len()));
        let result = if self.input_channels >= 2 {
            self.encoder.encode_to_vec(
                DualPcm {
                    left: &self.left,
                    right: &self.right,
                },
                &mut self.encoded,
            )
        } else {
            self.encoder
                .encode_to_vec(MonoPcm(&self.left), &mut self.encoded)
        };
        result.map_err(|e| CodecError::encode(format!("{:?}", e)))?;

        self.write_encoded()
    }

    fn flush(mut self: Box<Self>) -> Result<(), CodecError> {
        self.encoded.clear();
        self.encoded.reserve(FLUSH_BUFFER_SIZE);
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut self.encoded)
            .map_err(|e| CodecError::encode(format!("{:?}", e)))?;
        self.write_encoded()?;
        self.output
            .flush()
            .map_err(|e| CodecError::encode(e.to_string()))
    }
}
