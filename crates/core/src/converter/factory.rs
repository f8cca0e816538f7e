//! Deferred construction of decoder/encoder pairs.
//!
//! Encoders are built in two phases. A [`ConfiguredEncoder`] only exists for a
//! validated [`EncoderConfig`]; binding it to an output yields a
//! [`BoundEncoder`], which is opened once the decoder has reported the stream
//! properties.

use crate::codec::{
    CodecError, Decoder, Encoder, InputStream, Mp3Encoder, StreamProperties, SymphoniaDecoder,
    WavEncoder, WriteSeek,
};
use crate::format::Format;
use crate::params::EncoderConfig;

/// Encoder settings waiting for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredEncoder {
    config: EncoderConfig,
}

impl ConfiguredEncoder {
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Attaches the acquired output.
    pub fn bind<'a>(self, output: &'a mut dyn WriteSeek) -> BoundEncoder<'a> {
        BoundEncoder {
            config: self.config,
            output,
        }
    }
}

/// Encoder settings plus their output, waiting for stream properties.
pub struct BoundEncoder<'a> {
    config: EncoderConfig,
    output: &'a mut dyn WriteSeek,
}

impl<'a> BoundEncoder<'a> {
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Gives back the output, e.g. for wrapping encoders.
    pub fn into_parts(self) -> (EncoderConfig, &'a mut dyn WriteSeek) {
        (self.config, self.output)
    }

    /// Opens the concrete encoder for the configured format.
    pub fn open(self, properties: StreamProperties) -> Result<Box<dyn Encoder + 'a>, CodecError> {
        let encoder: Box<dyn Encoder + 'a> = match self.config {
            EncoderConfig::Wav(wav) => Box::new(WavEncoder::new(self.output, &wav, properties)?),
            EncoderConfig::Mp3(mp3) => Box::new(Mp3Encoder::new(self.output, &mp3, properties)?),
        };
        Ok(encoder)
    }
}

/// Builds codecs for a job.
///
/// The provided methods give the production codecs; test doubles override them.
pub trait CodecFactory: Send + Sync {
    fn build_decoder(
        &self,
        format: &Format,
        input: Box<dyn InputStream>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        Ok(Box::new(SymphoniaDecoder::open(
            input,
            format.default_extension(),
        )?))
    }

    fn build_encoder(&self, config: EncoderConfig) -> ConfiguredEncoder {
        ConfiguredEncoder { config }
    }

    fn open_encoder<'a>(
        &self,
        encoder: BoundEncoder<'a>,
        properties: StreamProperties,
    ) -> Result<Box<dyn Encoder + 'a>, CodecError> {
        encoder.open(properties)
    }
}

/// Production codecs: symphonia for decoding, hound and LAME for encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamFactory;

impl CodecFactory for StreamFactory {}
