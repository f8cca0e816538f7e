//! Symphonia-backed decoder for every supported input format.

use std::io::{self, Read, Seek, SeekFrom};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder as PacketDecoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::trace;

use super::error::CodecError;
use super::frame::{FrameBuffer, StreamProperties};
use super::traits::{Decoder, InputStream};

/// Adapts a caller-supplied stream to symphonia's source trait.
struct InputSource(Box<dyn InputStream>);

impl Read for InputSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for InputSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl MediaSource for InputSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}

/// Decodes the first audio track of a container into normalised samples.
pub struct SymphoniaDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn PacketDecoder>,
    track_id: u32,
    properties: StreamProperties,
    /// Samples of the last packet not yet handed out.
    pending: Vec<f64>,
    pending_pos: usize,
    finished: bool,
}

impl SymphoniaDecoder {
    /// Probes `input` and prepares a decoder for its default track.
    ///
    /// `extension` is a probing hint such as `wav` or `.flac`.
    pub fn open(input: Box<dyn InputStream>, extension: &str) -> Result<Self, CodecError> {
        let source = MediaSourceStream::new(Box::new(InputSource(input)), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension.trim_start_matches('.'));

        let probed = get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::decode(format!("failed to probe input: {}", e)))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CodecError::decode("no audio track found"))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CodecError::decode("unknown sample rate"))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| CodecError::decode("unknown channel layout"))?;

        let decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::decode(format!("failed to create decoder: {}", e)))?;
        let track_id = track.id;

        Ok(Self {
            reader,
            decoder,
            track_id,
            properties: StreamProperties {
                sample_rate,
                channels,
            },
            pending: Vec::new(),
            pending_pos: 0,
            finished: false,
        })
    }

    /// Decodes the next packet of our track into `pending`.
    ///
    /// Returns `false` once the container is exhausted.
    fn decode_next(&mut self) -> Result<bool, CodecError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(e) => return Err(CodecError::decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = self
                .decoder
                .decode(&packet)
                .map_err(|e| CodecError::decode(e.to_string()))?;

            if decoded.spec().channels.count() != self.properties.channels as usize {
                return Err(CodecError::decode("channel layout changed mid-stream"));
            }

            let mut samples = SampleBuffer::<f64>::new(decoded.capacity() as u64, *decoded.spec());
            samples.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.pending.extend_from_slice(samples.samples());
            self.pending_pos = 0;
            trace!(samples = self.pending.len(), "Decoded packet");
            return Ok(true);
        }
    }
}

impl Decoder for SymphoniaDecoder {
    fn properties(&self) -> StreamProperties {
        self.properties
    }

    fn read(&mut self, buffer: &mut FrameBuffer) -> Result<usize, CodecError> {
        buffer.clear();

        while !buffer.is_full() {
            if self.pending_pos < self.pending.len() {
                let taken = buffer.push_samples(&self.pending[self.pending_pos..]);
                self.pending_pos += taken;
                continue;
            }

            if self.finished || !self.decode_next()? {
                self.finished = true;
                break;
            }
        }

        Ok(buffer.frames())
    }
}
