//! Decoder and encoder seam.
//!
//! Decoders (pumps) fill a [`FrameBuffer`] with interleaved samples normalised
//! to `[-1.0, 1.0]`; encoders (sinks) consume it. Concrete adapters:
//!
//! - [`SymphoniaDecoder`] reads WAV, MP3 and FLAC.
//! - [`WavEncoder`] writes PCM WAV through `hound`.
//! - [`Mp3Encoder`] writes MP3 through LAME.

mod decoder;
mod error;
mod frame;
mod mp3;
mod traits;
mod wav;

pub use decoder::SymphoniaDecoder;
pub use error::CodecError;
pub use frame::{FrameBuffer, StreamProperties};
pub use mp3::Mp3Encoder;
pub use traits::{Decoder, Encoder, InputStream, WriteSeek};
pub use wav::WavEncoder;
