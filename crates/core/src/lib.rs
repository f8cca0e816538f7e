pub mod codec;
pub mod config;
pub mod converter;
pub mod format;
pub mod metrics;
pub mod params;
pub mod testing;

pub use codec::{CodecError, Decoder, Encoder, FrameBuffer, StreamProperties};
pub use config::{
    config_path, load_config, load_config_from_str, load_config_or_default, validate_config,
    Config, ConfigError, LimitsConfig, SanitizedConfig, ServerConfig,
};
pub use converter::{
    ConversionRequest, ConversionService, ConvertError, ConvertedOutput, ConverterConfig,
    ErrorClass, Outcome,
};
pub use format::{Format, FormatError, FormatKind, FormatRegistry};
pub use params::{EncoderConfig, RawParams, ValidationError};
