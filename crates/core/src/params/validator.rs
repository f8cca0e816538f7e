//! Validation of raw parameters against a format's domain.

use crate::format::{
    ChannelMode, Format, Mp3Domain, NumericRange, ParameterDomain, RateControl, WavDomain,
    BIT_DEPTH, BIT_RATE, BIT_RATE_MODE, CHANNEL_MODE, QUALITY, USE_QUALITY, VBR_QUALITY,
};

use super::error::ValidationError;
use super::types::{BitRateMode, EncoderConfig, Mp3Config, RawParams, WavConfig};

/// Validates `raw` against the parameter domain of `format`.
///
/// Parameters outside the domain are ignored. MP3 parameters are checked in
/// dependency order: rate mode, the mode's numeric setting, channel mode, then
/// the `useQuality`/`quality` pair.
pub fn validate(format: &Format, raw: &RawParams) -> Result<EncoderConfig, ValidationError> {
    match format.domain() {
        Some(ParameterDomain::Wav(domain)) => validate_wav(domain, raw),
        Some(ParameterDomain::Mp3(domain)) => validate_mp3(domain, raw),
        None => Err(ValidationError::NotEncodable {
            format: format.name().to_string(),
        }),
    }
}

fn validate_wav(domain: &WavDomain, raw: &RawParams) -> Result<EncoderConfig, ValidationError> {
    let bit_depth = required_int(raw, BIT_DEPTH)?;
    let bit_depth = u16::try_from(bit_depth)
        .ok()
        .filter(|depth| domain.bit_depths.contains(depth))
        .ok_or_else(|| ValidationError::unsupported(BIT_DEPTH, bit_depth))?;

    Ok(EncoderConfig::Wav(WavConfig::new(bit_depth)))
}

fn validate_mp3(domain: &Mp3Domain, raw: &RawParams) -> Result<EncoderConfig, ValidationError> {
    let mode_token = raw
        .get(BIT_RATE_MODE)
        .ok_or_else(|| ValidationError::missing(BIT_RATE_MODE))?;
    let mode = RateControl::parse(mode_token)
        .ok_or_else(|| ValidationError::unsupported(BIT_RATE_MODE, mode_token))?;
    if !domain.rate_controls.contains(&mode) {
        return Err(ValidationError::unsupported(BIT_RATE_MODE, mode.as_str()));
    }

    let bit_rate_mode = match mode {
        RateControl::Vbr => BitRateMode::Vbr {
            quality: ranged(raw, VBR_QUALITY, domain.vbr_quality)? as u8,
        },
        RateControl::Cbr => BitRateMode::Cbr {
            kbps: ranged(raw, BIT_RATE, domain.bit_rate)? as u16,
        },
        RateControl::Abr => BitRateMode::Abr {
            kbps: ranged(raw, BIT_RATE, domain.bit_rate)? as u16,
        },
    };

    let code = required_int(raw, CHANNEL_MODE)?;
    let channel_mode = ChannelMode::from_code(code)
        .filter(|mode| domain.channel_modes.contains(mode))
        .ok_or_else(|| ValidationError::unsupported(CHANNEL_MODE, code))?;

    let use_quality = match raw.get(USE_QUALITY) {
        Some(value) => {
            parse_bool(value).ok_or_else(|| ValidationError::malformed(USE_QUALITY, value))?
        }
        None => false,
    };
    let quality = if use_quality {
        Some(ranged(raw, QUALITY, domain.quality)? as u8)
    } else {
        None
    };

    Ok(EncoderConfig::Mp3(Mp3Config::new(
        bit_rate_mode,
        channel_mode,
        quality,
    )))
}

/// Parses a boolean the way HTML forms and command lines spell them.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" => Some(false),
        _ => None,
    }
}

fn required_int(raw: &RawParams, name: &str) -> Result<i64, ValidationError> {
    let value = raw.get(name).ok_or_else(|| ValidationError::missing(name))?;
    value
        .parse::<i64>()
        .map_err(|_| ValidationError::malformed(name, value))
}

fn ranged(raw: &RawParams, name: &str, range: NumericRange) -> Result<i64, ValidationError> {
    let value = required_int(raw, name)?;
    if range.contains(value) {
        Ok(value)
    } else {
        Err(ValidationError::unsupported(name, value))
    }
}
