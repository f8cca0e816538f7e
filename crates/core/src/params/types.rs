//! Raw and validated encoder parameter types.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::format::{
    ChannelMode, FormatKind, RateControl, BIT_DEPTH, BIT_RATE, BIT_RATE_MODE, CHANNEL_MODE,
    QUALITY, USE_QUALITY, VBR_QUALITY,
};

/// Untyped parameter map as received from a form or the command line.
///
/// Empty values are treated the same as missing keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(BTreeMap<String, String>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value for `name`, or `None` when absent or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for RawParams {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Validated WAV settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WavConfig {
    bit_depth: u16,
}

impl WavConfig {
    pub(crate) fn new(bit_depth: u16) -> Self {
        Self { bit_depth }
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }
}

/// MP3 rate control with its mode-specific setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "UPPERCASE")]
pub enum BitRateMode {
    /// Variable bit rate, quality 0 (best) to 9.
    Vbr { quality: u8 },
    /// Constant bit rate in kbit/s.
    Cbr { kbps: u16 },
    /// Average bit rate in kbit/s.
    Abr { kbps: u16 },
}

impl BitRateMode {
    pub fn rate_control(&self) -> RateControl {
        match self {
            BitRateMode::Vbr { .. } => RateControl::Vbr,
            BitRateMode::Cbr { .. } => RateControl::Cbr,
            BitRateMode::Abr { .. } => RateControl::Abr,
        }
    }
}

/// Validated MP3 settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mp3Config {
    bit_rate_mode: BitRateMode,
    channel_mode: ChannelMode,
    quality: Option<u8>,
}

impl Mp3Config {
    pub(crate) fn new(
        bit_rate_mode: BitRateMode,
        channel_mode: ChannelMode,
        quality: Option<u8>,
    ) -> Self {
        Self {
            bit_rate_mode,
            channel_mode,
            quality,
        }
    }

    pub fn bit_rate_mode(&self) -> BitRateMode {
        self.bit_rate_mode
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    /// Algorithm quality, set only when the quality gate was enabled.
    pub fn quality(&self) -> Option<u8> {
        self.quality
    }
}

/// Encoder settings that passed validation for one output format.
///
/// Only obtainable from [`validate`](super::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncoderConfig {
    Wav(WavConfig),
    Mp3(Mp3Config),
}

impl EncoderConfig {
    pub fn kind(&self) -> FormatKind {
        match self {
            EncoderConfig::Wav(_) => FormatKind::Wav,
            EncoderConfig::Mp3(_) => FormatKind::Mp3,
        }
    }

    /// Renders the configuration back into canonical raw parameters.
    ///
    /// Validating the result yields an equal configuration.
    pub fn to_raw_params(&self) -> RawParams {
        let mut raw = RawParams::new();
        match self {
            EncoderConfig::Wav(wav) => {
                raw.insert(BIT_DEPTH, wav.bit_depth.to_string());
            }
            EncoderConfig::Mp3(mp3) => {
                raw.insert(BIT_RATE_MODE, mp3.bit_rate_mode.rate_control().as_str());
                match mp3.bit_rate_mode {
                    BitRateMode::Vbr { quality } => raw.insert(VBR_QUALITY, quality.to_string()),
                    BitRateMode::Cbr { kbps } | BitRateMode::Abr { kbps } => {
                        raw.insert(BIT_RATE, kbps.to_string())
                    }
                }
                raw.insert(CHANNEL_MODE, mp3.channel_mode.code().to_string());
                raw.insert(USE_QUALITY, mp3.quality.is_some().to_string());
                if let Some(quality) = mp3.quality {
                    raw.insert(QUALITY, quality.to_string());
                }
            }
        }
        raw
    }
}
