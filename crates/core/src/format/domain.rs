//! Parameter domains for encodable formats.

use serde::Serialize;

// Canonical parameter names, shared by the HTTP form, the CLI and the validator.
pub const BIT_DEPTH: &str = "bitDepth";
pub const BIT_RATE_MODE: &str = "bitRateMode";
pub const VBR_QUALITY: &str = "vbrQuality";
pub const BIT_RATE: &str = "bitRate";
pub const CHANNEL_MODE: &str = "channelMode";
pub const USE_QUALITY: &str = "useQuality";
pub const QUALITY: &str = "quality";

/// Closed integer range, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumericRange {
    pub min: i64,
    pub max: i64,
}

impl NumericRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// MP3 channel layout, addressed by its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    Mono,
    Stereo,
    JointStereo,
}

impl ChannelMode {
    pub fn code(&self) -> u8 {
        match self {
            ChannelMode::Mono => 0,
            ChannelMode::Stereo => 1,
            ChannelMode::JointStereo => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ChannelMode::Mono),
            1 => Some(ChannelMode::Stereo),
            2 => Some(ChannelMode::JointStereo),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelMode::Mono => "Mono",
            ChannelMode::Stereo => "Stereo",
            ChannelMode::JointStereo => "Joint stereo",
        }
    }
}

/// MP3 rate control strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RateControl {
    Vbr,
    Cbr,
    Abr,
}

impl RateControl {
    /// Canonical upper-case token.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateControl::Vbr => "VBR",
            RateControl::Cbr => "CBR",
            RateControl::Abr => "ABR",
        }
    }

    /// Parses a mode token, ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "VBR" => Some(RateControl::Vbr),
            "CBR" => Some(RateControl::Cbr),
            "ABR" => Some(RateControl::Abr),
            _ => None,
        }
    }
}

/// Accepted values for a single parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterRule {
    OneOf { values: Vec<String> },
    Range(NumericRange),
    Boolean,
}

/// When a parameter has to be supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    Required,
    Optional,
    /// Required only when `parameter` takes one of `values`.
    RequiredWhen {
        parameter: &'static str,
        values: Vec<String>,
    },
}

/// Description of one accepted parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub rule: ParameterRule,
    pub requirement: Requirement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavDomain {
    pub bit_depths: Vec<u16>,
}

impl Default for WavDomain {
    fn default() -> Self {
        Self {
            bit_depths: vec![8, 16, 24, 32],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mp3Domain {
    pub rate_controls: Vec<RateControl>,
    pub vbr_quality: NumericRange,
    /// Shared by CBR and ABR.
    pub bit_rate: NumericRange,
    pub channel_modes: Vec<ChannelMode>,
    pub quality: NumericRange,
}

impl Default for Mp3Domain {
    fn default() -> Self {
        Self {
            rate_controls: vec![RateControl::Vbr, RateControl::Cbr, RateControl::Abr],
            vbr_quality: NumericRange::new(0, 9),
            bit_rate: NumericRange::new(8, 320),
            channel_modes: vec![
                ChannelMode::Mono,
                ChannelMode::Stereo,
                ChannelMode::JointStereo,
            ],
            quality: NumericRange::new(0, 9),
        }
    }
}

/// Per-format set of accepted encoder parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterDomain {
    Wav(WavDomain),
    Mp3(Mp3Domain),
}

impl ParameterDomain {
    /// Flattened view of the domain, in validation order.
    pub fn parameters(&self) -> Vec<ParameterSpec> {
        match self {
            ParameterDomain::Wav(wav) => vec![ParameterSpec {
                name: BIT_DEPTH,
                rule: ParameterRule::OneOf {
                    values: wav.bit_depths.iter().map(|d| d.to_string()).collect(),
                },
                requirement: Requirement::Required,
            }],
            ParameterDomain::Mp3(mp3) => vec![
                ParameterSpec {
                    name: BIT_RATE_MODE,
                    rule: ParameterRule::OneOf {
                        values: mp3
                            .rate_controls
                            .iter()
                            .map(|m| m.as_str().to_string())
                            .collect(),
                    },
                    requirement: Requirement::Required,
                },
                ParameterSpec {
                    name: VBR_QUALITY,
                    rule: ParameterRule::Range(mp3.vbr_quality),
                    requirement: Requirement::RequiredWhen {
                        parameter: BIT_RATE_MODE,
                        values: vec![RateControl::Vbr.as_str().to_string()],
                    },
                },
                ParameterSpec {
                    name: BIT_RATE,
                    rule: ParameterRule::Range(mp3.bit_rate),
                    requirement: Requirement::RequiredWhen {
                        parameter: BIT_RATE_MODE,
                        values: vec![
                            RateControl::Cbr.as_str().to_string(),
                            RateControl::Abr.as_str().to_string(),
                        ],
                    },
                },
                ParameterSpec {
                    name: CHANNEL_MODE,
                    rule: ParameterRule::OneOf {
                        values: mp3
                            .channel_modes
                            .iter()
                            .map(|m| m.code().to_string())
                            .collect(),
                    },
                    requirement: Requirement::Required,
                },
                ParameterSpec {
                    name: USE_QUALITY,
                    rule: ParameterRule::Boolean,
                    requirement: Requirement::Optional,
                },
                ParameterSpec {
                    name: QUALITY,
                    rule: ParameterRule::Range(mp3.quality),
                    requirement: Requirement::RequiredWhen {
                        parameter: USE_QUALITY,
                        values: vec!["true".to_string()],
                    },
                },
            ],
        }
    }
}
