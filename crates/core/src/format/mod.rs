//! Supported audio formats and their parameter domains.
//!
//! The [`FormatRegistry`] is built once at startup and shared behind an `Arc`.
//! Every format carries its canonical name, the file extensions it is
//! recognised by, the content type used when serving it, and (for encodable
//! formats) the [`ParameterDomain`] that encoder parameters are validated
//! against.

mod domain;
mod error;
mod registry;

pub use domain::{
    ChannelMode, Mp3Domain, NumericRange, ParameterDomain, ParameterRule, ParameterSpec,
    RateControl, Requirement, WavDomain, BIT_DEPTH, BIT_RATE, BIT_RATE_MODE, CHANNEL_MODE,
    QUALITY, USE_QUALITY, VBR_QUALITY,
};
pub use error::FormatError;
pub use registry::FormatRegistry;

use serde::Serialize;

/// Closed set of formats the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Wav,
    Mp3,
    Flac,
}

impl FormatKind {
    /// Canonical lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Wav => "wav",
            FormatKind::Mp3 => "mp3",
            FormatKind::Flac => "flac",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A registered audio format.
#[derive(Debug, Clone)]
pub struct Format {
    kind: FormatKind,
    extensions: Vec<&'static str>,
    content_type: &'static str,
    domain: Option<ParameterDomain>,
}

impl Format {
    /// Creates a format. The first extension is the default one.
    ///
    /// Extensions are stored lower-case with their leading dot.
    pub fn new(
        kind: FormatKind,
        extensions: Vec<&'static str>,
        content_type: &'static str,
        domain: Option<ParameterDomain>,
    ) -> Self {
        Self {
            kind,
            extensions,
            content_type,
            domain,
        }
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    /// Extension used when naming converted output, e.g. `.mp3`.
    pub fn default_extension(&self) -> &'static str {
        self.extensions.first().copied().unwrap_or("")
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Parameter domain, present only for formats that can be encoded.
    pub fn domain(&self) -> Option<&ParameterDomain> {
        self.domain.as_ref()
    }

    pub fn is_encodable(&self) -> bool {
        self.domain.is_some()
    }

    /// Whether `extension` (with or without leading dot, any case) belongs to this format.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let wanted = normalize_extension(extension);
        self.extensions.iter().any(|ext| *ext == wanted)
    }
}

/// Lower-cases an extension and makes sure it starts with a dot.
pub(crate) fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_ascii_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extension_is_first() {
        let format = Format::new(FormatKind::Wav, vec![".wav", ".wave"], "audio/wav", None);
        assert_eq!(format.default_extension(), ".wav");
    }

    #[test]
    fn test_accepts_extension_case_insensitive() {
        let format = Format::new(FormatKind::Wav, vec![".wav", ".wave"], "audio/wav", None);
        assert!(format.accepts_extension(".WAVE"));
        assert!(format.accepts_extension("wav"));
        assert!(!format.accepts_extension(".mp3"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FormatKind::Flac.to_string(), "flac");
    }
}
