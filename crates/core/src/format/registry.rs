//! Lookup table of registered formats.

use std::collections::HashMap;
use std::path::Path;

use super::domain::{Mp3Domain, ParameterDomain, WavDomain};
use super::error::FormatError;
use super::{normalize_extension, Format, FormatKind};

/// Immutable table of formats, keyed by name and by extension.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<Format>,
    by_extension: HashMap<String, usize>,
}

impl FormatRegistry {
    /// Builds a registry, rejecting duplicate names and overlapping extensions.
    pub fn new(formats: Vec<Format>) -> Result<Self, FormatError> {
        let mut by_extension = HashMap::new();

        for (index, format) in formats.iter().enumerate() {
            if formats[..index].iter().any(|f| f.kind() == format.kind()) {
                return Err(FormatError::DuplicateFormat {
                    name: format.name().to_string(),
                });
            }

            for ext in format.extensions() {
                let key = normalize_extension(ext);
                if let Some(&existing) = by_extension.get(&key) {
                    let first: &Format = &formats[existing];
                    return Err(FormatError::DuplicateExtension {
                        extension: key,
                        first: first.name().to_string(),
                        second: format.name().to_string(),
                    });
                }
                by_extension.insert(key, index);
            }
        }

        Ok(Self {
            formats,
            by_extension,
        })
    }

    /// The formats this service ships with: WAV and MP3 both ways, FLAC decode-only.
    pub fn builtin() -> Self {
        let formats = vec![
            Format::new(
                FormatKind::Wav,
                vec![".wav", ".wave"],
                "audio/wav",
                Some(ParameterDomain::Wav(WavDomain::default())),
            ),
            Format::new(
                FormatKind::Mp3,
                vec![".mp3"],
                "audio/mpeg",
                Some(ParameterDomain::Mp3(Mp3Domain::default())),
            ),
            Format::new(FormatKind::Flac, vec![".flac"], "audio/flac", None),
        ];

        let by_extension = formats
            .iter()
            .enumerate()
            .flat_map(|(index, format)| {
                format
                    .extensions()
                    .iter()
                    .map(move |ext| (normalize_extension(ext), index))
            })
            .collect();

        Self {
            formats,
            by_extension,
        }
    }

    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    /// Formats that can be produced as output.
    pub fn output_formats(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter().filter(|f| f.is_encodable())
    }

    pub fn get(&self, kind: FormatKind) -> Option<&Format> {
        self.formats.iter().find(|f| f.kind() == kind)
    }

    /// Finds a format by name, ignoring case.
    pub fn by_name(&self, name: &str) -> Option<&Format> {
        self.formats
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Finds a format by extension, with or without the leading dot.
    pub fn by_extension(&self, extension: &str) -> Option<&Format> {
        self.by_extension
            .get(&normalize_extension(extension))
            .map(|&index| &self.formats[index])
    }

    /// Resolves the format of an input from its file name or path.
    ///
    /// A bare token without a dot (as sent in `/convert/wav`) is treated as an
    /// extension.
    pub fn resolve_input_format(&self, name_or_path: &str) -> Result<&Format, FormatError> {
        let extension = Path::new(name_or_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(name_or_path);

        if extension.is_empty() {
            return Err(FormatError::unsupported(name_or_path));
        }

        self.by_extension(extension)
            .ok_or_else(|| FormatError::unsupported(name_or_path))
    }

    /// Resolves the requested output format by name or extension.
    ///
    /// Decode-only formats are rejected.
    pub fn resolve_output_format(&self, name: &str) -> Result<&Format, FormatError> {
        let name = name.trim();
        let format = if name.starts_with('.') {
            self.by_extension(name)
        } else {
            self.by_name(name)
        };

        format
            .filter(|f| f.is_encodable())
            .ok_or_else(|| FormatError::unsupported(name))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_input_by_extension() {
        let registry = FormatRegistry::builtin();
        assert_eq!(
            registry.resolve_input_format("track.WAV").unwrap().kind(),
            FormatKind::Wav
        );
        assert_eq!(
            registry.resolve_input_format("/music/take.wave").unwrap().kind(),
            FormatKind::Wav
        );
        assert_eq!(
            registry.resolve_input_format("album/01.flac").unwrap().kind(),
            FormatKind::Flac
        );
    }

    #[test]
    fn test_resolve_input_bare_extension() {
        let registry = FormatRegistry::builtin();
        assert_eq!(
            registry.resolve_input_format("mp3").unwrap().kind(),
            FormatKind::Mp3
        );
    }

    #[test]
    fn test_resolve_input_unknown() {
        let registry = FormatRegistry::builtin();
        let err = registry.resolve_input_format("notes.txt").unwrap_err();
        assert_eq!(err, FormatError::unsupported("notes.txt"));
        assert!(registry.resolve_input_format("").is_err());
    }

    #[test]
    fn test_resolve_output_by_name_and_extension() {
        let registry = FormatRegistry::builtin();
        assert_eq!(
            registry.resolve_output_format("MP3").unwrap().kind(),
            FormatKind::Mp3
        );
        assert_eq!(
            registry.resolve_output_format(".wav").unwrap().kind(),
            FormatKind::Wav
        );
    }

    #[test]
    fn test_resolve_output_rejects_decode_only() {
        let registry = FormatRegistry::builtin();
        assert!(matches!(
            registry.resolve_output_format("flac"),
            Err(FormatError::Unsupported { .. })
        ));
        assert!(registry.resolve_output_format("ogg").is_err());
    }

    #[test]
    fn test_new_rejects_overlapping_extensions() {
        let result = FormatRegistry::new(vec![
            Format::new(FormatKind::Wav, vec![".wav"], "audio/wav", None),
            Format::new(FormatKind::Flac, vec![".WAV"], "audio/flac", None),
        ]);
        assert!(matches!(
            result,
            Err(FormatError::DuplicateExtension { .. })
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_format() {
        let result = FormatRegistry::new(vec![
            Format::new(FormatKind::Wav, vec![".wav"], "audio/wav", None),
            Format::new(FormatKind::Wav, vec![".wave"], "audio/wav", None),
        ]);
        assert!(matches!(result, Err(FormatError::DuplicateFormat { .. })));
    }

    #[test]
    fn test_output_formats_excludes_flac() {
        let registry = FormatRegistry::builtin();
        let names: Vec<_> = registry.output_formats().map(|f| f.name()).collect();
        assert_eq!(names, vec!["wav", "mp3"]);
    }
}
