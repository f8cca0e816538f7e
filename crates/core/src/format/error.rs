//! Error types for format resolution.

use thiserror::Error;

/// Errors raised while building or querying the format registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Name or extension does not map to a usable format.
    #[error("unsupported format: {name}")]
    Unsupported { name: String },

    /// Two registered formats claim the same extension.
    #[error("extension {extension} is registered by both {first} and {second}")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },

    /// A format was registered twice.
    #[error("format {name} is registered more than once")]
    DuplicateFormat { name: String },
}

impl FormatError {
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::Unsupported { name: name.into() }
    }
}
