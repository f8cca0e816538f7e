//! Error types for parameter validation.

use thiserror::Error;

/// A parameter map was rejected for the requested output format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("malformed value for {name}: {value:?}")]
    MalformedParameter { name: String, value: String },

    #[error("unsupported value for {name}: {value}")]
    UnsupportedValue { name: String, value: String },

    /// The format has no parameter domain, so nothing can be encoded to it.
    #[error("format {format} cannot be encoded")]
    NotEncodable { format: String },
}

impl ValidationError {
    pub fn missing(name: &str) -> Self {
        Self::MissingParameter {
            name: name.to_string(),
        }
    }

    pub fn malformed(name: &str, value: impl Into<String>) -> Self {
        Self::MalformedParameter {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn unsupported(name: &str, value: impl ToString) -> Self {
        Self::UnsupportedValue {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Name of the parameter at fault, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { name }
            | Self::MalformedParameter { name, .. }
            | Self::UnsupportedValue { name, .. } => Some(name),
            Self::NotEncodable { .. } => None,
        }
    }
}
