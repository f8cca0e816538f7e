//! Error types for codec adapters.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The input could not be probed or decoded.
    #[error("decode failed: {reason}")]
    Decode { reason: String },

    /// The encoder rejected its settings or failed to write.
    #[error("encode failed: {reason}")]
    Encode { reason: String },
}

impl CodecError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }
}
