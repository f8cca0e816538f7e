//! Error types for the converter module.

use thiserror::Error;

use crate::codec::CodecError;
use crate::format::FormatError;
use crate::params::ValidationError;

/// How an error is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was at fault.
    Validation,
    /// Decoding or encoding failed while streaming.
    Pipeline,
    /// The server could not provide storage.
    Resource,
}

/// Errors that can end a conversion job.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input extension or output name is not supported.
    #[error(transparent)]
    UnsupportedFormat(#[from] FormatError),

    /// Encoder parameters were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upload is larger than the configured limit for its format.
    #[error("{format} input exceeds the limit of {limit_bytes} bytes")]
    SizeExceeded { format: String, limit_bytes: u64 },

    /// Output storage could not be acquired or finalised.
    #[error("output resource error: {reason}")]
    Resource { reason: String },

    /// A codec failed mid-stream.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The pipeline was started in the wrong state.
    #[error("pipeline is {state}, expected idle")]
    InvalidState { state: String },

    /// The worker running the job died.
    #[error("conversion interrupted: {reason}")]
    Interrupted { reason: String },
}

impl ConvertError {
    pub fn resource(reason: impl Into<String>) -> Self {
        Self::Resource {
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedFormat(_) | Self::Validation(_) | Self::SizeExceeded { .. } => {
                ErrorClass::Validation
            }
            Self::Resource { .. } => ErrorClass::Resource,
            Self::Codec(_) | Self::InvalidState { .. } | Self::Interrupted { .. } => {
                ErrorClass::Pipeline
            }
        }
    }
}
