//! Request, result and state types for conversion jobs.

use std::fmt;
use std::io::{self, Read};

use uuid::Uuid;

use super::error::{ConvertError, ErrorClass};
use super::output::OutputGuard;
use crate::codec::InputStream;
use crate::format::Format;
use crate::params::RawParams;

/// One conversion to run.
pub struct ConversionRequest {
    pub job_id: Uuid,
    /// Encoded input; dropped when the job finishes.
    pub input: Box<dyn InputStream>,
    /// Declared input file name, used to detect the input format.
    pub file_name: String,
    /// Output format name or extension.
    pub output_format: String,
    pub params: RawParams,
}

impl ConversionRequest {
    pub fn new(
        input: impl InputStream + 'static,
        file_name: impl Into<String>,
        output_format: impl Into<String>,
        params: RawParams,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            input: Box::new(input),
            file_name: file_name.into(),
            output_format: output_format.into(),
            params,
        }
    }
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("job_id", &self.job_id)
            .field("file_name", &self.file_name)
            .field("output_format", &self.output_format)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Lifecycle of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    FormatResolved,
    Validated,
    ResourceAcquired,
    Running,
    Finalizing,
    Delivered,
    Aborted,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Delivered | JobState::Aborted)
    }
}

/// Encoded output of a successful job, rewound to the start.
///
/// The underlying resource is released when this is dropped, including when a
/// consumer stops reading part way.
pub struct ConvertedOutput {
    guard: OutputGuard,
    byte_len: u64,
    format: Format,
    file_name: String,
}

impl ConvertedOutput {
    pub(crate) fn new(guard: OutputGuard, byte_len: u64, format: Format, file_name: String) -> Self {
        Self {
            guard,
            byte_len,
            format,
            file_name,
        }
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Suggested download name, `<input stem><default extension>`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Releases the output now instead of on drop.
    pub fn release(self) {
        self.guard.release();
    }
}

impl Read for ConvertedOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.guard.output_mut()?.read(buf)
    }
}

impl fmt::Debug for ConvertedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertedOutput")
            .field("byte_len", &self.byte_len)
            .field("format", &self.format.name())
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Terminal result of a job. Exactly one per job.
#[derive(Debug)]
pub enum Outcome {
    Success(ConvertedOutput),
    ValidationFailure(ConvertError),
    PipelineFailure(ConvertError),
    ResourceFailure(ConvertError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::ValidationFailure(_) => "validation_failure",
            Outcome::PipelineFailure(_) => "pipeline_failure",
            Outcome::ResourceFailure(_) => "resource_failure",
        }
    }

    pub fn error(&self) -> Option<&ConvertError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::ValidationFailure(e)
            | Outcome::PipelineFailure(e)
            | Outcome::ResourceFailure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<ConvertedOutput, ConvertError> {
        match self {
            Outcome::Success(output) => Ok(output),
            Outcome::ValidationFailure(e)
            | Outcome::PipelineFailure(e)
            | Outcome::ResourceFailure(e) => Err(e),
        }
    }
}

impl From<ConvertError> for Outcome {
    fn from(err: ConvertError) -> Self {
        match err.class() {
            ErrorClass::Validation => Outcome::ValidationFailure(err),
            ErrorClass::Pipeline => Outcome::PipelineFailure(err),
            ErrorClass::Resource => Outcome::ResourceFailure(err),
        }
    }
}

impl From<Result<ConvertedOutput, ConvertError>> for Outcome {
    fn from(result: Result<ConvertedOutput, ConvertError>) -> Self {
        match result {
            Ok(output) => Outcome::Success(output),
            Err(e) => e.into(),
        }
    }
}
