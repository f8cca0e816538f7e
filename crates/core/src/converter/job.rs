//! Request-scoped conversion orchestration.

use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use super::error::ConvertError;
use super::factory::CodecFactory;
use super::output::{OutputGuard, OutputHint, OutputProvider};
use super::runner::PipelineRunner;
use super::types::{ConversionRequest, ConvertedOutput, JobState, Outcome};
use crate::codec::WriteSeek;
use crate::format::FormatRegistry;
use crate::params;

/// Drives one request from format detection to a delivered or aborted outcome.
///
/// The output resource is acquired only after the parameters validated and
/// is released exactly once on every path.
pub struct ConversionJob<'a> {
    id: Uuid,
    registry: &'a FormatRegistry,
    codecs: &'a dyn CodecFactory,
    outputs: &'a dyn OutputProvider,
    buffer_size: usize,
    cancel: Option<Arc<AtomicBool>>,
    state: JobState,
}

impl<'a> ConversionJob<'a> {
    pub fn new(
        id: Uuid,
        registry: &'a FormatRegistry,
        codecs: &'a dyn CodecFactory,
        outputs: &'a dyn OutputProvider,
        buffer_size: usize,
    ) -> Self {
        Self {
            id,
            registry,
            codecs,
            outputs,
            buffer_size,
            cancel: None,
            state: JobState::Received,
        }
    }

    /// Aborts the pipeline at the next buffer once `flag` is set.
    pub fn with_cancellation(mut self, flag: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Runs the job to its terminal state.
    pub fn run(&mut self, request: ConversionRequest) -> Outcome {
        let file_name = request.file_name.clone();
        match self.execute(request) {
            Ok(output) => {
                self.transition(JobState::Delivered);
                info!(
                    job_id = %self.id,
                    input = %file_name,
                    output = %output.file_name(),
                    bytes = output.byte_len(),
                    "Conversion completed"
                );
                Outcome::Success(output)
            }
            Err(e) => {
                self.transition(JobState::Aborted);
                let outcome = Outcome::from(e);
                match outcome {
                    Outcome::PipelineFailure(ref e) => {
                        error!(job_id = %self.id, input = %file_name, error = %e, "Conversion failed");
                    }
                    Outcome::ResourceFailure(ref e) => {
                        error!(job_id = %self.id, input = %file_name, error = %e, "Output storage failed");
                    }
                    Outcome::ValidationFailure(ref e) => {
                        debug!(job_id = %self.id, input = %file_name, error = %e, "Conversion rejected");
                    }
                    Outcome::Success(_) => {}
                }
                outcome
            }
        }
    }

    fn execute(&mut self, request: ConversionRequest) -> Result<ConvertedOutput, ConvertError> {
        let registry = self.registry;
        let codecs = self.codecs;

        let input_format = registry.resolve_input_format(&request.file_name)?;
        let output_format = registry.resolve_output_format(&request.output_format)?;
        self.transition(JobState::FormatResolved);

        let config = params::validate(output_format, &request.params)?;
        self.transition(JobState::Validated);

        let configured = codecs.build_encoder(config);
        let mut decoder = codecs.build_decoder(input_format, request.input)?;

        let hint = OutputHint {
            job_id: self.id,
            extension: output_format.default_extension().to_string(),
        };
        let output = self.outputs.acquire(&hint).map_err(|e| {
            ConvertError::resource(format!("failed to acquire output: {}", e))
        })?;
        let mut guard = OutputGuard::new(output, self.id);
        self.transition(JobState::ResourceAcquired);

        let report = {
            let sink: &mut dyn WriteSeek = guard.output_mut().map_err(resource_error)?;
            let encoder = codecs.open_encoder(configured.bind(sink), decoder.properties())?;
            self.transition(JobState::Running);
            PipelineRunner::new(self.buffer_size)
                .with_cancellation(self.cancel.clone())
                .run(decoder.as_mut(), encoder)?
        };
        self.transition(JobState::Finalizing);

        let output = guard.output_mut().map_err(resource_error)?;
        output.flush().map_err(resource_error)?;
        let byte_len = output.seek(SeekFrom::End(0)).map_err(resource_error)?;
        output.seek(SeekFrom::Start(0)).map_err(resource_error)?;

        debug!(
            job_id = %self.id,
            frames = report.frames,
            buffers = report.buffers,
            bytes = byte_len,
            "Pipeline finished"
        );

        Ok(ConvertedOutput::new(
            guard,
            byte_len,
            output_format.clone(),
            output_file_name(&request.file_name, output_format.default_extension()),
        ))
    }

    fn transition(&mut self, next: JobState) {
        debug!(job_id = %self.id, from = ?self.state, to = ?next, "Job state transition");
        self.state = next;
    }
}

fn resource_error(e: std::io::Error) -> ConvertError {
    ConvertError::resource(e.to_string())
}

/// `<stem of input><extension>`, e.g. `track.wav` + `.mp3` -> `track.mp3`.
pub fn output_file_name(input_name: &str, extension: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");
    format!("{}{}", stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::StreamFactory;
    use crate::format::{BIT_DEPTH, BIT_RATE_MODE, CHANNEL_MODE, VBR_QUALITY};
    use crate::params::{RawParams, ValidationError};
    use crate::testing::{fixtures, CountingOutputProvider, ScriptedCodecs};
    use std::io::{Cursor, Read};

    fn wav_params(depth: &str) -> RawParams {
        RawParams::new().with(BIT_DEPTH, depth)
    }

    fn run_job(
        codecs: &dyn CodecFactory,
        outputs: &dyn OutputProvider,
        request: ConversionRequest,
    ) -> (Outcome, JobState) {
        let registry = FormatRegistry::builtin();
        let mut job = ConversionJob::new(request.job_id, &registry, codecs, outputs, 1024);
        let outcome = job.run(request);
        (outcome, job.state())
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("track.wav", ".mp3"), "track.mp3");
        assert_eq!(output_file_name("/a/b/take.two.flac", ".wav"), "take.two.wav");
        assert_eq!(output_file_name("", ".wav"), "output.wav");
    }

    #[test]
    fn test_wav_16_bit_round_trip() {
        let samples = fixtures::sine_samples(44_100, 2, 4_000);
        let input = fixtures::wav_bytes(44_100, 2, 16, &samples);
        let outputs = CountingOutputProvider::new();

        let request = ConversionRequest::new(
            Cursor::new(input),
            "tone.wav",
            "wav",
            wav_params("16"),
        );
        let (outcome, state) = run_job(&StreamFactory, &outputs, request);
        assert_eq!(state, JobState::Delivered);

        let mut output = outcome.into_result().unwrap();
        assert_eq!(output.content_type(), "audio/wav");
        assert_eq!(output.file_name(), "tone.wav");

        let mut bytes = Vec::new();
        output.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, output.byte_len());

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);

        drop(output);
        assert_eq!(outputs.releases(), 1);
    }

    #[test]
    fn test_wav_to_mp3_vbr() {
        let samples = fixtures::sine_samples(44_100, 2, 44_100);
        let input = fixtures::wav_bytes(44_100, 2, 16, &samples);
        let outputs = CountingOutputProvider::new();

        let params = RawParams::new()
            .with(BIT_RATE_MODE, "VBR")
            .with(VBR_QUALITY, "4")
            .with(CHANNEL_MODE, "2");
        let request = ConversionRequest::new(Cursor::new(input), "track.wav", "mp3", params);
        let (outcome, _) = run_job(&StreamFactory, &outputs, request);

        let output = outcome.into_result().unwrap();
        assert_eq!(output.content_type(), "audio/mpeg");
        assert_eq!(output.file_name(), "track.mp3");
        assert!(output.byte_len() > 0);
    }

    #[test]
    fn test_rejected_request_acquires_nothing() {
        let outputs = CountingOutputProvider::new();
        let input = fixtures::wav_bytes(8_000, 1, 16, &[0; 16]);

        let request = ConversionRequest::new(
            Cursor::new(input.clone()),
            "tone.wav",
            "wav",
            wav_params("11"),
        );
        let (outcome, state) = run_job(&StreamFactory, &outputs, request);
        assert!(matches!(
            outcome,
            Outcome::ValidationFailure(ConvertError::Validation(
                ValidationError::UnsupportedValue { .. }
            ))
        ));
        assert_eq!(state, JobState::Aborted);

        let request = ConversionRequest::new(
            Cursor::new(input.clone()),
            "tone.ogg",
            "wav",
            wav_params("16"),
        );
        let (outcome, _) = run_job(&StreamFactory, &outputs, request);
        assert!(matches!(
            outcome,
            Outcome::ValidationFailure(ConvertError::UnsupportedFormat(_))
        ));

        let request =
            ConversionRequest::new(Cursor::new(input), "tone.wav", "flac", RawParams::new());
        let (outcome, _) = run_job(&StreamFactory, &outputs, request);
        assert!(matches!(outcome, Outcome::ValidationFailure(_)));

        assert_eq!(outputs.acquisitions(), 0);
    }

    #[test]
    fn test_mid_stream_failure_releases_once() {
        let outputs = CountingOutputProvider::new();
        let codecs = ScriptedCodecs::new(2, 50_000).fail_decode_after(3);

        let request =
            ConversionRequest::new(Cursor::new(Vec::new()), "x.wav", "wav", wav_params("16"));
        let (outcome, state) = run_job(&codecs, &outputs, request);

        assert!(matches!(outcome, Outcome::PipelineFailure(ConvertError::Codec(_))));
        assert_eq!(state, JobState::Aborted);
        assert_eq!(outputs.acquisitions(), 1);
        assert_eq!(outputs.releases(), 1);
    }

    #[test]
    fn test_cancelled_job_releases_once() {
        let outputs = CountingOutputProvider::new();
        let codecs = ScriptedCodecs::new(2, 50_000);
        let registry = FormatRegistry::builtin();
        let flag = Arc::new(AtomicBool::new(true));

        let request =
            ConversionRequest::new(Cursor::new(Vec::new()), "x.wav", "wav", wav_params("16"));
        let mut job = ConversionJob::new(request.job_id, &registry, &codecs, &outputs, 1024)
            .with_cancellation(Some(flag));
        let outcome = job.run(request);

        assert!(matches!(
            outcome,
            Outcome::PipelineFailure(ConvertError::Interrupted { .. })
        ));
        assert_eq!(job.state(), JobState::Aborted);
        assert_eq!(outputs.acquisitions(), 1);
        assert_eq!(outputs.releases(), 1);
    }

    #[test]
    fn test_encoder_failure_releases_once() {
        let outputs = CountingOutputProvider::new();
        let codecs = ScriptedCodecs::new(1, 50_000).fail_encode_after(1);

        let request =
            ConversionRequest::new(Cursor::new(Vec::new()), "x.wav", "wav", wav_params("8"));
        let (outcome, _) = run_job(&codecs, &outputs, request);

        assert!(matches!(outcome, Outcome::PipelineFailure(_)));
        assert_eq!(outputs.releases(), 1);
    }

    #[test]
    fn test_acquisition_failure_is_resource_failure() {
        let outputs = CountingOutputProvider::failing();
        let codecs = ScriptedCodecs::new(1, 10);

        let request =
            ConversionRequest::new(Cursor::new(Vec::new()), "x.wav", "wav", wav_params("16"));
        let (outcome, _) = run_job(&codecs, &outputs, request);

        assert!(matches!(outcome, Outcome::ResourceFailure(_)));
        assert_eq!(outputs.releases(), 0);
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_acquisition_failure_is_logged_at_info_level() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let outputs = CountingOutputProvider::failing();
        let codecs = ScriptedCodecs::new(1, 10);
        let request =
            ConversionRequest::new(Cursor::new(Vec::new()), "x.wav", "wav", wav_params("16"));

        let (outcome, _) = tracing::subscriber::with_default(subscriber, || {
            run_job(&codecs, &outputs, request)
        });
        assert!(matches!(outcome, Outcome::ResourceFailure(_)));

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("ERROR"), "{}", text);
        assert!(text.contains("Output storage failed"), "{}", text);
    }

    #[test]
    fn test_corrupt_input_is_pipeline_failure_without_acquisition() {
        let outputs = CountingOutputProvider::new();
        let request = ConversionRequest::new(
            Cursor::new(b"definitely not audio".to_vec()),
            "broken.wav",
            "wav",
            wav_params("16"),
        );
        let (outcome, _) = run_job(&StreamFactory, &outputs, request);

        assert!(matches!(outcome, Outcome::PipelineFailure(_)));
        assert_eq!(outputs.acquisitions(), 0);
    }

    #[test]
    fn test_partial_read_then_drop_releases() {
        let outputs = CountingOutputProvider::new();
        let codecs = ScriptedCodecs::new(2, 4096);

        let request =
            ConversionRequest::new(Cursor::new(Vec::new()), "x.mp3", "wav", wav_params("24"));
        let (outcome, _) = run_job(&codecs, &outputs, request);
        let mut output = outcome.into_result().unwrap();

        let mut head = [0u8; 16];
        output.read_exact(&mut head).unwrap();
        assert_eq!(outputs.releases(), 0);
        drop(output);
        assert_eq!(outputs.releases(), 1);
    }
}
