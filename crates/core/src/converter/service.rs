//! Entry point shared by the HTTP and CLI surfaces.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use prometheus::IntGauge;
use tracing::warn;

use super::config::ConverterConfig;
use super::error::ConvertError;
use super::factory::{CodecFactory, StreamFactory};
use super::job::ConversionJob;
use super::output::{OutputProvider, TempFileProvider};
use super::types::{ConversionRequest, Outcome};
use crate::format::FormatRegistry;
use crate::metrics::{CONVERSIONS_IN_FLIGHT, CONVERSIONS_TOTAL, CONVERSION_DURATION, OUTPUT_BYTES};
use crate::params::{self, EncoderConfig, RawParams};

/// Runs conversion jobs against a shared registry.
///
/// Cheap to clone; every clone shares the same registry, codecs and storage.
#[derive(Clone)]
pub struct ConversionService {
    registry: Arc<FormatRegistry>,
    codecs: Arc<dyn CodecFactory>,
    outputs: Arc<dyn OutputProvider>,
    config: ConverterConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl ConversionService {
    /// Production service: real codecs, temporary files under the configured temp dir.
    pub fn new(registry: Arc<FormatRegistry>, config: ConverterConfig) -> Self {
        let outputs = Arc::new(TempFileProvider::new(config.effective_temp_dir()));
        Self::with_components(registry, Arc::new(StreamFactory), outputs, config)
    }

    pub fn with_components(
        registry: Arc<FormatRegistry>,
        codecs: Arc<dyn CodecFactory>,
        outputs: Arc<dyn OutputProvider>,
        config: ConverterConfig,
    ) -> Self {
        Self {
            registry,
            codecs,
            outputs,
            config,
            cancel: None,
        }
    }

    /// Running jobs abort at their next buffer once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Validates parameters for an output format without running anything.
    pub fn validate_params(
        &self,
        output_format: &str,
        params: &RawParams,
    ) -> Result<EncoderConfig, ConvertError> {
        let format = self.registry.resolve_output_format(output_format)?;
        Ok(params::validate(format, params)?)
    }

    /// Runs a job on the calling thread.
    pub fn convert(&self, request: ConversionRequest) -> Outcome {
        let start = Instant::now();
        let input = self
            .registry
            .resolve_input_format(&request.file_name)
            .map(|f| f.name())
            .unwrap_or("unknown");
        let output = self
            .registry
            .resolve_output_format(&request.output_format)
            .map(|f| f.name())
            .unwrap_or("unknown");

        let in_flight = InFlightGuard::enter(&CONVERSIONS_IN_FLIGHT);
        let mut job = ConversionJob::new(
            request.job_id,
            &self.registry,
            self.codecs.as_ref(),
            self.outputs.as_ref(),
            self.config.buffer_size,
        )
        .with_cancellation(self.cancel.clone());
        let outcome = job.run(request);
        drop(in_flight);

        CONVERSIONS_TOTAL
            .with_label_values(&[input, output, outcome.label()])
            .inc();
        CONVERSION_DURATION
            .with_label_values(&[outcome.label()])
            .observe(start.elapsed().as_secs_f64());
        if let Outcome::Success(ref converted) = outcome {
            OUTPUT_BYTES
                .with_label_values(&[output])
                .inc_by(converted.byte_len());
        }

        outcome
    }

    /// Runs a job on the blocking thread pool.
    pub async fn convert_async(&self, request: ConversionRequest) -> Outcome {
        let service = self.clone();
        let job_id = request.job_id;
        match tokio::task::spawn_blocking(move || service.convert(request)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Conversion worker did not complete");
                Outcome::PipelineFailure(ConvertError::Interrupted {
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Holds the in-flight gauge up until dropped, including during unwinding.
struct InFlightGuard(IntGauge);

impl InFlightGuard {
    fn enter(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}
