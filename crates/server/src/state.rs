use std::sync::Arc;

use tempfile::SpooledTempFile;

use phono_core::{
    Config, ConversionService, FormatRegistry, LimitsConfig, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    service: ConversionService,
}

impl AppState {
    pub fn new(config: Config, service: ConversionService) -> Self {
        Self { config, service }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &ConversionService {
        &self.service
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        self.service.registry()
    }

    /// Per-format upload limits.
    pub fn limits(&self) -> &LimitsConfig {
        &self.config.limits
    }

    /// Buffer for an incoming upload; spills into the converter's temp dir.
    pub fn upload_spool(&self) -> SpooledTempFile {
        let converter = self.service.config();
        SpooledTempFile::new_in(
            converter.spool_threshold_bytes,
            converter.effective_temp_dir(),
        )
    }
}
