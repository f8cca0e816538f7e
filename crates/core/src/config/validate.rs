use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Converter buffer size is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Converter validation
    if config.converter.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "converter.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}
