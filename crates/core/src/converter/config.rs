//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for conversion jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Frames per pipeline buffer.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Directory for temporary outputs. Defaults to the system temp dir.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Uploads larger than this spill from memory to disk.
    #[serde(default = "default_spool_threshold")]
    pub spool_threshold_bytes: usize,
}

fn default_buffer_size() -> usize {
    1024
}

fn default_spool_threshold() -> usize {
    8 * 1024 * 1024 // 8 MiB
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            temp_dir: None,
            spool_threshold_bytes: default_spool_threshold(),
        }
    }
}

impl ConverterConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    /// Directory temporary outputs are created in.
    pub fn effective_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
