//! Loader configuration

use serde::{Deserialize, Serialize};

use super::errors::{BatchError, BatchResult};

/// Tuning shared by every loader of one registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Largest number of descriptors merged into one pipeline. When set,
    /// bigger batches are split into chunks that run concurrently. Unset
    /// means every batch is one pipeline and one round trip.
    #[serde(default)]
    pub max_batch_size: Option<usize>,

    /// Log every merged wire pipeline at DEBUG level
    #[serde(default)]
    pub log_pipelines: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            log_pipelines: false,
        }
    }
}

impl LoaderConfig {
    /// Sets the maximum batch size
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    /// Enables pipeline logging
    pub fn with_pipeline_logging(mut self) -> Self {
        self.log_pipelines = true;
        self
    }

    /// Number of descriptors per pipeline for a batch of `len`
    pub fn chunk_size(&self, len: usize) -> usize {
        self.max_batch_size.unwrap_or(len).max(1)
    }

    pub fn validate(&self) -> BatchResult<()> {
        if self.max_batch_size == Some(0) {
            return Err(BatchError::Config("max_batch_size must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: LoaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.max_batch_size, None);
        assert!(!config.log_pipelines);
    }

    #[test]
    fn test_chunk_size_unbounded_by_default() {
        let config = LoaderConfig::default();
        assert_eq!(config.chunk_size(5000), 5000);
        assert_eq!(config.chunk_size(0), 1);

        let config = LoaderConfig::default().with_max_batch_size(100);
        assert_eq!(config.chunk_size(5000), 100);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = LoaderConfig::default().with_max_batch_size(0);
        assert!(config.validate().is_err());
        assert!(LoaderConfig::default().validate().is_ok());
    }
}
