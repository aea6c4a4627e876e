//! Runtime tunables for the pipeline.
//!
//! [`PipelineConfig`] is built from the command line (see [`crate::cli::Cli`])
//! and handed to every stage. Tests construct it directly.

use std::path::PathBuf;
use std::time::Duration;

/// Port the TFTP/CUCM servers expose their HTTP file service on.
pub const DEFAULT_FILE_PORT: u16 = 6970;
pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 20;
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);
/// Bodies shorter than this are treated as placeholders and discarded.
pub const DEFAULT_MIN_FILE_SIZE: u64 = 10;

/// Capacity of the address and scrape-result channels.
pub const QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub workers: usize,
    pub download_concurrency: usize,
    pub file_port: u16,
    /// Applies to status page and manifest requests.
    pub scrape_timeout: Duration,
    pub download_timeout: Duration,
    pub min_file_size: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            workers: DEFAULT_WORKERS,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            file_port: DEFAULT_FILE_PORT,
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            min_file_size: DEFAULT_MIN_FILE_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Clamp counts that would otherwise stall the pipeline.
    pub fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self.download_concurrency = self.download_concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.file_port, 6970);
        assert_eq!(config.workers, 20);
        assert_eq!(config.download_concurrency, 20);
        assert_eq!(config.min_file_size, 10);
        assert_eq!(config.scrape_timeout, Duration::from_secs(10));
        assert_eq!(config.download_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_normalized_clamps_zero_counts() {
        let config = PipelineConfig {
            workers: 0,
            download_concurrency: 0,
            ..PipelineConfig::default()
        }
        .normalized();
        assert_eq!(config.workers, 1);
        assert_eq!(config.download_concurrency, 1);
    }
}
