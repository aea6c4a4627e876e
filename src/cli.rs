//! Command-line interface definitions for cucmber.
//!
//! The only required argument is the address list. Everything else tunes
//! the pipeline and has a sensible default.

use crate::config::{
    DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_FILE_PORT, DEFAULT_MIN_FILE_SIZE, DEFAULT_WORKERS,
    PipelineConfig,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for cucmber.
///
/// # Examples
///
/// ```sh
/// # Scan every phone listed in ips.txt, saving into ./output
/// cucmber ips.txt
///
/// # Fewer scrape workers, more parallel downloads, custom directory
/// cucmber ips.txt -w 8 -c 40 -o ./loot
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// File with one phone address per line
    pub input: PathBuf,

    /// Directory downloaded files are written to (created if absent)
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Number of concurrent scrape workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Maximum simultaneous downloads
    #[arg(short, long, default_value_t = DEFAULT_DOWNLOAD_CONCURRENCY)]
    pub concurrency: usize,

    /// HTTP file-service port on discovered servers
    #[arg(long, default_value_t = DEFAULT_FILE_PORT)]
    pub port: u16,

    /// Timeout in seconds for status page and cache list requests
    #[arg(long, default_value_t = 10)]
    pub scrape_timeout: u64,

    /// Timeout in seconds for each file download
    #[arg(long, default_value_t = 15)]
    pub download_timeout: u64,

    /// Files smaller than this many bytes are discarded
    #[arg(long, default_value_t = DEFAULT_MIN_FILE_SIZE)]
    pub min_size: u64,
}

impl From<&Cli> for PipelineConfig {
    fn from(cli: &Cli) -> Self {
        PipelineConfig {
            output_dir: cli.output_dir.clone(),
            workers: cli.workers,
            download_concurrency: cli.concurrency,
            file_port: cli.port,
            scrape_timeout: Duration::from_secs(cli.scrape_timeout),
            download_timeout: Duration::from_secs(cli.download_timeout),
            min_file_size: cli.min_size,
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["cucmber", "ips.txt"]);
        assert_eq!(cli.input, PathBuf::from("ips.txt"));
        assert_eq!(cli.output_dir, PathBuf::from("output"));

        let config = PipelineConfig::from(&cli);
        assert_eq!(config.workers, 20);
        assert_eq!(config.download_concurrency, 20);
        assert_eq!(config.file_port, 6970);
        assert_eq!(config.scrape_timeout, Duration::from_secs(10));
        assert_eq!(config.download_timeout, Duration::from_secs(15));
        assert_eq!(config.min_file_size, 10);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["cucmber", "ips.txt", "-o", "/tmp/loot", "-w", "0", "-c", "5"]);
        let config = PipelineConfig::from(&cli);

        assert_eq!(config.output_dir, PathBuf::from("/tmp/loot"));
        assert_eq!(config.workers, 1);
        assert_eq!(config.download_concurrency, 5);
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["cucmber"]).is_err());
    }
}
