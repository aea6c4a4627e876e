//! # cucmber
//!
//! Harvests configuration files from Cisco call-control infrastructure by way
//! of the IP phones that point at it.
//!
//! ## Usage
//!
//! ```sh
//! cucmber ips.txt -o ./output
//! ```
//!
//! ## Architecture
//!
//! The application runs three phases, each finishing before the next begins:
//! 1. **Scraping**: Workers read two status pages per phone and an aggregator
//!    collects the TFTP/CUCM servers and hostnames they report
//! 2. **Expansion**: Each server is turned into a list of files to fetch
//!    (static defaults, its cache list, per-hostname configs)
//! 3. **Downloading**: Every file is fetched under a concurrency ceiling and
//!    tiny placeholder responses are discarded

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod download;
mod error;
mod models;
mod pipeline;
mod scrapers;
mod targets;
mod utils;

use cli::Cli;
use config::PipelineConfig;
use utils::{ensure_writable_dir, read_addresses};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "cucmber starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    let config = PipelineConfig::from(&args);

    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let addresses = match read_addresses(&args.input) {
        Ok(addresses) => addresses,
        Err(e) => {
            error!(path = %args.input.display(), error = %e, "Cannot open address list");
            return Err(e.into());
        }
    };

    let summary = pipeline::run(&config, addresses).await?;

    let elapsed = start_time.elapsed();
    info!(
        addresses = summary.addresses,
        records = summary.records,
        tftp_servers = summary.tftp_servers,
        cucm_servers = summary.cucm_servers,
        hostnames = summary.hostnames,
        targets = summary.targets,
        saved = summary.saved,
        undersized = summary.undersized,
        failed = summary.failed,
        bytes = summary.bytes_saved,
        peak_in_flight = summary.peak_in_flight,
        secs = elapsed.as_secs(),
        "All operations completed"
    );

    Ok(())
}
