//! The three-phase discovery and retrieval pipeline.
//!
//! ```text
//! addresses ─▶ feeder ─▶ scrape workers ─▶ aggregator      (phase 1)
//!                                              │
//!                          frozen aggregate ◀──┘
//!                                  │
//!                     per-server target builders            (phase 2)
//!                                  │
//!                        gated downloader                   (phase 3)
//! ```
//!
//! Each phase finishes completely before the next one starts.

use crate::aggregator::Aggregator;
use crate::config::{PipelineConfig, QUEUE_CAPACITY};
use crate::download::Downloader;
use crate::error::PipelineError;
use crate::models::RunSummary;
use crate::scrapers::pool::ScrapeWorkerPool;
use crate::targets::TargetBuilder;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{info, instrument};

/// Run every phase over `addresses` and report what happened.
///
/// Only client construction or an internal task failure makes this return an
/// error; per-address, per-server and per-file failures are logged and counted.
#[instrument(level = "info", skip_all, fields(output_dir = %config.output_dir.display()))]
pub async fn run<I>(config: &PipelineConfig, addresses: I) -> Result<RunSummary, PipelineError>
where
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    let pool = ScrapeWorkerPool::new(config)?;
    let builder = TargetBuilder::new(config)?;
    let downloader = Downloader::new(config)?;

    // ---- Phase 1: scrape and aggregate ----
    let (address_tx, address_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(QUEUE_CAPACITY);

    let addresses = addresses.into_iter();
    let feeder = task::spawn_blocking(move || {
        let mut queued = 0usize;
        for address in addresses {
            if address_tx.blocking_send(address).is_err() {
                break;
            }
            queued += 1;
        }
        queued
    });
    let aggregator = tokio::spawn(Aggregator::new().run(result_rx));

    pool.run(address_rx, result_tx).await;
    let queued = feeder.await?;
    let aggregate = aggregator.await?;

    info!(
        tftp_servers = aggregate.servers.tftp.len(),
        cucm_servers = aggregate.servers.cucm.len(),
        hostnames = aggregate.hostnames.len(),
        "Found servers and unique hostnames"
    );

    // ---- Phase 2: expand servers into targets ----
    let targets = builder.build(&aggregate).await;
    let target_count = targets.len();

    // ---- Phase 3: download ----
    let report = downloader.download_all(targets).await;

    Ok(RunSummary {
        addresses: queued,
        records: aggregate.records,
        tftp_servers: aggregate.servers.tftp.len(),
        cucm_servers: aggregate.servers.cucm.len(),
        hostnames: aggregate.hostnames.len(),
        targets: target_count,
        saved: report.saved,
        undersized: report.undersized,
        failed: report.failed,
        bytes_saved: report.bytes_saved,
        peak_in_flight: report.peak_in_flight,
    })
}
