//! Bounded, best-effort retrieval of download targets.
//!
//! One task is spawned per target; each waits on the [`AdmissionGate`] before
//! it touches the network. Bodies are streamed straight to disk and files
//! smaller than the configured minimum are removed again, since servers
//! answer missing files with short placeholder bodies under a 200.

use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::DownloadTarget;
use futures::StreamExt;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Counting semaphore that also tracks how many permits are out and the
/// highest that number has been.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Held for the duration of one fetch. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn acquire(&self) -> Result<GatePermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved { bytes: u64 },
    /// The body was written and then removed for being below the minimum size.
    Undersized { bytes: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub saved: usize,
    pub undersized: usize,
    pub failed: usize,
    pub bytes_saved: u64,
    pub peak_in_flight: usize,
}

impl DownloadReport {
    fn record(&mut self, outcome: Option<DownloadOutcome>) {
        match outcome {
            Some(DownloadOutcome::Saved { bytes }) => {
                self.saved += 1;
                self.bytes_saved += bytes;
            }
            Some(DownloadOutcome::Undersized { .. }) => self.undersized += 1,
            None => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    gate: AdmissionGate,
    min_file_size: u64,
}

impl Downloader {
    pub fn new(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.download_timeout).build()?;
        Ok(Self {
            client,
            gate: AdmissionGate::new(config.download_concurrency),
            min_file_size: config.min_file_size,
        })
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Fetch every target, at most `download_concurrency` at a time.
    ///
    /// Individual failures are logged and counted; this never fails as a whole.
    #[instrument(level = "info", skip_all, fields(targets = targets.len()))]
    pub async fn download_all(&self, targets: Vec<DownloadTarget>) -> DownloadReport {
        let mut join_set = JoinSet::new();
        for target in targets {
            let downloader = self.clone();
            join_set.spawn(async move { downloader.download_admitted(target).await });
        }

        let mut report = DownloadReport::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(error = %e, "download task panicked");
                    report.failed += 1;
                }
            }
        }
        report.peak_in_flight = self.gate().peak();

        info!(
            saved = report.saved,
            undersized = report.undersized,
            failed = report.failed,
            bytes = report.bytes_saved,
            "Downloads finished"
        );
        report
    }

    async fn download_admitted(&self, target: DownloadTarget) -> Option<DownloadOutcome> {
        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(url = %target.url, error = %e, "Admission gate closed");
                return None;
            }
        };

        debug!(url = %target.url, in_flight = self.gate.in_flight(), "Fetching");

        match self.download(&target).await {
            Ok(DownloadOutcome::Saved { bytes }) => {
                info!(path = %target.save_path.display(), bytes, "Saved");
                Some(DownloadOutcome::Saved { bytes })
            }
            Ok(DownloadOutcome::Undersized { bytes }) => {
                info!(path = %target.save_path.display(), bytes, "Removed undersized file");
                Some(DownloadOutcome::Undersized { bytes })
            }
            Err(e) => {
                warn!(url = %target.url, error = %e, "Download failed");
                None
            }
        }
    }

    /// Fetch one target to its save path without going through the gate.
    pub async fn download(&self, target: &DownloadTarget) -> Result<DownloadOutcome, FetchError> {
        let response = self.client.get(&target.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let mut file = File::create(&target.save_path).await?;
        let written = match copy_body(response, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&target.save_path).await;
                return Err(e);
            }
        };
        drop(file);

        if written < self.min_file_size {
            fs::remove_file(&target.save_path).await?;
            return Ok(DownloadOutcome::Undersized { bytes: written });
        }
        Ok(DownloadOutcome::Saved { bytes: written })
    }
}

async fn copy_body(response: reqwest::Response, file: &mut File) -> Result<u64, FetchError> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
