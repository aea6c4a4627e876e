//! Bounded pool of workers scraping phone status pages.
//!
//! Every worker pulls addresses from one shared receiver until it is closed,
//! fetches both status pages in order, merges what they report and pushes a
//! [`ScrapedRecord`] downstream. The bounded result channel is the only
//! backpressure between the workers and the aggregator.

use crate::config::PipelineConfig;
use crate::error::ScrapeError;
use crate::models::ScrapedRecord;
use crate::scrapers::extract::{PhoneFields, extract_fields};
use crate::utils::url_host;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Device statistics page. Consulted first; its values take precedence.
pub const SERVICEABILITY_PAGE: &str =
    "CGI/Java/Serviceability?adapter=device.statistics.configuration";
/// Network configuration page. Fills whatever the first page left empty.
pub const NETWORK_CONFIG_PAGE: &str = "NetworkConfiguration";

const STATUS_PAGES: [&str; 2] = [SERVICEABILITY_PAGE, NETWORK_CONFIG_PAGE];

/// Build the URL of one status page on a phone.
pub fn status_page_url(address: &str, page: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("http://{}/", url_host(address)))?.join(page)
}

#[derive(Debug, Clone)]
pub struct ScrapeWorkerPool {
    client: Client,
    workers: usize,
}

impl ScrapeWorkerPool {
    pub fn new(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.scrape_timeout).build()?;
        Ok(Self {
            client,
            workers: config.workers.max(1),
        })
    }

    /// Drain `addresses` with the configured number of workers.
    ///
    /// Returns once the address channel is closed and empty and every worker
    /// has finished. `results` is dropped on return, closing the channel for
    /// the consumer once the last worker's clone goes too.
    #[instrument(level = "info", skip_all, fields(workers = self.workers))]
    pub async fn run(self, addresses: mpsc::Receiver<String>, results: mpsc::Sender<ScrapedRecord>) {
        let shared_receiver = Arc::new(Mutex::new(addresses));

        let mut join_set = JoinSet::new();
        for worker_idx in 0..self.workers {
            let rx = Arc::clone(&shared_receiver);
            let tx = results.clone();
            let client = self.client.clone();
            join_set.spawn(async move { run_worker(worker_idx, rx, tx, client).await });
        }
        drop(results);

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "scrape worker panicked");
            }
        }
        info!("All scrape workers finished");
    }
}

async fn run_worker(
    worker_idx: usize,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<ScrapedRecord>,
    client: Client,
) {
    loop {
        let Some(address) = receive_address(&receiver).await else {
            debug!(worker = worker_idx, "worker terminating (channel closed)");
            break;
        };

        let record = scrape_address(&client, &address).await;
        if !record.has_data() {
            info!(%address, "No useful data found");
            continue;
        }
        if results.send(record).await.is_err() {
            warn!(worker = worker_idx, "result channel closed; stopping worker");
            break;
        }
    }
}

async fn receive_address(receiver: &Arc<Mutex<mpsc::Receiver<String>>>) -> Option<String> {
    let mut guard = receiver.lock().await;
    guard.recv().await
}

/// Scrape both status pages of one phone and merge their fields.
///
/// A failure on either page is logged and never prevents the other from
/// being tried. Fields from the first page are never overwritten.
#[instrument(level = "debug", skip(client))]
pub async fn scrape_address(client: &Client, address: &str) -> ScrapedRecord {
    let mut record = ScrapedRecord::new(address);

    for page in STATUS_PAGES {
        match fetch_page(client, address, page).await {
            Ok(fields) => {
                info!(
                    %address,
                    page,
                    hostname = %fields.hostname,
                    tftp = %fields.tftp_server,
                    cucm = %fields.cucm_server,
                    "Status page fields found"
                );
                record.fill_missing(&fields.hostname, &fields.tftp_server, &fields.cucm_server);
            }
            Err(e) => {
                warn!(%address, page, error = %e, "Status page yielded nothing");
            }
        }
    }

    record
}

async fn fetch_page(client: &Client, address: &str, page: &str) -> Result<PhoneFields, ScrapeError> {
    let url = status_page_url(address, page)?;
    let body = client.get(url).send().await?.bytes().await?;
    Ok(extract_fields(&body)?)
}
