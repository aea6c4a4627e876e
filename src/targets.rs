//! Expansion of discovered servers into download targets.
//!
//! Every server gets, in this order:
//!
//! 1. The static files: `SPDefault.cnf.xml`, `ConfigFileCacheList.txt` and
//!    their `.sgn` signatures
//! 2. Every file listed in its `ConfigFileCacheList.txt` manifest, plus the
//!    signature of each file that is not already a signature
//! 3. `<hostname>.cnf.xml` and its signature, for each hostname seen with it
//!
//! Servers are expanded concurrently. Targets are never deduplicated: a file
//! named both in the manifest and by a hostname is fetched twice.

use crate::aggregator::Aggregate;
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::DownloadTarget;
use crate::utils::url_host;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_CONFIG_FILE: &str = "SPDefault.cnf.xml";
pub const MANIFEST_FILE: &str = "ConfigFileCacheList.txt";
pub const SIGNATURE_SUFFIX: &str = ".sgn";
pub const HOSTNAME_CONFIG_SUFFIX: &str = ".cnf.xml";

const STATIC_FILES: [&str; 2] = [DEFAULT_CONFIG_FILE, MANIFEST_FILE];

/// Filenames listed in a manifest body, in listing order.
///
/// Only the first whitespace-delimited token of each line counts, and only
/// when it contains a `.`; that skips headers and blank lines.
pub fn manifest_filenames(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| token.contains('.'))
        .map(str::to_string)
        .collect()
}

/// `host:port`, bracketing bare IPv6 literals.
fn authority(server: &str, port: u16) -> String {
    format!("{}:{port}", url_host(server))
}

/// Local file name for `filename` fetched from `server`, kept inside the
/// output directory.
fn save_name(server: &str, filename: &str) -> String {
    format!("{server}.{filename}").replace(['/', '\\'], "_")
}

#[derive(Debug, Clone)]
pub struct TargetBuilder {
    client: Client,
    file_port: u16,
    output_dir: PathBuf,
}

impl TargetBuilder {
    pub fn new(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.scrape_timeout).build()?;
        Ok(Self {
            client,
            file_port: config.file_port,
            output_dir: config.output_dir.clone(),
        })
    }

    pub fn target(&self, server: &str, filename: &str) -> DownloadTarget {
        DownloadTarget {
            url: format!("http://{}/{}", authority(server, self.file_port), filename),
            save_path: self.output_dir.join(save_name(server, filename)),
        }
    }

    /// The file itself followed by its signature.
    fn signed_pair(&self, server: &str, filename: &str) -> [DownloadTarget; 2] {
        [
            self.target(server, filename),
            self.target(server, &format!("{filename}{SIGNATURE_SUFFIX}")),
        ]
    }

    pub fn static_targets(&self, server: &str) -> Vec<DownloadTarget> {
        STATIC_FILES
            .iter()
            .flat_map(|file| self.signed_pair(server, file))
            .collect()
    }

    pub fn manifest_expansion(&self, server: &str, body: &str) -> Vec<DownloadTarget> {
        let mut targets = Vec::new();
        for filename in manifest_filenames(body) {
            if filename.ends_with(SIGNATURE_SUFFIX) {
                targets.push(self.target(server, &filename));
            } else {
                targets.extend(self.signed_pair(server, &filename));
            }
        }
        targets
    }

    pub fn hostname_targets(&self, server: &str, hostnames: &[String]) -> Vec<DownloadTarget> {
        hostnames
            .iter()
            .flat_map(|hostname| {
                self.signed_pair(server, &format!("{hostname}{HOSTNAME_CONFIG_SUFFIX}"))
            })
            .collect()
    }

    /// Fetch the server's manifest and expand it. Anything but a 200 is an error.
    pub async fn fetch_manifest_targets(&self, server: &str) -> Result<Vec<DownloadTarget>, FetchError> {
        let url = self.target(server, MANIFEST_FILE).url;
        let response = self.client.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }
        let body = response.text().await?;
        Ok(self.manifest_expansion(server, &body))
    }

    /// Expand one server, appending each group of targets to `sink` as it is ready.
    async fn expand_server(
        &self,
        server: String,
        hostnames: Vec<String>,
        sink: Arc<Mutex<Vec<DownloadTarget>>>,
    ) {
        sink.lock().await.extend(self.static_targets(&server));

        match self.fetch_manifest_targets(&server).await {
            Ok(targets) => {
                info!(%server, count = targets.len(), "Added files from cache list");
                sink.lock().await.extend(targets);
            }
            Err(e) => {
                debug!(%server, error = %e, "Cache list unavailable");
            }
        }

        if !hostnames.is_empty() {
            let targets = self.hostname_targets(&server, &hostnames);
            info!(%server, count = targets.len(), "Added hostname-specific files");
            sink.lock().await.extend(targets);
        }
    }

    /// Build the targets for every discovered server, one task per server.
    #[instrument(level = "info", skip_all)]
    pub async fn build(&self, aggregate: &Aggregate) -> Vec<DownloadTarget> {
        let sink = Arc::new(Mutex::new(Vec::new()));

        let mut join_set = JoinSet::new();
        for server in aggregate.all_servers() {
            let hostnames = aggregate
                .server_hostnames
                .get(&server)
                .cloned()
                .unwrap_or_default();
            let builder = self.clone();
            let sink = Arc::clone(&sink);
            join_set.spawn(async move { builder.expand_server(server, hostnames, sink).await });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "target builder task panicked");
            }
        }

        let targets = match Arc::try_unwrap(sink) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        info!(count = targets.len(), "Built download targets");
        targets
    }
}
