//! Data models shared by the pipeline stages.
//!
//! - [`ScrapedRecord`]: what one phone's status pages told us
//! - [`DiscoveredServers`] / [`ServerHostnameIndex`]: the aggregated view
//! - [`DownloadTarget`]: one file to fetch from one server
//! - [`RunSummary`]: end-of-run counters

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Server value some phones report when no server is configured.
pub const UNSET_SERVER: &str = "::";

/// Fields scraped from a single phone. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedRecord {
    /// The address the record was scraped from.
    pub address: String,
    pub hostname: String,
    pub tftp_server: String,
    pub cucm_server: String,
}

impl ScrapedRecord {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Fill every empty field from a later source, leaving populated fields alone.
    pub fn fill_missing(&mut self, hostname: &str, tftp_server: &str, cucm_server: &str) {
        if self.hostname.is_empty() {
            self.hostname = hostname.to_string();
        }
        if self.tftp_server.is_empty() {
            self.tftp_server = tftp_server.to_string();
        }
        if self.cucm_server.is_empty() {
            self.cucm_server = cucm_server.to_string();
        }
    }

    /// A record is worth emitting when at least one field was found.
    pub fn has_data(&self) -> bool {
        !self.hostname.is_empty() || !self.tftp_server.is_empty() || !self.cucm_server.is_empty()
    }
}

/// Returns `true` for server values that may enter [`DiscoveredServers`].
pub fn is_valid_server(server: &str) -> bool {
    !server.is_empty() && server != UNSET_SERVER
}

/// Deduplicated server addresses, by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredServers {
    pub tftp: BTreeSet<String>,
    pub cucm: BTreeSet<String>,
}

/// Server address to the hostnames seen alongside it, in first-seen order.
pub type ServerHostnameIndex = BTreeMap<String, Vec<String>>;

/// A single file to fetch and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub save_path: PathBuf,
}

/// Counters reported once the run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub addresses: usize,
    pub records: usize,
    pub tftp_servers: usize,
    pub cucm_servers: usize,
    pub hostnames: usize,
    pub targets: usize,
    pub saved: usize,
    pub undersized: usize,
    pub failed: usize,
    pub bytes_saved: u64,
    pub peak_in_flight: usize,
}
