//! Single-consumer aggregation of scrape results.
//!
//! The aggregator task owns every map it builds. Workers only ever talk to it
//! through the result channel, so nothing here needs a lock, and nothing reads
//! the state until [`Aggregator::run`] hands it back after the channel closes.

use crate::models::{DiscoveredServers, ScrapedRecord, ServerHostnameIndex, is_valid_server};
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use tracing::{info, instrument};

/// Everything learned during the scrape phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub servers: DiscoveredServers,
    pub server_hostnames: ServerHostnameIndex,
    pub hostnames: BTreeSet<String>,
    pub records: usize,
}

impl Aggregate {
    /// Union of both server roles, each server once.
    pub fn all_servers(&self) -> BTreeSet<String> {
        self.servers.tftp.union(&self.servers.cucm).cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    state: Aggregate,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the aggregate.
    pub fn ingest(&mut self, record: ScrapedRecord) {
        let state = &mut self.state;
        state.records += 1;

        if is_valid_server(&record.tftp_server) {
            state.servers.tftp.insert(record.tftp_server.clone());
            index_hostname(&mut state.server_hostnames, &record.tftp_server, &record.hostname);
        }
        if is_valid_server(&record.cucm_server) {
            state.servers.cucm.insert(record.cucm_server.clone());
            index_hostname(&mut state.server_hostnames, &record.cucm_server, &record.hostname);
        }

        if !record.hostname.is_empty() {
            state.hostnames.insert(record.hostname.clone());
        }

        info!(
            address = %record.address,
            hostname = %record.hostname,
            tftp = %record.tftp_server,
            cucm = %record.cucm_server,
            "Processed scrape result"
        );
    }

    pub fn finish(self) -> Aggregate {
        self.state
    }

    /// Consume records until every sender is gone, then return the aggregate.
    #[instrument(level = "info", skip_all)]
    pub async fn run(mut self, mut results: mpsc::Receiver<ScrapedRecord>) -> Aggregate {
        while let Some(record) = results.recv().await {
            self.ingest(record);
        }
        let state = self.finish();
        info!(
            tftp_servers = state.servers.tftp.len(),
            cucm_servers = state.servers.cucm.len(),
            hostnames = state.hostnames.len(),
            "Scrape results aggregated"
        );
        state
    }
}

fn index_hostname(index: &mut ServerHostnameIndex, server: &str, hostname: &str) {
    if hostname.is_empty() {
        return;
    }
    let hostnames = index.entry(server.to_string()).or_default();
    // Linear scan keeps first-seen order; lists stay short.
    if !hostnames.iter().any(|h| h == hostname) {
        hostnames.push(hostname.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hostname: &str, tftp: &str, cucm: &str) -> ScrapedRecord {
        ScrapedRecord {
            address: "10.1.1.1".to_string(),
            hostname: hostname.to_string(),
            tftp_server: tftp.to_string(),
            cucm_server: cucm.to_string(),
        }
    }

    #[test]
    fn test_degenerate_servers_are_rejected() {
        let mut aggregator = Aggregator::new();
        aggregator.ingest(record("SEP1", "::", ""));
        aggregator.ingest(record("SEP2", "", "::"));
        let state = aggregator.finish();

        assert!(state.servers.tftp.is_empty());
        assert!(state.servers.cucm.is_empty());
        assert!(state.server_hostnames.is_empty());
        assert_eq!(state.hostnames.len(), 2);
    }

    #[test]
    fn test_hostnames_dedup_in_first_seen_order() {
        let mut aggregator = Aggregator::new();
        aggregator.ingest(record("SEP-B", "10.0.0.5", ""));
        aggregator.ingest(record("SEP-A", "10.0.0.5", ""));
        aggregator.ingest(record("SEP-B", "10.0.0.5", ""));
        aggregator.ingest(record("SEP-C", "10.0.0.5", ""));
        let state = aggregator.finish();

        assert_eq!(state.server_hostnames["10.0.0.5"], vec!["SEP-B", "SEP-A", "SEP-C"]);
        assert_eq!(state.records, 4);
    }

    #[test]
    fn test_same_server_in_both_roles_lists_hostname_once() {
        let mut aggregator = Aggregator::new();
        aggregator.ingest(record("SEP1", "10.0.0.5", "10.0.0.5"));
        let state = aggregator.finish();

        assert!(state.servers.tftp.contains("10.0.0.5"));
        assert!(state.servers.cucm.contains("10.0.0.5"));
        assert_eq!(state.server_hostnames["10.0.0.5"], vec!["SEP1"]);
        assert_eq!(state.all_servers().len(), 1);
    }

    #[test]
    fn test_hostname_indexed_under_each_server() {
        let mut aggregator = Aggregator::new();
        aggregator.ingest(record("SEP1", "10.0.0.5", "10.0.0.9"));
        let state = aggregator.finish();

        assert_eq!(state.server_hostnames["10.0.0.5"], vec!["SEP1"]);
        assert_eq!(state.server_hostnames["10.0.0.9"], vec!["SEP1"]);
    }

    #[test]
    fn test_server_without_hostname_has_no_index_entry() {
        let mut aggregator = Aggregator::new();
        aggregator.ingest(record("", "10.0.0.5", ""));
        let state = aggregator.finish();

        assert!(state.servers.tftp.contains("10.0.0.5"));
        assert!(!state.server_hostnames.contains_key("10.0.0.5"));
        assert!(state.hostnames.is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(Aggregator::new().run(rx));

        for i in 0..10 {
            tx.send(record(&format!("SEP{i}"), "10.0.0.5", "10.0.0.9"))
                .await
                .unwrap();
        }
        drop(tx);

        let state = handle.await.unwrap();
        assert_eq!(state.records, 10);
        assert_eq!(state.server_hostnames["10.0.0.5"].len(), 10);
        assert_eq!(state.all_servers().len(), 2);
    }
}
