//! Phone status page scraping.
//!
//! Each scanned address is an IP phone exposing two HTML status pages:
//!
//! | Page | Path | Notes |
//! |------|------|-------|
//! | Serviceability | `/CGI/Java/Serviceability?adapter=device.statistics.configuration` | Consulted first |
//! | Network configuration | `/NetworkConfiguration` | Fills gaps left by the first page |
//!
//! - [`extract`]: pulls the host name, TFTP server and Unified CM server out of a page
//! - [`pool`]: the bounded worker pool that scrapes every address

pub mod extract;
pub mod pool;
