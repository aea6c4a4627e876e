//! Input and output helpers used at startup.
//!
//! - Reading the address list into a lazy sequence
//! - Validating the output directory before any network work starts
//! - Turning a bare host into something that fits in a URL authority

use std::borrow::Cow;
use std::error::Error;
use std::fs as stdfs;
use std::io::{BufRead, BufReader};
use std::net::Ipv6Addr;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Open a newline-delimited address list.
///
/// The returned iterator yields each line trimmed, skipping blank lines. It
/// reads lazily; a read error partway through is logged and ends the sequence.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn read_addresses(path: &Path) -> std::io::Result<impl Iterator<Item = String> + Send + use<>> {
    let file = stdfs::File::open(path)?;
    Ok(address_lines(BufReader::new(file)))
}

/// Trimmed, non-empty lines from any line-oriented source.
pub fn address_lines<R: BufRead + Send + 'static>(reader: R) -> impl Iterator<Item = String> + Send + 'static {
    reader
        .lines()
        .map_while(|line| match line {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "Failed reading address list; stopping early");
                None
            }
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

/// Wrap a bare IPv6 literal in brackets. Anything else, including
/// `host:port` and already-bracketed forms, is returned unchanged.
pub fn url_host(host: &str) -> Cow<'_, str> {
    if host.parse::<Ipv6Addr>().is_ok() {
        Cow::Owned(format!("[{host}]"))
    } else {
        Cow::Borrowed(host)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and immediately
/// deletes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
