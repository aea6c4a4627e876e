//! Typed failures for the per-unit stages of the pipeline.
//!
//! None of these abort a run. They are logged at the unit that produced them
//! and the pipeline carries on with its siblings.

use thiserror::Error;

/// Why a status page yielded no usable fields.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The parser rejected the document. html5ever recovers from malformed
    /// markup, so the current parser never reports this.
    #[allow(dead_code)]
    #[error("failed to parse HTML document: {0}")]
    Parse(String),

    /// None of the host name, TFTP server or Unified CM rows were found.
    #[error("could not find required fields")]
    NotFound,
}

/// Failure of a single HTTP fetch (status page, manifest or download target).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure to obtain fields from one status page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Fetch(FetchError::Transport(e))
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(e: url::ParseError) -> Self {
        Self::Fetch(FetchError::Url(e))
    }
}

/// Failures that stop the pipeline itself rather than one unit of it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
