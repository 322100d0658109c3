// Error types for ChronosRedirect
//
// FetchError is the closed set of per-item network failures: the engine logs
// them and moves on. ScanError is fatal and aborts the run.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recoverable failure of a single fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("request timed out")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Short label used in the failure log
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl(_) => "invalid-url",
            FetchError::Connect(_) => "connect",
            FetchError::Dns(_) => "dns",
            FetchError::Tls(_) => "tls",
            FetchError::Timeout => "timeout",
            FetchError::TooManyRedirects => "too-many-redirects",
            FetchError::Decode(_) => "decode",
            FetchError::Request(_) => "request",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let chain = error_chain(&err);

        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_redirect() {
            FetchError::TooManyRedirects
        } else if err.is_connect() {
            let lowered = chain.to_lowercase();
            if lowered.contains("dns error") || lowered.contains("failed to lookup address") {
                FetchError::Dns(chain)
            } else if lowered.contains("tls") || lowered.contains("certificate") {
                FetchError::Tls(chain)
            } else {
                FetchError::Connect(chain)
            }
        } else if err.is_decode() || err.is_body() {
            FetchError::Decode(chain)
        } else if err.is_builder() {
            FetchError::InvalidUrl(chain)
        } else {
            FetchError::Request(chain)
        }
    }
}

/// Flatten an error and its sources into one line
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Fatal error that stops the whole run
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read payload file {}: {source}", .path.display())]
    PayloadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read target URLs: {0}")]
    Input(#[source] io::Error),

    #[error("concurrency must be between 1 and {}", tokio::sync::Semaphore::MAX_PERMITS)]
    InvalidConcurrency,

    #[error("unsupported HTTP method: {0} (expected GET or POST)")]
    UnsupportedMethod(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize JSON report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("admission semaphore closed")]
    Admission(#[from] tokio::sync::AcquireError),

    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
