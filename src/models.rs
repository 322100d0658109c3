// Core data models for ChronosRedirect

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ScanError;

/// Default marker keyword substituted with payloads
pub const DEFAULT_KEYWORD: &str = "FUZZ";
/// Default number of concurrent in-flight requests
pub const DEFAULT_CONCURRENCY: usize = 100;
/// Fixed per-request deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Streaming CSV sink written on every run
pub const DEFAULT_CSV_PATH: &str = "redirects.csv";
/// Append-only failure log
pub const DEFAULT_LOG_PATH: &str = "chronosredirect.log";

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
        }
    }
}

impl FromStr for Method {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            _ => Err(ScanError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

/// Outcome of classifying a redirect chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Safe,
    Partial,
    Vulnerable,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Safe => "safe",
            Classification::Partial => "partial",
            Classification::Vulnerable => "vulnerable",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded outcome for one (target, payload) pair after an observed redirect.
/// Serializes to the JSON sink shape `{url, redirect, status}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    #[serde(rename = "url")]
    pub filled_url: String,
    #[serde(rename = "redirect")]
    pub final_url: String,
    #[serde(rename = "status")]
    pub classification: Classification,
}

impl Finding {
    pub fn new(filled_url: String, final_url: String, classification: Classification) -> Self {
        Self {
            filled_url,
            final_url,
            classification,
        }
    }
}

/// Terminal state of a successful fetch.
/// Failures are carried separately as `FetchError`.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: u16,
    pub final_url: String,
    pub redirected: bool,
    pub body: String,
}

/// Run configuration, immutable for the lifetime of one scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub concurrency: usize,
    pub method: Method,
    pub keyword: String,
    pub stealth: bool,
    pub silent: bool,
    pub output: Option<PathBuf>,
    pub proxy: Option<String>,
    /// Accepted on the command line; no output filtering is applied yet.
    pub filter_domain: Option<String>,
    pub csv_path: PathBuf,
    pub log_path: PathBuf,
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            method: Method::GET,
            keyword: DEFAULT_KEYWORD.to_string(),
            stealth: false,
            silent: false,
            output: None,
            proxy: None,
            filter_domain: None,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Aggregate counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub vulnerable: usize,
    pub partial: usize,
    pub safe: usize,
    /// Items that resolved without a redirect (or never received the marker)
    pub skipped: usize,
    pub failed: usize,
    pub peak_in_flight: usize,
}

impl ScanSummary {
    pub fn findings(&self) -> usize {
        self.vulnerable + self.partial + self.safe
    }

    pub fn resolved(&self) -> usize {
        self.findings() + self.skipped + self.failed
    }
}
