// URL templating for ChronosRedirect
//
// Turns raw target URLs into templates carrying the marker keyword, and fills
// templates with payloads at scan time.
//
// Example:
//   Input:    http://a.test/login?next=/home&lang=en#top
//   Template: http://a.test/login?next=FUZZ&lang=FUZZ#top
//   Filled:   http://a.test/login?next=//evil.com&lang=//evil.com#top

use std::io::BufRead;

use crate::errors::ScanError;

/// Inject `keyword` into every query parameter value of `url`.
///
/// URLs already containing the keyword are returned unchanged. Scheme,
/// authority, path and fragment are kept verbatim; parameter keys keep their
/// order. A URL without query parameters comes back without a query.
pub fn templatize(url: &str, keyword: &str) -> String {
    if url.contains(keyword) {
        return url.to_string();
    }

    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = head.split_once('?').unwrap_or((head, ""));

    let fuzzed: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let key = pair.split_once('=').map_or(pair, |(key, _)| key);
            format!("{}={}", key, keyword)
        })
        .collect();

    let mut templated = base.to_string();
    if !fuzzed.is_empty() {
        templated.push('?');
        templated.push_str(&fuzzed.join("&"));
    }
    if let Some(fragment) = fragment {
        templated.push('#');
        templated.push_str(fragment);
    }
    templated
}

/// Replace every occurrence of `keyword` in `template` with `payload`
pub fn fill_payload(template: &str, keyword: &str, payload: &str) -> String {
    template.replace(keyword, payload)
}

/// Whether a template will receive payloads at all
pub fn has_marker(template: &str, keyword: &str) -> bool {
    !keyword.is_empty() && template.contains(keyword)
}

/// Read newline-delimited target URLs, trimming each line and templating it.
/// Blank lines are skipped.
pub fn load_targets<R: BufRead>(reader: R, keyword: &str) -> Result<Vec<String>, ScanError> {
    let mut targets = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(ScanError::Input)?;
        let url = line.trim();
        if url.is_empty() {
            continue;
        }
        targets.push(templatize(url, keyword));
    }
    Ok(targets)
}
