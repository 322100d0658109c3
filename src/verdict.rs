// Verdict engine for ChronosRedirect
// Decides if a redirect chain is vulnerable, partially suspicious, or safe

use crate::models::Classification;

/// Final authorities that indicate an attacker-controlled landing
pub const ATTACKER_HOSTS: &[&str] = &["evil.com", "@evil.com", "127.0.0.1", "localhost"];

/// Classify a redirect chain.
///
/// Rules, first match wins:
/// 1. Payload reflected verbatim in the body = PARTIAL
/// 2. Final authority equal to the original (or absent) = SAFE
/// 3. Final authority is an attacker indicator = VULNERABLE
/// 4. Any other off-origin landing = PARTIAL
///
/// Only meaningful when at least one redirect hop was observed.
pub fn classify(original_url: &str, final_url: &str, payload: &str, body: &str) -> Classification {
    if body.contains(payload) {
        return Classification::Partial;
    }

    let final_authority = authority(final_url);
    if final_authority.is_empty() || final_authority == authority(original_url) {
        return Classification::Safe;
    }

    if ATTACKER_HOSTS.contains(&final_authority) {
        Classification::Vulnerable
    } else {
        Classification::Partial
    }
}

/// Network authority of a URL as written: everything between `//` and the
/// next `/`, `?` or `#`, userinfo and port included. Empty when the URL has
/// no `//` authority section.
pub fn authority(url: &str) -> &str {
    let rest = match url.find(':') {
        Some(idx) if is_scheme(&url[..idx]) => &url[idx + 1..],
        _ => url,
    };

    match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(&['/', '?', '#'][..]).unwrap_or(after.len());
            &after[..end]
        }
        None => "",
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_extraction() {
        assert_eq!(authority("https://evil.com/"), "evil.com");
        assert_eq!(authority("http://a.test:8080/x?y=1"), "a.test:8080");
        assert_eq!(authority("https://@evil.com"), "@evil.com");
        assert_eq!(authority("http://user:pw@host.test#frag"), "user:pw@host.test");
        assert_eq!(authority("//evil.com/path"), "evil.com");
        assert_eq!(authority("/relative/path"), "");
        assert_eq!(authority("https:evil.com"), "");
    }

    #[test]
    fn reflected_payload_wins_over_attacker_host() {
        let verdict = classify(
            "http://a.test/?x=https://evil.com",
            "https://evil.com/",
            "https://evil.com",
            "<a href=\"https://evil.com\">continue</a>",
        );
        assert_eq!(verdict, Classification::Partial);
    }

    #[test]
    fn attacker_host_is_vulnerable() {
        for host in ["evil.com", "127.0.0.1", "localhost"] {
            let verdict = classify(
                "http://a.test/?x=//evil.com",
                &format!("http://{}/", host),
                "//evil.com",
                "",
            );
            assert_eq!(verdict, Classification::Vulnerable, "host {}", host);
        }
    }

    #[test]
    fn same_authority_is_safe() {
        let verdict = classify(
            "http://a.test/?x=https://evil.com",
            "https://a.test/page",
            "https://evil.com",
            "welcome",
        );
        assert_eq!(verdict, Classification::Safe);
    }

    #[test]
    fn authority_less_final_url_is_safe() {
        let verdict = classify("http://a.test/?x=1", "/local", "//evil.com", "");
        assert_eq!(verdict, Classification::Safe);
    }

    #[test]
    fn unknown_foreign_host_is_partial() {
        let verdict = classify(
            "http://a.test/?x=//evil.com",
            "https://other.test/",
            "//evil.com",
            "",
        );
        assert_eq!(verdict, Classification::Partial);
    }

    #[test]
    fn port_is_part_of_authority() {
        let verdict = classify(
            "http://a.test/?x=//evil.com",
            "http://evil.com:8080/",
            "//evil.com",
            "",
        );
        assert_eq!(verdict, Classification::Partial);
    }
}
