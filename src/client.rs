// Async HTTP fetch client for ChronosRedirect
// Uses reqwest and follows redirects hop by hop, reporting where the chain ended

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, Response, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::errors::{FetchError, ScanError};
use crate::models::{FetchOutcome, Method};

/// Redirect hops followed before giving up with `TooManyRedirects`
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
}

impl FetchClient {
    pub fn new(proxy: Option<&str>, timeout: Duration) -> Result<Self, ScanError> {
        // Redirects are followed in `fetch` so every hop is counted
        let mut builder = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(timeout)
            .redirect(Policy::none());

        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Issue one request and follow its redirects.
    ///
    /// A redirect is observed as soon as one hop is followed, even when the
    /// chain comes back to the requested URL. The body is decoded lossily so
    /// stray bytes never fail the fetch.
    pub async fn fetch(&self, method: Method, url: &str) -> Result<FetchOutcome, FetchError> {
        let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        let mut verb: reqwest::Method = method.into();
        let mut hops = 0usize;

        let response = loop {
            let response = self.client.request(verb.clone(), current.clone()).send().await?;

            let Some(next) = next_hop(&current, &response) else {
                break response;
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(FetchError::TooManyRedirects);
            }
            if switches_to_get(response.status(), &verb) {
                verb = reqwest::Method::GET;
            }
            debug!(from = %current, to = %next, hops, "following redirect");
            current = next;
        };

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        let redirected = hops > 0;

        debug!(%method, url, status, final_url = %current, hops, "fetched");

        Ok(FetchOutcome {
            status,
            final_url: current.to_string(),
            redirected,
            body,
        })
    }
}

/// Target of a redirect response, resolved against the URL that produced it.
/// A 3xx without a usable `Location` ends the chain.
fn next_hop(current: &Url, response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

/// 301/302 turn a POST into a GET, 303 turns anything but HEAD into a GET
fn switches_to_get(status: StatusCode, verb: &reqwest::Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => *verb != reqwest::Method::HEAD,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *verb == reqwest::Method::POST,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_is_a_per_item_failure() {
        let client = FetchClient::new(None, Duration::from_secs(1)).unwrap();
        let err = client.fetch(Method::GET, "not a url?x=//evil.com").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn bad_proxy_is_fatal() {
        assert!(FetchClient::new(Some("::not a proxy::"), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn post_becomes_get_after_found() {
        assert!(switches_to_get(StatusCode::FOUND, &reqwest::Method::POST));
        assert!(switches_to_get(StatusCode::SEE_OTHER, &reqwest::Method::POST));
        assert!(!switches_to_get(StatusCode::TEMPORARY_REDIRECT, &reqwest::Method::POST));
        assert!(!switches_to_get(StatusCode::FOUND, &reqwest::Method::GET));
    }
}
