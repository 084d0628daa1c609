// Home server API client, authenticated with a user's bearer token.
//
// Only two endpoints are used: the followed tags list, and search with
// `resolve=True`, which makes the home server fetch a remote post so it
// appears in the user's home feed.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::debug;

use crate::config::server_url;
use crate::extract;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = "tagfinder/0.1 (followed-tag fetcher)";

/// The operations a user agent needs from its home server.
///
/// Implemented over HTTP by [`HomeServerClient`]; tests substitute their own.
#[async_trait]
pub trait HomeServer: Send + Sync {
    /// Host name (or base URL) of the home server, for logging.
    fn server(&self) -> &str;

    /// Fetch the set of tags the user follows, lowercased.
    async fn followed_tags(&self) -> Result<HashSet<String>>;

    /// Ask the home server to resolve a remote post by URI.
    async fn resolve(&self, uri: &str) -> Result<()>;
}

/// Bearer-authenticated reqwest client for one user's home server.
pub struct HomeServerClient {
    client: reqwest::Client,
    server: String,
    base_url: String,
}

impl HomeServerClient {
    /// Build a client for `server` using `token` as bearer credential.
    ///
    /// `timeout` bounds each whole request, including reading the body.
    pub fn new(server: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .with_context(|| format!("Access token for {server} is not a valid header value"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            server: server.to_string(),
            base_url: server_url(server),
        })
    }
}

/// Parse a followed-tags response body into a lowercase tag set.
///
/// Only the first line is considered; the array is on one line.
pub fn parse_followed_tags(body: &[u8]) -> HashSet<String> {
    let first_line = match extract::find(body, b"\n", 0) {
        Some(end) => &body[..end],
        None => body,
    };
    extract::all_names(first_line)
        .into_iter()
        .map(|name| String::from_utf8_lossy(name).to_lowercase())
        .collect()
}

#[async_trait]
impl HomeServer for HomeServerClient {
    fn server(&self) -> &str {
        &self.server
    }

    async fn followed_tags(&self) -> Result<HashSet<String>> {
        let url = format!("{}/api/v1/followed_tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("followed_tags request to {} failed", self.server))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("followed_tags on {} returned {status}", self.server);
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read followed_tags from {}", self.server))?;

        Ok(parse_followed_tags(&body))
    }

    async fn resolve(&self, uri: &str) -> Result<()> {
        let url = format!("{}/api/v2/search", self.base_url);

        debug!(server = %self.server, uri = uri, "Search request");

        let mut response = self
            .client
            .get(&url)
            .query(&[("q", uri), ("resolve", "True")])
            .send()
            .await
            .with_context(|| format!("search request to {} failed", self.server))?;

        let status = response.status();

        // The resolve happens server-side; the result itself is not needed
        while response
            .chunk()
            .await
            .with_context(|| format!("Failed to read search response from {}", self.server))?
            .is_some()
        {}

        if !status.is_success() {
            anyhow::bail!("search on {} returned {status}", self.server);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_followed_tags_lowercases() {
        let body = br#"[{"name":"Rust","url":"https://a.example/tags/rust","following":true},{"name":"FediDev","url":"https://a.example/tags/fedidev","following":true}]"#;
        let tags = parse_followed_tags(body);
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("rust"));
        assert!(tags.contains("fedidev"));
    }

    #[test]
    fn test_parse_followed_tags_empty_array() {
        assert!(parse_followed_tags(b"[]").is_empty());
        assert!(parse_followed_tags(b"").is_empty());
    }

    #[test]
    fn test_parse_followed_tags_reads_first_line_only() {
        let body = b"[{\"name\":\"one\"}]\n[{\"name\":\"two\"}]";
        let tags = parse_followed_tags(body);
        assert_eq!(tags, HashSet::from(["one".to_string()]));
    }
}
