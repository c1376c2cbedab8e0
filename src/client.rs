//! HTTP client for the DOJ Epstein Library search API.
//!
//! The library exposes a JSON endpoint (`/multimedia-search`) that powers its
//! web search page. [`SearchClient`] sends the same static browser headers and
//! age-verification cookie the page does, and implements both
//! [`PageFetcher`] (search pages) and [`DocumentFetcher`] (PDF downloads).
//!
//! ```rust,no_run
//! # use epstein_search::client::SearchClient;
//! # use epstein_search::config::SearchConfig;
//! # use epstein_search::fetcher::PageFetcher;
//! # async fn example() -> epstein_search::Result<()> {
//! let client = SearchClient::new(&SearchConfig::default())?;
//! let page = client.fetch("flight logs", 0).await?;
//! println!("{} total hits", page.total);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::debug;

use crate::config::SearchConfig;
use crate::enrich::DocumentFetcher;
use crate::error::{Error, Result};
use crate::fetcher::{Page, PageFetcher};
use crate::models::{Record, WireResponse};

/// Maximum number of response-body bytes echoed into an error message.
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    search_url: String,
    page_size: u64,
}

impl SearchClient {
    /// Build a client with the configured static headers.
    ///
    /// Fails with [`Error::Configuration`] if a header name or value is invalid.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "User-Agent", &config.user_agent)?;
        insert_header(&mut headers, "Accept", "application/json")?;
        insert_header(&mut headers, "Accept-Language", "en-US,en;q=0.9")?;
        insert_header(&mut headers, "Referer", &config.referer)?;
        insert_header(&mut headers, "Sec-Fetch-Dest", "empty")?;
        insert_header(&mut headers, "Sec-Fetch-Mode", "cors")?;
        insert_header(&mut headers, "Sec-Fetch-Site", "same-origin")?;
        if !config.cookie.is_empty() {
            insert_header(&mut headers, "Cookie", &config.cookie)?;
        }
        for (name, value) in &config.extra_headers {
            insert_header(&mut headers, name, value)?;
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            search_url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.endpoint
            ),
            page_size: config.page_size,
        })
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Configuration(format!("invalid header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::Configuration(format!("invalid value for header '{}': {}", name.as_str(), e)))?;
    headers.insert(name, value);
    Ok(())
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[async_trait]
impl PageFetcher for SearchClient {
    async fn fetch(&self, query: &str, page: u64) -> Result<Page> {
        debug!(query, page, "fetching search page");

        let response = self
            .http
            .get(&self.search_url)
            .query(&[("keys", query.to_string()), ("page", page.to_string())])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "search API returned {} for page {}: {}",
                status,
                page,
                preview(&body)
            )));
        }

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("malformed search response: {}", e)))?;

        let total = body.hits.total.value();
        let records = body
            .hits
            .hits
            .into_iter()
            .map(Record::from_hit)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Upstream(format!("malformed search hit: {}", e)))?;

        debug!(query, page, returned = records.len(), total, "search page received");
        Ok(Page { records, total })
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}

#[async_trait]
impl DocumentFetcher for SearchClient {
    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading document");

        let response = self
            .http
            .get(url)
            .header("Accept", "*/*")
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}
