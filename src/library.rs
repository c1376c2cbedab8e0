//! High-level operations over the search endpoint.
//!
//! [`Library`] bundles the configured backends and exposes the four
//! operations shared by the CLI and the MCP server: search, count, and the
//! two enrichment modes. The backends are trait objects so tests can swap in
//! fakes or point the real client at a mock server.

use std::sync::Arc;

use crate::client::SearchClient;
use crate::config::Config;
use crate::enrich::{DocumentEnricher, DocumentFetcher, EnrichOptions};
use crate::error::Result;
use crate::events::{EventExtractor, OpenRouterExtractor};
use crate::fetcher::{self, PageFetcher};
use crate::merge::MultiQueryMerger;
use crate::pool::EnrichmentPool;

#[derive(Clone)]
pub struct Library {
    config: Arc<Config>,
    pages: Arc<dyn PageFetcher>,
    documents: Arc<dyn DocumentFetcher>,
    /// Overrides the OpenRouter extractor built from the environment.
    extractor: Option<Arc<dyn EventExtractor>>,
}

impl Library {
    /// Use the real HTTP client for both search and document download.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = Arc::new(SearchClient::new(&config.search)?);
        Ok(Self {
            config: Arc::new(config),
            pages: client.clone(),
            documents: client,
            extractor: None,
        })
    }

    pub fn with_backends(
        config: Config,
        pages: Arc<dyn PageFetcher>,
        documents: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pages,
            documents,
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn EventExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Merged, de-duplicated cursor over `queries`. `limit` of `None` means all.
    pub fn search(&self, queries: &[String], limit: Option<usize>, skip: usize) -> MultiQueryMerger {
        MultiQueryMerger::new(self.pages.clone(), queries, limit, skip)
    }

    /// Total hit count for a single query.
    pub async fn count(&self, query: &str) -> Result<u64> {
        fetcher::count(self.pages.as_ref(), query).await
    }

    /// Pool that downloads documents and extracts their text.
    pub fn text_pool(&self, workers: usize) -> Result<EnrichmentPool> {
        let enricher =
            DocumentEnricher::new(self.documents.clone(), None, EnrichOptions::text_only())?;
        Ok(EnrichmentPool::new(Arc::new(enricher), workers))
    }

    /// Pool that also extracts events, with prompts focused on `query`.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::error::Error::Configuration) when no
    /// extraction credential is available. Nothing has been fetched yet.
    pub fn events_pool(
        &self,
        query: &str,
        model: Option<&str>,
        workers: usize,
    ) -> Result<EnrichmentPool> {
        let extractor: Arc<dyn EventExtractor> = match &self.extractor {
            Some(extractor) => extractor.clone(),
            None => Arc::new(OpenRouterExtractor::from_env(&self.config.enrich)?),
        };
        let options = EnrichOptions::with_events(&self.config.enrich, query, model);
        let enricher = DocumentEnricher::new(self.documents.clone(), Some(extractor), options)?;
        Ok(EnrichmentPool::new(Arc::new(enricher), workers))
    }
}
