//! Two-stage document enrichment.
//!
//! Stage 1 downloads `record.url` and extracts its text. Stage 2, when
//! requested and Stage 1 produced non-blank text, asks an [`EventExtractor`]
//! for a structured event list. Both stages run for one record inside one
//! call, so a worker owns a record end to end.
//!
//! Failures never discard the record. [`DocumentEnricher::enrich`] always
//! returns the record in whatever state it reached, plus the error that
//! stopped it:
//!
//! | Failure | `text` | `events` |
//! |---------|--------|----------|
//! | download (`Fetch`) | `None` | `None` |
//! | unreadable bytes (`Parse`) | `None` | `None` |
//! | extraction service (`Extraction`) | set | `None` |

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::config::EnrichConfig;
use crate::error::{Error, Result};
use crate::events::{EventExtractor, ExtractionRequest};
use crate::extract::extract_text;
use crate::models::Record;

/// Downloads the binary document behind a record.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fails with [`Error::Fetch`] on transport or HTTP failure.
    async fn fetch_document(&self, url: &str) -> Result<Vec<u8>>;
}

/// What to do with each record, fixed for a whole batch.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub extract_events: bool,
    /// System instructions for the extraction service.
    pub instructions: String,
    /// Query-specific prompt placed before the document text.
    pub prompt_context: String,
    pub model: String,
}

impl EnrichOptions {
    /// Stage 1 only.
    pub fn text_only() -> Self {
        Self {
            extract_events: false,
            instructions: String::new(),
            prompt_context: String::new(),
            model: String::new(),
        }
    }

    /// Stage 1 and Stage 2, prompts rendered for `query`.
    pub fn with_events(config: &EnrichConfig, query: &str, model: Option<&str>) -> Self {
        Self {
            extract_events: true,
            instructions: config.system_prompt.clone(),
            prompt_context: config.prompt_for(query),
            model: model.unwrap_or(&config.model).to_string(),
        }
    }
}

/// A record after enrichment, with the error that interrupted it, if any.
#[derive(Debug, Clone)]
pub struct EnrichOutcome {
    pub record: Record,
    pub error: Option<Error>,
}

impl EnrichOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct DocumentEnricher {
    documents: Arc<dyn DocumentFetcher>,
    /// Set exactly when Stage 2 runs.
    extractor: Option<Arc<dyn EventExtractor>>,
    options: EnrichOptions,
}

impl DocumentEnricher {
    /// Build an enricher.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when events are requested without an
    /// extractor. Raised here so a batch fails before any work starts.
    pub fn new(
        documents: Arc<dyn DocumentFetcher>,
        extractor: Option<Arc<dyn EventExtractor>>,
        options: EnrichOptions,
    ) -> Result<Self> {
        let extractor = if options.extract_events {
            Some(extractor.ok_or_else(|| {
                Error::Configuration(
                    "event extraction requested but no extraction service is configured"
                        .to_string(),
                )
            })?)
        } else {
            None
        };
        Ok(Self {
            documents,
            extractor,
            options,
        })
    }

    /// Run Stage 1 and, if configured, Stage 2 on one record.
    pub async fn enrich(&self, mut record: Record) -> EnrichOutcome {
        let bytes = match self.documents.fetch_document(&record.url).await {
            Ok(bytes) => bytes,
            Err(e) => return failed(record, e),
        };

        // PDF parsing is CPU-bound; a panic inside the parser surfaces as a JoinError.
        let content_type = record.content_type.clone();
        let parsed =
            tokio::task::spawn_blocking(move || extract_text(&bytes, content_type.as_deref()))
                .await;
        let text = match parsed {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return failed(record, e),
            Err(e) => return failed(record, Error::Parse(format!("text extraction aborted: {}", e))),
        };

        let extractor = match self.extractor.as_ref() {
            Some(extractor) if !text.trim().is_empty() => extractor,
            _ => {
                record.text = Some(text);
                return EnrichOutcome {
                    record,
                    error: None,
                };
            }
        };

        let result = extractor
            .extract(ExtractionRequest {
                instructions: &self.options.instructions,
                prompt: &self.options.prompt_context,
                text: &text,
                model: &self.options.model,
            })
            .await;
        record.text = Some(text);

        match result {
            Ok(events) => {
                record.events = Some(events);
                EnrichOutcome {
                    record,
                    error: None,
                }
            }
            Err(e) => failed(record, e),
        }
    }
}

fn failed(record: Record, error: Error) -> EnrichOutcome {
    warn!(filename = %record.filename, url = %record.url, error = %error, "enrichment failed");
    EnrichOutcome {
        record,
        error: Some(error),
    }
}
