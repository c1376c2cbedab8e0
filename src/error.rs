//! Error taxonomy for retrieval and enrichment.
//!
//! Retrieval failures ([`Error::Upstream`]) abort the whole search, since
//! pagination state can no longer be trusted. Enrichment failures
//! ([`Error::Fetch`], [`Error::Parse`], [`Error::Extraction`]) are scoped to a
//! single record and are reported alongside it. [`Error::Configuration`] is
//! raised once, before any work starts.
//!
//! Application glue (CLI, server, config loading) wraps these in `anyhow`.

/// Errors produced by the search and enrichment core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Search endpoint returned a non-success status or an unreadable body.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Binary document could not be downloaded.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Document bytes could not be turned into text.
    #[error("parse error: {0}")]
    Parse(String),

    /// Structured-extraction service failed or returned schema-violating output.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Required configuration (e.g. an API key) is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;
