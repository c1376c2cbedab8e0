//! Core data models.
//!
//! [`Record`] is one search hit (a document or a chunk of one) plus whatever
//! enrichment has been attached to it. [`Event`] is one occurrence pulled out
//! of a record's text by the extraction service. The `Wire*` types mirror the
//! search endpoint's JSON response and are only used while parsing a page.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One search hit or document chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Identity used for de-duplication. Opaque.
    pub document_id: String,
    pub filename: String,
    pub url: String,
    pub key: Option<String>,
    pub bucket: Option<String>,

    pub content_type: Option<String>,
    pub file_size: Option<u64>,
    pub total_words: Option<u64>,
    pub total_characters: Option<u64>,

    pub start_page: Option<u64>,
    pub end_page: Option<u64>,

    pub chunk_index: Option<u64>,
    pub total_chunks: Option<u64>,
    pub chunk_size: Option<u64>,
    pub char_start: Option<u64>,
    pub char_end: Option<u64>,
    pub is_chunked: Option<bool>,

    pub processed_at: Option<String>,
    pub indexed_at: Option<String>,
    pub source: Option<String>,

    /// Relevance score as returned by upstream.
    pub score: Option<f64>,
    /// Query-context snippets. `None` when upstream returned none.
    pub highlights: Option<Vec<String>>,
    /// Plain text of the underlying document, set by Stage 1 enrichment.
    pub text: Option<String>,
    /// Structured events, set by Stage 2 enrichment.
    pub events: Option<Vec<Event>>,
    /// The unmodified upstream hit.
    pub raw: Value,
}

impl Record {
    /// Minimal record, mostly useful for tests and fakes.
    pub fn new(
        document_id: impl Into<String>,
        filename: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build a record from one element of `hits.hits`.
    pub fn from_hit(raw: Value) -> Result<Self, serde_json::Error> {
        let hit: WireHit = serde_json::from_value(raw.clone())?;
        let src = hit.source;
        let highlights = Some(hit.highlight).filter(|content| !content.is_empty());

        Ok(Self {
            document_id: src.document_id.unwrap_or_default(),
            filename: src.origin_file_name.unwrap_or_default(),
            url: src.origin_file_uri.unwrap_or_default(),
            key: src.key,
            bucket: src.bucket,
            content_type: src.content_type,
            file_size: src.file_size,
            total_words: src.total_words,
            total_characters: src.total_characters,
            start_page: src.start_page,
            end_page: src.end_page,
            chunk_index: src.chunk_index,
            total_chunks: src.total_chunks,
            chunk_size: src.chunk_size,
            char_start: src.char_start,
            char_end: src.char_end,
            is_chunked: src.is_chunked,
            processed_at: src.processed_at,
            indexed_at: src.indexed_at,
            source: src.source,
            score: hit.score,
            highlights,
            text: None,
            events: None,
            raw,
        })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.start_page, self.end_page) {
            (Some(start), Some(end)) => write!(f, "{} (pages {}-{})", self.filename, start, end),
            _ => write!(f, "{}", self.filename),
        }
    }
}

/// One occurrence extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Brief summary of what happened.
    pub summary: String,
    /// When it happened, as stated in the text.
    pub timestamp: String,
    /// Where it happened, if mentioned.
    #[serde(default)]
    pub location: Option<String>,
}

/// Envelope the extraction service is constrained to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventList {
    pub events: Vec<Event>,
}

// ============ Search endpoint wire format ============

/// Top-level search response: `{ "hits": { "total": .., "hits": [..] } }`.
#[derive(Debug, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub hits: WireHits,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireHits {
    #[serde(default)]
    pub total: WireTotal,
    #[serde(default)]
    pub hits: Vec<Value>,
}

/// Elasticsearch reports totals either as a bare integer or `{ "value": n }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireTotal {
    Count(u64),
    Object {
        #[serde(default)]
        value: u64,
    },
}

impl Default for WireTotal {
    fn default() -> Self {
        WireTotal::Count(0)
    }
}

impl WireTotal {
    pub fn value(&self) -> u64 {
        match self {
            WireTotal::Count(n) => *n,
            WireTotal::Object { value } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireHit {
    #[serde(rename = "_score", default, deserialize_with = "lenient_f64")]
    score: Option<f64>,
    #[serde(rename = "_source", default, deserialize_with = "lenient_source")]
    source: WireSource,
    #[serde(default, deserialize_with = "lenient_highlights")]
    highlight: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSource {
    #[serde(default, deserialize_with = "lenient_string")]
    document_id: Option<String>,
    #[serde(rename = "ORIGIN_FILE_NAME", default, deserialize_with = "lenient_string")]
    origin_file_name: Option<String>,
    #[serde(rename = "ORIGIN_FILE_URI", default, deserialize_with = "lenient_string")]
    origin_file_uri: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    bucket: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    file_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    total_words: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    total_characters: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    start_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    end_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    chunk_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    total_chunks: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    chunk_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    char_start: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    char_end: Option<u64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_chunked: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    processed_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    indexed_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    source: Option<String>,
}

// Upstream metadata is loosely typed. A field of an unexpected type becomes
// `None` instead of failing the hit; `raw` still carries the original value.

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_source<'de, D: Deserializer<'de>>(d: D) -> Result<WireSource, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// `highlight.content`, keeping only the string snippets.
fn lenient_highlights<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    let content = match value.get("content") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    Ok(content)
}
