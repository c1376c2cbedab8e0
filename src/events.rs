//! Structured event extraction via an LLM.
//!
//! Defines the [`EventExtractor`] trait and the OpenRouter implementation.
//! The request carries the system instructions, a query-focused user prompt
//! followed by the document text, and a JSON schema that constrains the reply
//! to `{ "events": [{ "summary", "timestamp", "location"? }] }`. Anything that
//! does not parse into that shape is an [`Error::Extraction`].
//!
//! The API key is read from `OPENROUTER_API_KEY` once, when the extractor is
//! built. It is sent only in the `Authorization` header and never logged.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::EnrichConfig;
use crate::error::{Error, Result};
use crate::models::{Event, EventList};

/// Environment variable holding the OpenRouter credential.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// One extraction call.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// System instructions.
    pub instructions: &'a str,
    /// User prompt placed before the document text.
    pub prompt: &'a str,
    /// Document text.
    pub text: &'a str,
    /// Model identifier.
    pub model: &'a str,
}

/// Turns document text into a list of events.
#[async_trait]
pub trait EventExtractor: Send + Sync {
    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Vec<Event>>;
}

/// JSON schema the model's reply must follow.
pub fn event_list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "description": "List of events extracted from the document",
                "items": {
                    "type": "object",
                    "properties": {
                        "summary": {
                            "type": "string",
                            "description": "Brief summary of what happened"
                        },
                        "timestamp": {
                            "type": "string",
                            "description": "When it happened (date, time, or date range as stated in the text)"
                        },
                        "location": {
                            "type": ["string", "null"],
                            "description": "Where it happened, if mentioned in the text"
                        }
                    },
                    "required": ["summary", "timestamp", "location"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["events"],
        "additionalProperties": false
    })
}

// ============ OpenRouter ============

pub struct OpenRouterExtractor {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for OpenRouterExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterExtractor")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenRouterExtractor {
    /// Build from config, reading the key from [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the variable is unset or empty.
    pub fn from_env(config: &EnrichConfig) -> Result<Self> {
        Self::with_key(config, std::env::var(API_KEY_ENV).ok())
    }

    pub fn with_key(config: &EnrichConfig, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "{} environment variable is required for event extraction",
                    API_KEY_ENV
                ))
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl EventExtractor for OpenRouterExtractor {
    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<Vec<Event>> {
        let body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.instructions },
                { "role": "user", "content": format!("{}{}", request.prompt, request.text) },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "event_list",
                    "strict": true,
                    "schema": event_list_schema(),
                }
            }
        });

        debug!(model = request.model, chars = request.text.len(), "requesting event extraction");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("extraction service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "extraction service error {}: {}",
                status,
                body_text.chars().take(200).collect::<String>()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("invalid completion response: {}", e)))?;

        parse_completion(&json)
    }
}

/// Pull the event list out of a chat-completion response.
fn parse_completion(json: &serde_json::Value) -> Result<Vec<Event>> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| Error::Extraction("completion has no message content".to_string()))?;

    parse_event_list(content)
}

/// Parse and validate the model's JSON reply.
pub fn parse_event_list(content: &str) -> Result<Vec<Event>> {
    let list: EventList = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| Error::Extraction(format!("reply does not match event schema: {}", e)))?;

    if let Some(pos) = list.events.iter().position(|e| e.summary.trim().is_empty()) {
        return Err(Error::Extraction(format!("event {} has an empty summary", pos)));
    }
    Ok(list
        .events
        .into_iter()
        .map(|mut e| {
            e.location = e.location.filter(|l| !l.trim().is_empty());
            e
        })
        .collect())
}

/// Some models wrap JSON in a Markdown fence even in structured mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
