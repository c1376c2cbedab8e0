//! TOML configuration.
//!
//! Every section is optional; a missing config file yields [`Config::default`].
//! The OpenRouter credential is never read from the file, only from the
//! `OPENROUTER_API_KEY` environment variable (see [`crate::events`]).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Records per upstream page. Used only by the termination rule.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_cookie")]
    pub cookie: String,
    /// Additional static headers sent with every request.
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            cookie: default_cookie(),
            extra_headers: BTreeMap::new(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.justice.gov".to_string()
}
fn default_endpoint() -> String {
    "/multimedia-search".to_string()
}
fn default_page_size() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36"
        .to_string()
}
fn default_referer() -> String {
    "https://www.justice.gov/epstein/search".to_string()
}
fn default_cookie() -> String {
    "justiceGovAgeVerified=true".to_string()
}
fn default_search_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_enrich_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Prepended to the document text. `{query}` is replaced with the search query.
    #[serde(default = "default_user_prompt")]
    pub user_prompt: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            workers: default_workers(),
            timeout_secs: default_enrich_timeout_secs(),
            system_prompt: default_system_prompt(),
            user_prompt: default_user_prompt(),
        }
    }
}

impl EnrichConfig {
    /// Render the user prompt for a query.
    pub fn prompt_for(&self, query: &str) -> String {
        self.user_prompt.replace("{query}", query)
    }
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_model() -> String {
    "deepseek/deepseek-chat-v3-0324".to_string()
}
fn default_workers() -> usize {
    10
}
fn default_enrich_timeout_secs() -> u64 {
    120
}
fn default_system_prompt() -> String {
    "Extract events from legal documents to assist a criminal investigation. \
     Be objective: report only what the document states. \
     Focus on interactions between people: meetings, calls, trips, transactions, communications. \
     Flag suspected code words or euphemisms in quotes. \
     Format: '[Person] [action] [details]' (10-25 words). \
     Timestamps: use full dates (MM/DD/YYYY) when available, otherwise the most precise reference in the text. \
     Include location if mentioned. Require both an actor and a time reference. \
     Skip boilerplate and procedural language."
        .to_string()
}
fn default_user_prompt() -> String {
    "Extract events related to '{query}' from the following document. \
     Focus on events relevant to the search term. \
     For each event, identify WHO did WHAT and WHEN:\n\n"
        .to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

/// Load configuration from `path`, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_config(&content)?
        }
        None => Config::default(),
    };
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    if config.search.base_url.trim().is_empty() {
        bail!("search.base_url must not be empty");
    }
    if config.search.page_size == 0 {
        bail!("search.page_size must be > 0");
    }
    if config.search.timeout_secs == 0 {
        bail!("search.timeout_secs must be > 0");
    }
    if config.enrich.workers == 0 {
        bail!("enrich.workers must be >= 1");
    }
    if config.enrich.timeout_secs == 0 {
        bail!("enrich.timeout_secs must be > 0");
    }
    if config.enrich.model.trim().is_empty() {
        bail!("enrich.model must not be empty");
    }
    Ok(())
}
