//! MCP JSON-RPC protocol bridge.
//!
//! Exposes the [`Library`] operations as four MCP tools:
//!
//! | Tool | Arguments | Returns |
//! |------|-----------|---------|
//! | `search` | `query`, `n` = 10, `skip` = 0 | records with metadata and highlights |
//! | `count` | `query` | total hits |
//! | `extract_text` | `query`, `n` = 1, `skip` = 0 | records with full text |
//! | `extract_events` | `query`, `n` = 1, `skip` = 0, `model`, `workers` = 10 | records with events |
//!
//! `n = 0` means every result. Operation failures (upstream errors, missing
//! credentials, bad arguments) come back as tool error results so the client
//! can show them; only an unknown tool name is a protocol error.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::library::Library;
use crate::merge::parse_queries;
use crate::output::record_to_json;

const QUERY_SYNTAX: &str = "Supports exact phrases (\"flight logs\"), wildcards (maxw*), \
    required terms (+flight +logs), and OR queries with | (\"pizza | flights\").";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_search_n")]
    n: usize,
    #[serde(default)]
    skip: usize,
}

#[derive(Debug, Deserialize)]
struct CountArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct ExtractArgs {
    query: String,
    #[serde(default = "default_extract_n")]
    n: usize,
    #[serde(default)]
    skip: usize,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_workers")]
    workers: usize,
}

fn default_search_n() -> usize {
    10
}

fn default_extract_n() -> usize {
    1
}

fn default_workers() -> usize {
    10
}

fn limit(n: usize) -> Option<usize> {
    (n > 0).then_some(n)
}

/// Each MCP session receives a clone of this struct; the library is shared.
#[derive(Clone)]
pub struct McpBridge {
    library: Arc<Library>,
}

impl McpBridge {
    pub fn new(library: Library) -> Self {
        Self {
            library: Arc::new(library),
        }
    }

    /// Descriptors for every tool, in listing order.
    pub fn tools() -> Vec<Tool> {
        vec![
            tool(
                "search",
                "Search the DOJ Epstein Library for documents matching a query.",
                json!({
                    "query": { "type": "string", "description": QUERY_SYNTAX },
                    "n": { "type": "integer", "minimum": 0, "default": 10,
                           "description": "Maximum number of results (0 for all)" },
                    "skip": { "type": "integer", "minimum": 0, "default": 0,
                              "description": "Number of results to skip" }
                }),
            ),
            tool(
                "count",
                "Count the documents matching a query. OR queries with | are not supported.",
                json!({
                    "query": { "type": "string", "description": "Search terms" }
                }),
            ),
            tool(
                "extract_text",
                "Search the library, download the matching PDFs, and extract the full text of each.",
                json!({
                    "query": { "type": "string", "description": QUERY_SYNTAX },
                    "n": { "type": "integer", "minimum": 0, "default": 1,
                           "description": "Maximum number of documents (0 for all)" },
                    "skip": { "type": "integer", "minimum": 0, "default": 0,
                              "description": "Number of results to skip" }
                }),
            ),
            tool(
                "extract_events",
                "Search the library, download PDFs, and use an LLM to extract dated events \
                 (who, what, when, where) from each document. Requires OPENROUTER_API_KEY.",
                json!({
                    "query": { "type": "string", "description": QUERY_SYNTAX },
                    "n": { "type": "integer", "minimum": 0, "default": 1,
                           "description": "Maximum number of documents (0 for all)" },
                    "skip": { "type": "integer", "minimum": 0, "default": 0,
                              "description": "Number of results to skip" },
                    "model": { "type": "string", "description": "OpenRouter model ID" },
                    "workers": { "type": "integer", "minimum": 1, "default": 10,
                                 "description": "Parallel extraction workers" }
                }),
            ),
        ]
    }

    /// Run one tool. `Ok(None)` means no tool has that name.
    pub async fn call(&self, name: &str, args: Value) -> Option<anyhow::Result<Value>> {
        let result = match name {
            "search" => self.search(args).await,
            "count" => self.count(args).await,
            "extract_text" => self.extract_text(args).await,
            "extract_events" => self.extract_events(args).await,
            _ => return None,
        };
        Some(result)
    }

    async fn search(&self, args: Value) -> anyhow::Result<Value> {
        let args: SearchArgs = serde_json::from_value(args)?;
        let queries = parse_queries(&args.query);
        let records = self
            .library
            .search(&queries, limit(args.n), args.skip)
            .collect()
            .await?;
        Ok(Value::Array(records.iter().map(record_to_json).collect()))
    }

    async fn count(&self, args: Value) -> anyhow::Result<Value> {
        let args: CountArgs = serde_json::from_value(args)?;
        if args.query.contains('|') {
            anyhow::bail!("count does not support OR queries");
        }
        Ok(json!(self.library.count(args.query.trim()).await?))
    }

    async fn extract_text(&self, args: Value) -> anyhow::Result<Value> {
        let args: SearchArgs = serde_json::from_value(with_default_n(args, 1))?;
        let pool = self.library.text_pool(self.library.config().enrich.workers)?;
        let queries = parse_queries(&args.query);
        let records = self
            .library
            .search(&queries, limit(args.n), args.skip)
            .collect()
            .await?;
        let outcomes = pool.run(records).collect().await;
        Ok(Value::Array(
            outcomes.iter().map(|o| record_to_json(&o.record)).collect(),
        ))
    }

    async fn extract_events(&self, args: Value) -> anyhow::Result<Value> {
        let args: ExtractArgs = serde_json::from_value(args)?;
        let pool =
            self.library
                .events_pool(&args.query, args.model.as_deref(), args.workers)?;
        let queries = parse_queries(&args.query);
        let records = self
            .library
            .search(&queries, limit(args.n), args.skip)
            .collect()
            .await?;
        let outcomes = pool.run(records).collect().await;
        Ok(Value::Array(
            outcomes.iter().map(|o| record_to_json(&o.record)).collect(),
        ))
    }
}

/// `extract_text` shares `search`'s argument shape but defaults `n` to 1.
fn with_default_n(mut args: Value, n: usize) -> Value {
    if let Value::Object(map) = &mut args {
        map.entry("n").or_insert(json!(n));
    }
    args
}

fn tool(name: &'static str, description: &'static str, properties: Value) -> Tool {
    let mut schema = serde_json::Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), properties);
    schema.insert("required".to_string(), json!(["query"]));

    Tool {
        name: Cow::Borrowed(name),
        title: None,
        description: Some(Cow::Borrowed(description)),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: Some(ToolAnnotations::new().read_only(true)),
        execution: None,
        icons: None,
        meta: None,
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "epstein-search".to_string(),
                title: Some("Epstein Library Search".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Search the DOJ Epstein Library. Use search to find documents, count for \
                 hit totals, extract_text for full document text, and extract_events for \
                 dated events pulled out of each document."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(Self::tools())))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        Self::tools().into_iter().find(|t| t.name == name)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request
            .arguments
            .map(Value::Object)
            .unwrap_or(Value::Object(serde_json::Map::new()));

        match self.call(&request.name, args).await {
            None => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )),
            Some(Ok(result)) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Some(Err(e)) => Ok(CallToolResult::error(vec![Content::text(format!("{:#}", e))])),
        }
    }
}
