//! # epstein-search
//!
//! Search client and enrichment pipeline for the DOJ Epstein Library.
//!
//! The library's search endpoint pages through Elasticsearch-style hits, ten
//! at a time. This crate turns that into lazy per-query cursors, merges
//! several `|`-separated queries round-robin with de-duplication, and can
//! download each matching PDF to extract its text and, through an LLM,
//! a list of dated events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ SearchClient │──▶│ ResultStream │──▶│ MultiQueryMerger │
//! │ (pages)      │   │ (per query)  │   │ round-robin      │
//! └──────────────┘   └──────────────┘   └────────┬─────────┘
//!                                                │ records
//!                                                ▼
//!                     ┌────────────────────────────────────┐
//!                     │ EnrichmentPool (N workers)         │
//!                     │ fetch PDF ▶ text ▶ events (LLM)    │
//!                     └────────────────┬───────────────────┘
//!                          ┌───────────┴──────────┐
//!                          ▼                      ▼
//!                     ┌──────────┐          ┌──────────┐
//!                     │   CLI    │          │   MCP    │
//!                     │  (es)    │          │  server  │
//!                     └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! es search "maxwell" -n 20
//! es search "pizza | flights" --json > hits.json
//! es count "flight logs"
//! es text "+flight +logs" -n 3
//! OPENROUTER_API_KEY=... es events "island" -n 5 --json >> events.json
//! es timeline events.json
//! es serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Records, events, and the search wire format |
//! | [`fetcher`] | Page fetching trait and termination rule |
//! | [`client`] | HTTP client for search and document download |
//! | [`stream`] | Lazy per-query result cursor |
//! | [`merge`] | Multi-query round-robin merge |
//! | [`extract`] | Document text extraction |
//! | [`events`] | LLM event extraction |
//! | [`enrich`] | Per-record two-stage enrichment |
//! | [`pool`] | Bounded concurrent enrichment |
//! | [`library`] | Operations shared by CLI and MCP |
//! | [`output`] | Record presentation |
//! | [`timeline`] | Event timeline merging |
//! | [`mcp`] | MCP tool bridge |
//! | [`server`] | MCP transports |

pub mod client;
pub mod config;
pub mod enrich;
pub mod enrich_cmd;
pub mod error;
pub mod events;
pub mod extract;
pub mod fetcher;
pub mod library;
pub mod mcp;
pub mod merge;
pub mod models;
pub mod output;
pub mod pool;
pub mod progress;
pub mod search;
pub mod server;
pub mod stream;
pub mod timeline;

pub use error::{Error, Result};
pub use library::Library;
pub use models::{Event, Record};
