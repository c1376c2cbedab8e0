//! Round-robin merge of several query streams.
//!
//! # Algorithm
//!
//! With one query, the merger is a plain skip/limit window over that query's
//! [`ResultStream`]. With several, it runs rounds over the still-open streams
//! in query order, pulling one record from each:
//!
//! 1. An exhausted stream is removed from the active set.
//! 2. A record whose `document_id` was already seen (any stream, any round)
//!    is dropped without touching the skip or limit budget.
//! 3. Otherwise the id is marked seen, and the record either consumes one unit
//!    of skip budget or is yielded and consumes one unit of limit budget.
//! 4. Once the limit budget hits zero the merger stops, abandoning whatever
//!    the other streams had pending.
//!
//! Given the same query order and an unchanged corpus, the output order is
//! deterministic.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::models::Record;
use crate::stream::ResultStream;

/// Split a `|`-separated query into trimmed, non-empty terms.
///
/// `"pizza | flights"` → `["pizza", "flights"]`.
pub fn parse_queries(query: &str) -> Vec<String> {
    query
        .split('|')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct MultiQueryMerger {
    /// Active cursors in query order. Exhausted ones are removed.
    streams: Vec<ResultStream>,
    /// Index into `streams` of the next stream to pull in the current round.
    cursor: usize,
    seen: HashSet<String>,
    dedup: bool,
    skip: usize,
    remaining: Option<usize>,
}

impl MultiQueryMerger {
    /// Open one stream per query.
    ///
    /// `limit` of `None` (or `Some(0)`) means no limit.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        queries: &[String],
        limit: Option<usize>,
        skip: usize,
    ) -> Self {
        let streams: Vec<ResultStream> = queries
            .iter()
            .map(|q| ResultStream::new(fetcher.clone(), q.clone()))
            .collect();
        Self {
            dedup: streams.len() > 1,
            streams,
            cursor: 0,
            seen: HashSet::new(),
            skip,
            remaining: limit.filter(|n| *n > 0),
        }
    }

    /// Next record of the merged window, `Ok(None)` when done.
    ///
    /// An upstream error from any stream aborts the whole merge.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if self.remaining == Some(0) || self.streams.is_empty() {
                return Ok(None);
            }
            if self.cursor >= self.streams.len() {
                self.cursor = 0;
            }

            let pulled = match self.streams[self.cursor].next().await {
                Ok(pulled) => pulled,
                Err(e) => {
                    self.streams.clear();
                    return Err(e);
                }
            };

            let Some(record) = pulled else {
                // The next stream slides into this slot, so the cursor stays put.
                let done = self.streams.remove(self.cursor);
                debug!(query = done.query(), pages = done.pages_fetched(), "query exhausted");
                continue;
            };
            self.cursor += 1;

            if self.dedup && !self.seen.insert(record.document_id.clone()) {
                continue;
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if let Some(n) = self.remaining.as_mut() {
                *n -= 1;
            }
            return Ok(Some(record));
        }
    }

    /// Drain the merged window into a Vec.
    pub async fn collect(mut self) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        while let Some(record) = self.next().await? {
            out.push(record);
        }
        Ok(out)
    }
}

/// Convenience wrapper: merge `queries` and collect the window.
pub async fn merge(
    fetcher: Arc<dyn PageFetcher>,
    queries: &[String],
    limit: Option<usize>,
    skip: usize,
) -> Result<Vec<Record>> {
    MultiQueryMerger::new(fetcher, queries, limit, skip)
        .collect()
        .await
}
