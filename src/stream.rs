//! Lazy, page-at-a-time result cursor for one query.
//!
//! A [`ResultStream`] holds at most one page of records. It requests the next
//! page only when the buffered one is drained, and stops after the page that
//! satisfies [`Page::is_last`](crate::fetcher::Page::is_last). Each cursor is
//! independent and starts at page 0.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::models::Record;

pub struct ResultStream {
    fetcher: Arc<dyn PageFetcher>,
    query: String,
    page: u64,
    buffer: VecDeque<Record>,
    finished: bool,
    pages_fetched: u64,
}

impl ResultStream {
    pub fn new(fetcher: Arc<dyn PageFetcher>, query: impl Into<String>) -> Self {
        Self {
            fetcher,
            query: query.into(),
            page: 0,
            buffer: VecDeque::new(),
            finished: false,
            pages_fetched: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of page requests issued so far.
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Next record, `Ok(None)` once the result set is exhausted.
    ///
    /// An upstream failure ends the stream: the error is returned once and
    /// every later call yields `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.finished {
                return Ok(None);
            }

            let page = match self.fetcher.fetch(&self.query, self.page).await {
                Ok(page) => page,
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            };
            self.pages_fetched += 1;

            if page.is_last(self.page, self.fetcher.page_size()) {
                self.finished = true;
            } else {
                self.page += 1;
            }
            self.buffer.extend(page.records);
        }
    }

    /// Drain the remaining records into a Vec.
    pub async fn collect(mut self) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        while let Some(record) = self.next().await? {
            out.push(record);
        }
        Ok(out)
    }
}
