//! Bounded worker pool for document enrichment.
//!
//! The input is materialized up front so the total is known. `workers` tokio
//! tasks pull records from a shared queue, run [`DocumentEnricher::enrich`]
//! on each, and push the outcome into a completion channel. The caller reads
//! outcomes from [`CompletionStream`] in completion order, not input order.
//!
//! There is no timeout or cancellation. If the [`CompletionStream`] is
//! dropped early, records already being enriched run to completion and their
//! outcomes are discarded; idle workers stop pulling new records.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::enrich::{DocumentEnricher, EnrichOutcome};
use crate::models::Record;
use crate::progress::{EnrichProgressEvent, NoProgress, ProgressReporter};

pub struct EnrichmentPool {
    enricher: Arc<DocumentEnricher>,
    workers: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl EnrichmentPool {
    /// `workers` below 1 is treated as 1.
    pub fn new(enricher: Arc<DocumentEnricher>, workers: usize) -> Self {
        Self {
            enricher,
            workers: workers.max(1),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Start enriching `records`. Must be called inside a tokio runtime.
    pub fn run(&self, records: Vec<Record>) -> CompletionStream {
        let total = records.len();
        let worker_count = self.workers.min(total);
        let (tx, receiver) = mpsc::channel(self.workers);
        let queue = Arc::new(Mutex::new(VecDeque::from(records)));
        let completed = Arc::new(AtomicU64::new(0));

        if total > 0 {
            self.progress.report(EnrichProgressEvent::Started {
                total: total as u64,
                workers: worker_count,
            });
        }

        for id in 0..worker_count {
            let worker = Worker {
                id,
                queue: queue.clone(),
                enricher: self.enricher.clone(),
                progress: self.progress.clone(),
                completed: completed.clone(),
                total: total as u64,
                tx: tx.clone(),
            };
            tokio::spawn(worker.run());
        }

        CompletionStream { receiver, total }
    }
}

struct Worker {
    id: usize,
    queue: Arc<Mutex<VecDeque<Record>>>,
    enricher: Arc<DocumentEnricher>,
    progress: Arc<dyn ProgressReporter>,
    completed: Arc<AtomicU64>,
    total: u64,
    tx: mpsc::Sender<EnrichOutcome>,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.tx.is_closed() {
                debug!(worker = self.id, "consumer gone, stopping");
                return;
            }
            let Some(record) = self.queue.lock().await.pop_front() else {
                return;
            };

            let outcome = self.enricher.enrich(record).await;
            let n = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
            self.progress.report(EnrichProgressEvent::Completed {
                n,
                total: self.total,
                filename: outcome.record.filename.clone(),
                failed: !outcome.is_ok(),
            });

            if self.tx.send(outcome).await.is_err() {
                debug!(worker = self.id, "consumer gone, discarding outcome");
                return;
            }
        }
    }
}

/// Enrichment outcomes in completion order.
pub struct CompletionStream {
    receiver: mpsc::Receiver<EnrichOutcome>,
    total: usize,
}

impl CompletionStream {
    /// Next finished record, `None` once every record has been delivered.
    pub async fn next(&mut self) -> Option<EnrichOutcome> {
        self.receiver.recv().await
    }

    /// Number of records submitted.
    pub fn total(&self) -> usize {
        self.total
    }

    pub async fn collect(mut self) -> Vec<EnrichOutcome> {
        let mut out = Vec::with_capacity(self.total);
        while let Some(outcome) = self.next().await {
            out.push(outcome);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::tests::{text_record, FakeDocuments};
    use crate::enrich::{DocumentFetcher, EnrichOptions};
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn text_enricher(docs: impl DocumentFetcher + 'static) -> Arc<DocumentEnricher> {
        Arc::new(DocumentEnricher::new(Arc::new(docs), None, EnrichOptions::text_only()).unwrap())
    }

    /// Tracks how many fetches run at once.
    struct Probe {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Probe {
        fn new(delay: Duration) -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl DocumentFetcher for Arc<Probe> {
        async fn fetch_document(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(b"body".to_vec())
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() {
        let docs = FakeDocuments::new()
            .text("http://docs/r1", "first")
            .text("http://docs/r3", "third");
        let pool = EnrichmentPool::new(text_enricher(docs), 2);
        let records = vec![text_record("r1"), text_record("r2"), text_record("r3")];

        let mut outcomes = pool.run(records).collect().await;
        outcomes.sort_by(|a, b| a.record.document_id.cmp(&b.record.document_id));

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].record.text.as_deref(), Some("first"));
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].record.text.is_none());
        assert!(matches!(outcomes[1].error, Some(Error::Fetch(_))));
        assert_eq!(outcomes[2].record.text.as_deref(), Some("third"));
    }

    #[tokio::test]
    async fn every_record_delivered_exactly_once() {
        let probe = Arc::new(Probe::new(Duration::from_millis(1)));
        let pool = EnrichmentPool::new(text_enricher(probe.clone()), 4);
        let records: Vec<Record> = (0..25).map(|i| text_record(&format!("d{i:02}"))).collect();

        let stream = pool.run(records);
        assert_eq!(stream.total(), 25);
        let mut ids: Vec<String> = stream
            .collect()
            .await
            .into_iter()
            .map(|o| o.record.document_id)
            .collect();
        ids.sort();
        let expected: Vec<String> = (0..25).map(|i| format!("d{i:02}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn concurrency_bounded_by_worker_count() {
        let probe = Arc::new(Probe::new(Duration::from_millis(20)));
        let pool = EnrichmentPool::new(text_enricher(probe.clone()), 3);
        let records: Vec<Record> = (0..12).map(|i| text_record(&format!("d{i}"))).collect();

        let outcomes = pool.run(records).collect().await;
        assert_eq!(outcomes.len(), 12);
        let peak = probe.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeded 3 workers");
        assert!(peak > 1, "workers never overlapped");
    }

    #[tokio::test]
    async fn results_arrive_in_completion_order() {
        let docs = FakeDocuments::new()
            .text("http://docs/slow", "slow")
            .text("http://docs/fast", "fast")
            .delay("http://docs/slow", Duration::from_millis(300));
        let pool = EnrichmentPool::new(text_enricher(docs), 2);

        let mut stream = pool.run(vec![text_record("slow"), text_record("fast")]);
        let first = stream.next().await.unwrap();
        assert_eq!(first.record.document_id, "fast");
        let second = stream.next().await.unwrap();
        assert_eq!(second.record.document_id, "slow");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_input_finishes_immediately() {
        let pool = EnrichmentPool::new(text_enricher(FakeDocuments::new()), 4);
        let mut stream = pool.run(Vec::new());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn dropped_consumer_stops_new_work() {
        let probe = Arc::new(Probe::new(Duration::from_millis(20)));
        let pool = EnrichmentPool::new(text_enricher(probe.clone()), 1);
        let records: Vec<Record> = (0..10).map(|i| text_record(&format!("d{i}"))).collect();

        let mut stream = pool.run(records);
        assert!(stream.next().await.is_some());
        drop(stream);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let calls = probe.calls.load(Ordering::SeqCst);
        assert!(calls < 10, "worker kept pulling after consumer left ({calls} calls)");
    }

    #[tokio::test]
    async fn zero_workers_treated_as_one() {
        let docs = FakeDocuments::new().text("http://docs/a", "a");
        let pool = EnrichmentPool::new(text_enricher(docs), 0);
        let outcomes = pool.run(vec![text_record("a")]).collect().await;
        assert_eq!(outcomes.len(), 1);
    }
}
