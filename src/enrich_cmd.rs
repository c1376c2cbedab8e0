//! `es text` and `es events`.
//!
//! Both search first, then run the matches through an [`EnrichmentPool`].
//! Records are printed in completion order. `-n 0` processes a single
//! document here, since downloading the whole result set by accident is
//! expensive.

use anyhow::Result;
use std::sync::Arc;

use crate::enrich::EnrichOutcome;
use crate::library::Library;
use crate::output::{events_entry, format_events, format_text, JsonArrayWriter};
use crate::pool::{CompletionStream, EnrichmentPool};
use crate::progress::ProgressMode;
use crate::search::query_terms;

/// Window and pool settings shared by both commands.
#[derive(Clone, Debug)]
pub struct EnrichArgs {
    pub query: String,
    pub n: usize,
    pub skip: usize,
    pub workers: usize,
    pub progress: ProgressMode,
}

async fn start(library: &Library, pool: EnrichmentPool, args: &EnrichArgs) -> Result<CompletionStream> {
    let queries = query_terms(&args.query)?;
    let records = library
        .search(&queries, Some(args.n.max(1)), args.skip)
        .collect()
        .await?;
    let pool = pool.with_progress(Arc::from(args.progress.reporter()));
    Ok(pool.run(records))
}

fn report_failures(failed: usize, total: usize) {
    if failed > 0 {
        eprintln!("Warning: {} of {} documents could not be fully processed", failed, total);
    }
}

pub async fn run_text(library: &Library, args: &EnrichArgs) -> Result<()> {
    let pool = library.text_pool(args.workers)?;
    let mut stream = start(library, pool, args).await?;

    let mut failed = 0;
    while let Some(outcome) = stream.next().await {
        failed += usize::from(!outcome.is_ok());
        print!("{}", format_text(&outcome.record));
    }
    report_failures(failed, stream.total());
    Ok(())
}

pub async fn run_events(
    library: &Library,
    args: &EnrichArgs,
    model: Option<&str>,
    json: bool,
) -> Result<()> {
    // Fails on a missing credential before anything is searched or downloaded.
    let pool = library.events_pool(&args.query, model, args.workers)?;
    let mut stream = start(library, pool, args).await?;

    let mut failed = 0;
    let mut count = |outcome: &EnrichOutcome| failed += usize::from(!outcome.is_ok());

    if json {
        let mut out = JsonArrayWriter::start(std::io::stdout())?;
        while let Some(outcome) = stream.next().await {
            count(&outcome);
            if let Some(entry) = events_entry(&outcome.record) {
                out.push(&entry)?;
            }
        }
        out.finish()?;
    } else {
        while let Some(outcome) = stream.next().await {
            count(&outcome);
            print!("{}", format_events(&outcome.record));
        }
    }
    report_failures(failed, stream.total());
    Ok(())
}
