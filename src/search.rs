//! `es search` and `es count`.
//!
//! Results are printed as they are pulled from the merger, so the first
//! matches appear while later pages are still being requested.

use anyhow::{bail, Result};

use crate::library::Library;
use crate::merge::parse_queries;
use crate::output::{display_hit, format_plain, format_verbose, JsonArrayWriter};

/// How `es search` prints each record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    /// Encoded URL plus highlight lines.
    Plain,
    /// Every metadata field.
    Verbose,
    /// JSON array of raw upstream hits.
    Json,
}

/// Split a CLI query into terms, rejecting queries with none.
pub(crate) fn query_terms(query: &str) -> Result<Vec<String>> {
    let terms = parse_queries(query);
    if terms.is_empty() {
        bail!("query must not be empty");
    }
    Ok(terms)
}

pub async fn run_search(
    library: &Library,
    query: &str,
    n: usize,
    skip: usize,
    format: OutputFormat,
) -> Result<()> {
    let queries = query_terms(query)?;
    let limit = (n > 0).then_some(n);
    let mut merger = library.search(&queries, limit, skip);

    match format {
        OutputFormat::Json => {
            let mut out = JsonArrayWriter::start(std::io::stdout())?;
            while let Some(record) = merger.next().await? {
                out.push(&display_hit(&record))?;
            }
            out.finish()?;
        }
        OutputFormat::Verbose => {
            while let Some(record) = merger.next().await? {
                print!("{}", format_verbose(&record));
            }
        }
        OutputFormat::Plain => {
            while let Some(record) = merger.next().await? {
                println!("{}", format_plain(&record));
            }
        }
    }
    Ok(())
}

pub async fn run_count(library: &Library, query: &str) -> Result<()> {
    if query.contains('|') {
        bail!("count does not support OR queries");
    }
    let query = query.trim();
    if query.is_empty() {
        bail!("query must not be empty");
    }
    println!("{}", library.count(query).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queries_are_rejected() {
        assert!(query_terms("  ").is_err());
        assert!(query_terms(" | ").is_err());
        assert_eq!(query_terms("a|b").unwrap(), vec!["a", "b"]);
    }
}
