//! Enrichment progress reporting.
//!
//! `es text` and `es events` download and parse documents concurrently, which
//! can take a while. Progress goes to **stderr** so stdout stays parseable
//! when piped into `jq` or `es timeline`.

use std::io::Write;

/// A single progress event for an enrichment batch.
#[derive(Clone, Debug)]
pub enum EnrichProgressEvent {
    /// Work has been handed to the pool.
    Started { total: u64, workers: usize },
    /// One record finished, successfully or not.
    Completed {
        n: u64,
        total: u64,
        filename: String,
        failed: bool,
    },
}

/// Reports enrichment progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: EnrichProgressEvent);
}

/// Human-friendly progress: "enrich  12 / 40 documents  EFTA00012.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: EnrichProgressEvent) {
        let line = match &event {
            EnrichProgressEvent::Started { total, workers } => {
                format!(
                    "enrich  {} documents on {} workers\n",
                    format_number(*total),
                    workers
                )
            }
            EnrichProgressEvent::Completed {
                n,
                total,
                filename,
                failed,
            } => {
                let status = if *failed { "  (failed)" } else { "" };
                format!(
                    "enrich  {} / {} documents  {}{}\n",
                    format_number(*n),
                    format_number(*total),
                    filename,
                    status
                )
            }
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: EnrichProgressEvent) {
        let obj = match &event {
            EnrichProgressEvent::Started { total, workers } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": total,
                "workers": workers
            }),
            EnrichProgressEvent::Completed {
                n,
                total,
                filename,
                failed,
            } => serde_json::json!({
                "event": "progress",
                "phase": "completed",
                "n": n,
                "total": total,
                "filename": filename,
                "failed": failed
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: EnrichProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
