//! # `es`: search the DOJ Epstein Library
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `es search "<query>"` | List matching documents |
//! | `es count "<query>"` | Print the total hit count |
//! | `es text "<query>"` | Download matches and print their text |
//! | `es events "<query>"` | Extract dated events with an LLM |
//! | `es timeline <file>` | Merge and sort saved events |
//! | `es serve` | Start the MCP server |
//!
//! Queries support exact phrases (`"flight logs"`), wildcards (`maxw*`),
//! required terms (`+flight +logs`) and OR queries (`"pizza | flights"`).
//!
//! ## Examples
//!
//! ```bash
//! es search "maxwell" -n 100
//! es search "flight logs" --json > results.json
//! es events "island" -n 10 --json >> events.json
//! es timeline events.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use epstein_search::config::{self, Config};
use epstein_search::enrich_cmd::{self, EnrichArgs};
use epstein_search::progress::ProgressMode;
use epstein_search::search::{self, OutputFormat};
use epstein_search::{server, timeline, Library};

/// Search the DOJ Epstein Library from the command line.
#[derive(Parser)]
#[command(name = "es", version, about = "Search the DOJ Epstein Library")]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply without one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    log_verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for documents.
    ///
    /// Prints each match's URL and highlighted context.
    Search {
        /// Search query. Separate alternatives with `|`.
        query: String,

        /// Number of results (0 = all).
        #[arg(short = 'n', default_value_t = 0)]
        n: usize,

        /// Skip the first N results.
        #[arg(short, long, default_value_t = 0)]
        skip: usize,

        /// Output the raw hits as a JSON array.
        #[arg(long, short = 'j', conflicts_with = "verbose")]
        json: bool,

        /// Print every metadata field.
        #[arg(long)]
        verbose: bool,
    },

    /// Print the total number of matching documents.
    Count {
        /// Search query. OR queries are not supported.
        query: String,
    },

    /// Download matching documents and print their text.
    Text {
        query: String,

        /// Number of documents (0 = 1).
        #[arg(short = 'n', default_value_t = 1)]
        n: usize,

        #[arg(short, long, default_value_t = 0)]
        skip: usize,

        /// Parallel download workers. Defaults to `[enrich].workers`.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Progress output on stderr. Defaults to human when stderr is a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Extract dated events from matching documents with an LLM.
    ///
    /// Requires the OPENROUTER_API_KEY environment variable.
    Events {
        query: String,

        /// Number of documents (0 = 1).
        #[arg(short = 'n', default_value_t = 1)]
        n: usize,

        #[arg(short, long, default_value_t = 0)]
        skip: usize,

        /// OpenRouter model ID. Defaults to `[enrich].model`.
        #[arg(short, long)]
        model: Option<String>,

        /// Parallel workers. Defaults to `[enrich].workers`.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output `{filename, url, events}` objects as a JSON array.
        #[arg(long, short = 'j')]
        json: bool,

        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Merge and sort events from a file of appended `es events --json` output.
    Timeline {
        file: PathBuf,
    },

    /// Start the MCP server (stdio by default).
    Serve {
        /// Serve Streamable HTTP on `[server].bind` instead of stdio.
        #[arg(long)]
        http: bool,
    },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => "epstein_search=info",
        1 => "epstein_search=debug",
        _ => "epstein_search=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn enrich_args(
    cfg: &Config,
    query: String,
    n: usize,
    skip: usize,
    workers: Option<usize>,
    progress: Option<ProgressMode>,
) -> EnrichArgs {
    EnrichArgs {
        query,
        n,
        skip,
        workers: workers.unwrap_or(cfg.enrich.workers),
        progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_verbosity);

    // Timeline works on local files only.
    if let Commands::Timeline { file } = &cli.command {
        return timeline::run_timeline(file);
    }

    let cfg = config::load_config(cli.config.as_deref())?;
    let library = Library::from_config(cfg.clone())?;

    match cli.command {
        Commands::Search {
            query,
            n,
            skip,
            json,
            verbose,
        } => {
            let format = if json {
                OutputFormat::Json
            } else if verbose {
                OutputFormat::Verbose
            } else {
                OutputFormat::Plain
            };
            search::run_search(&library, &query, n, skip, format).await?;
        }
        Commands::Count { query } => {
            search::run_count(&library, &query).await?;
        }
        Commands::Text {
            query,
            n,
            skip,
            workers,
            progress,
        } => {
            let args = enrich_args(&cfg, query, n, skip, workers, progress);
            enrich_cmd::run_text(&library, &args).await?;
        }
        Commands::Events {
            query,
            n,
            skip,
            model,
            workers,
            json,
            progress,
        } => {
            let args = enrich_args(&cfg, query, n, skip, workers, progress);
            enrich_cmd::run_events(&library, &args, model.as_deref(), json).await?;
        }
        Commands::Serve { http } => {
            if http {
                server::run_http(library).await?;
            } else {
                server::run_stdio(library).await?;
            }
        }
        Commands::Timeline { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
