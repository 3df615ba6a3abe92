mod config;
mod ingest;
mod input;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use planlog_core::MarkerLayout;
use planlog_local_db::PlanDb;
use planlog_local_store::FileTreeSink;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::ingest::{ingest, RunSummary};

#[derive(Parser)]
#[command(
    name = "planlog",
    version,
    about = "Extract auto_explain query plans from database server logs"
)]
struct Cli {
    /// The log file to extract plans from. Plain text or gzip.
    input: PathBuf,

    /// Database to write plans to (`sqlite://<path>`, `sqlite:<path>`, `:memory:`
    /// or a file path). Without it, plans are written as files.
    #[arg(long)]
    dsn: Option<String>,

    /// Root directory for plan files [default: plans]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Marker line grammar: `positional` or `key-value` [default: positional]
    #[arg(long)]
    layout: Option<MarkerLayout>,

    /// Token that marks the start of a plan [default: plan:]
    #[arg(long, value_name = "TOKEN")]
    marker: Option<String>,

    /// Do not persist plans whose body is empty
    #[arg(long)]
    skip_empty: bool,

    /// TOML file with [extract] and [output] settings. Flags take precedence.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,planlog=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(layout) = cli.layout {
        config.extract.layout = layout;
    }
    if let Some(marker) = cli.marker {
        anyhow::ensure!(!marker.trim().is_empty(), "--marker must not be empty");
        config.extract.marker = marker;
    }
    if cli.skip_empty {
        config.extract.skip_empty = true;
    }
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }

    let log = input::read_log(&cli.input)?;
    info!(
        "Read {} ({} bytes{})",
        cli.input.display(),
        log.text.len(),
        if log.gzipped { ", gzip" } else { "" }
    );

    let options = config.extract_options();
    let skip_empty = config.extract.skip_empty;

    let summary: RunSummary = match cli.dsn.as_deref() {
        Some(dsn) => {
            let mut db = PlanDb::connect(dsn).context("failed to open plan database")?;
            let summary = ingest(&log.text, options, skip_empty, &mut db)
                .context("failed to store plan")?;
            let stored = db.count_plans().context("failed to count stored plans")?;
            info!("{stored} plan(s) now stored in the database");
            db.close().context("failed to close plan database")?;
            summary
        }
        None => {
            let mut sink = FileTreeSink::new(&config.output.dir);
            info!("Writing plans under {}", sink.root().display());
            ingest(&log.text, options, skip_empty, &mut sink).context("failed to write plan")?
        }
    };

    if cli.json {
        println!("{}", output::render_summary_json(&summary)?);
    } else {
        print!("{}", output::render_summary(&summary, &cli.input));
    }
    Ok(())
}
