//! Eventdep CLI
//!
//! Replays a recorded notification trace through an analysis session and
//! writes the resulting dependency graph and activity report.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use eventdep_core::{AnalysisSession, SessionConfig, TraceFormat, TraceReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eventdep")]
#[command(about = "Dependency analysis for event-driven program traces")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and write the dependency graph
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        /// Where to write the DOT graph (stdout when omitted)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Where to write the JSON activity report
        #[arg(long, short = 'r')]
        report: Option<PathBuf>,
    },
    /// Replay a trace and print session statistics as JSON
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Recorded trace file
    trace: PathBuf,
    /// Trace encoding (guessed from the file extension when omitted)
    #[arg(long, short = 'f', value_enum)]
    format: Option<Format>,
    /// Session configuration file (JSON)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Msgpack,
}

impl From<Format> for TraceFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => TraceFormat::JsonLines,
            Format::Msgpack => TraceFormat::MessagePack,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze { input, out, report } => {
            handle_analyze(&input, out.as_deref(), report.as_deref())
        }
        Commands::Stats { input } => handle_stats(&input),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build a session from `input` and replay its trace.
///
/// A trace that ends in a fatal analysis error still yields the session, so
/// whatever was reconstructed before the failure can be written out.
fn replay(input: &InputArgs) -> Result<AnalysisSession> {
    let config = match &input.config {
        Some(path) => SessionConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    let format = input
        .format
        .map(TraceFormat::from)
        .unwrap_or_else(|| TraceFormat::from_path(&input.trace));
    let file = File::open(&input.trace)
        .with_context(|| format!("failed to open trace {}", input.trace.display()))?;
    let reader = TraceReader::new(BufReader::new(file), format);

    let mut session = AnalysisSession::new(config);
    match session.replay(reader) {
        Ok(applied) => info!(applied, trace = %input.trace.display(), "replay complete"),
        Err(e) if session.is_aborted() => {
            warn!("analysis aborted, output covers the trace up to the failure: {}", e)
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to replay {}", input.trace.display()))
        }
    }
    Ok(session)
}

fn handle_analyze(input: &InputArgs, out: Option<&Path>, report: Option<&Path>) -> Result<()> {
    let session = replay(input)?;

    let dot = session.render_dot();
    match out {
        Some(path) => {
            fs::write(path, &dot)
                .with_context(|| format!("failed to write graph {}", path.display()))?;
            info!(path = %path.display(), "graph written");
        }
        None => print!("{}", dot),
    }

    if let Some(path) = report {
        let json = session.activity_report().to_json()?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!(path = %path.display(), "activity report written");
    }

    let stats = session.stats();
    info!(
        events = stats.events,
        data_edges = stats.data_edges,
        control_edges = stats.control_edges,
        uninstrumented_calls = stats.uninstrumented_calls,
        "analysis finished"
    );
    Ok(())
}

fn handle_stats(input: &InputArgs) -> Result<()> {
    let session = replay(input)?;
    let json = session
        .stats()
        .to_json()
        .context("failed to serialize session statistics")?;
    println!("{}", json);
    Ok(())
}
