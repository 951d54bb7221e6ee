//! `slotplan`: run the slot scheduling engine over JSON from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Schedule a request (stdin → stdout)
//! slotplan schedule < request.json
//!
//! # From file to file, pretty-printed, in a local zone
//! slotplan schedule -i request.json -o schedule.json --pretty --timezone Europe/Dublin
//!
//! # Show the free windows the allocator would see
//! slotplan free -i request.json --buffer 15
//!
//! # Resolve a single time hint
//! slotplan hint "tomorrow afternoon" --now 2026-03-02T08:00:00Z
//! ```
//!
//! Configuration is layered: defaults, `--config FILE` (TOML), `SLOTPLAN_*`
//! environment variables, then flags. Set `RUST_LOG` or pass `--verbose` for logs
//! on stderr.

mod config;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slot_engine::{ScheduleRequest, SlotEngine};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

use crate::config::EngineArgs;

#[derive(Parser)]
#[command(
    name = "slotplan",
    version,
    about = "Place deadline-bound work into free calendar time"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Place every work item of a request and print the schedule
    Schedule {
        /// Input request file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Print the free windows per day for a request
    Free {
        /// Input request file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Resolve a free-text time hint to a target instant
    Hint {
        /// The hint, e.g. "thursday evening" or "2026-03-05 14:00"
        text: String,
        /// Reference time (RFC 3339)
        #[arg(long)]
        now: DateTime<Utc>,
        /// Hints resolving after this instant are ignored (RFC 3339)
        #[arg(long)]
        deadline: Option<DateTime<Utc>>,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Commands::Schedule {
            input,
            output,
            pretty,
            engine,
        } => {
            let engine = build_engine(&engine)?;
            let request = read_request(input.as_deref())?;
            let schedule = engine
                .schedule(&request)
                .context("Failed to schedule request")?;
            write_output(output.as_deref(), &to_json(&schedule, pretty)?)?;
        }
        Commands::Free {
            input,
            output,
            pretty,
            engine,
        } => {
            let engine = build_engine(&engine)?;
            let request = read_request(input.as_deref())?;
            let days = engine
                .free_windows(&request)
                .context("Failed to build free windows")?;
            write_output(output.as_deref(), &to_json(&days, pretty)?)?;
        }
        Commands::Hint {
            text,
            now,
            deadline,
            engine,
        } => {
            let engine = build_engine(&engine)?;
            let deadline = deadline.unwrap_or(DateTime::<Utc>::MAX_UTC);
            let resolved = engine.resolve_hint(&text, now, deadline);
            write_output(None, &to_json(&resolved, false)?)?;
        }
    }

    Ok(())
}

fn build_engine(args: &EngineArgs) -> Result<SlotEngine> {
    let config = config::load(args)?;
    let engine = SlotEngine::new(config).context("Invalid engine configuration")?;
    tracing::debug!(
        timezone = %engine.timezone(),
        buffer_minutes = engine.config().buffer_minutes,
        "engine ready"
    );
    Ok(engine)
}

fn read_request(path: Option<&str>) -> Result<ScheduleRequest> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse schedule request JSON")
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
