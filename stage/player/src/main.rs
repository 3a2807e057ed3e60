//! Stage Player - Headless Script Runner
//!
//! Loads the stage configuration and an action script, presses Play, and
//! prints the session report plus the final stage snapshot as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Play a script with configured timing
//! stage-player scripts/demo.toml
//!
//! # No delays, reproducible random placement
//! stage-player scripts/demo.toml --step-delay-ms 0 --transient-ms 0 --seed 7
//!
//! # Stream every stage event as a JSON line before the summary
//! stage-player scripts/demo.toml --events
//!
//! # Verbose logging
//! RUST_LOG=debug stage-player scripts/demo.toml
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): stop waiting, print the stage as it stands

mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use stage_core::{
    load_config_from_path, default_config_path, ConcurrentPlayPolicy, ConfigOverrides,
    EventSink, PlayReport, PlaybackScheduler, Stage, StageEvent, StageSnapshot, SwapScope,
};

use script::Script;

/// Stage Player - play sprite-stage action scripts headlessly
#[derive(Parser, Debug)]
#[command(name = "stage-player")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Action script (TOML)
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Configuration file path
    #[arg(short = 'c', long, env = "STAGE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pause after each step, in milliseconds
    #[arg(long, value_name = "MS")]
    step_delay_ms: Option<u64>,

    /// Lifetime of "Say Hello for 1 sec", in milliseconds
    #[arg(long, value_name = "MS")]
    transient_ms: Option<u64>,

    /// Seed for reproducible random placement
    #[arg(long, env = "STAGE_SEED")]
    seed: Option<u64>,

    /// Swap scope on collision (full, pending)
    #[arg(long, value_parser = parse_swap_scope)]
    swap_scope: Option<SwapScope>,

    /// Second-play policy (reject, ignore)
    #[arg(long, value_parser = parse_policy)]
    concurrent_play: Option<ConcurrentPlayPolicy>,

    /// Start with an empty stage instead of Cat / Dog / Penguin
    #[arg(long)]
    no_default_cast: bool,

    /// Print stage events as JSON lines
    #[arg(long)]
    events: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "STAGE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ms) = self.step_delay_ms {
            overrides = overrides.with_step_delay_ms(ms);
        }
        if let Some(ms) = self.transient_ms {
            overrides = overrides.with_transient_message_ms(ms);
        }
        if let Some(seed) = self.seed {
            overrides = overrides.with_random_seed(seed);
        }
        if let Some(scope) = self.swap_scope {
            overrides = overrides.with_swap_scope(scope);
        }
        if let Some(policy) = self.concurrent_play {
            overrides = overrides.with_concurrent_play(policy);
        }
        overrides
    }
}

fn parse_swap_scope(s: &str) -> Result<SwapScope, String> {
    SwapScope::parse(s).ok_or_else(|| format!("unknown swap scope {s:?} (expected full or pending)"))
}

fn parse_policy(s: &str) -> Result<ConcurrentPlayPolicy, String> {
    ConcurrentPlayPolicy::parse(s)
        .ok_or_else(|| format!("unknown policy {s:?} (expected reject or ignore)"))
}

/// What the player prints when it is done
#[derive(Debug, Serialize)]
struct PlayerOutput {
    /// Session results (absent if interrupted)
    report: Option<PlayReport>,
    /// Stage after playback
    stage: StageSnapshot,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("stage_player={level},stage_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    info!(source = %config.source(), "Configuration loaded");

    let script = Script::load(&args.script)
        .with_context(|| format!("Failed to load script {}", args.script.display()))?;

    let stage = Arc::new(if config.default_cast && !args.no_default_cast {
        Stage::with_default_cast()
    } else {
        Stage::new()
    });
    script.apply(&stage).context("Failed to set up stage")?;
    info!(characters = stage.len(), "Stage ready");

    let (event_tx, mut event_rx) = mpsc::channel::<StageEvent>(config.event_buffer);
    let print_events = args.events;
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if print_events {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(error = %e, "Failed to encode event"),
                }
            }
        }
    });

    let scheduler = PlaybackScheduler::new(Arc::clone(&stage), config.playback.clone())
        .with_events(EventSink::new(event_tx));

    let report = tokio::select! {
        result = scheduler.play() => Some(result.context("Play failed")?),
        _ = signal::ctrl_c() => {
            warn!("Interrupted, printing stage as it stands");
            None
        }
    };

    if let Some(report) = &report {
        for warning in report.warnings() {
            warn!(%warning, "Playback warning");
        }
        for runner in report.runners.values() {
            info!(
                character = %runner.character,
                status = %runner.status,
                steps = runner.steps_executed,
                repeats = runner.repeat_passes,
                "Runner finished"
            );
        }
        info!(
            steps = report.total_steps(),
            collisions = report.collisions.len(),
            "Playback complete"
        );
    }

    let snapshot = stage.snapshot();
    drop(scheduler);
    if report.is_some() {
        // Every sender is gone once the runners finished; drain what is left
        printer.await.context("Event printer failed")?;
    } else {
        printer.abort();
    }

    let output = PlayerOutput {
        report,
        stage: snapshot,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to encode output")?
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "stage-player",
            "demo.toml",
            "--step-delay-ms",
            "0",
            "--swap-scope",
            "pending",
            "--concurrent-play",
            "ignore",
            "--events",
        ])
        .unwrap();

        assert_eq!(args.script, PathBuf::from("demo.toml"));
        assert_eq!(args.swap_scope, Some(SwapScope::Pending));
        assert_eq!(args.concurrent_play, Some(ConcurrentPlayPolicy::Ignore));
        assert!(args.events);
        assert!(!args.overrides().is_empty());
    }

    #[test]
    fn test_bad_swap_scope_rejected() {
        let result = Args::try_parse_from(["stage-player", "demo.toml", "--swap-scope", "half"]);
        assert!(result.is_err());
    }
}
