//! Headless decision engine runner.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read snapshots from stdin
//! cargo run -p swarm_headless
//!
//! # Use a tuned config and a fixed seed
//! cargo run -p swarm_headless -- --config bot.ron --seed 7 run
//!
//! # Verify determinism over a recorded game
//! cargo run -p swarm_headless -- verify --script game.json --runs 8
//!
//! # Print the default config as RON
//! cargo run -p swarm_headless -- show-config
//! ```

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use swarm_core::config::EngineConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swarm_headless::{config_file, runner::SessionRunner, verify};

#[derive(Parser)]
#[command(name = "swarm_headless")]
#[command(about = "Headless decision engine for the swarm territory game")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config file (RON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the config seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer snapshots from stdin until quit
    Run,

    /// Verify determinism by deciding a recorded game multiple times
    Verify {
        /// JSON array of snapshots
        #[arg(short, long)]
        script: PathBuf,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: usize,
    },

    /// Print the default config as RON
    ShowConfig,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Verify { script, runs }) => {
            cmd_verify(&load_config(cli.config.as_deref(), cli.seed), &script, runs);
        }
        Some(Commands::ShowConfig) => {
            cmd_show_config();
        }
        Some(Commands::Run) | None => {
            cmd_run(load_config(cli.config.as_deref(), cli.seed));
        }
    }
}

/// Resolve the config or exit.
fn load_config(path: Option<&Path>, seed: Option<u64>) -> EngineConfig {
    match config_file::resolve(path, seed) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Serve the JSON-lines protocol on stdin/stdout
fn cmd_run(config: EngineConfig) {
    tracing::info!(seed = config.seed, movement = ?config.movement, "Starting session");

    let mut runner = match SessionRunner::new(config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout().lock()) {
        tracing::error!(error = %e, "Session aborted");
        std::process::exit(1);
    }
}

/// Verify determinism over a recorded game
fn cmd_verify(config: &EngineConfig, script: &Path, runs: usize) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        script.display(),
        config.seed,
        runs
    );

    let snapshots = match verify::load_script(script) {
        Ok(snapshots) => snapshots,
        Err(e) => {
            eprintln!("Failed to load script: {e}");
            std::process::exit(1);
        }
    };

    match verify::verify(config, &snapshots, runs) {
        Ok(report) if report.is_deterministic => {
            eprintln!(
                "PASS: All {} runs produced identical results over {} ticks",
                runs, report.ticks
            );
            if let Some(hash) = report.hashes.first() {
                eprintln!("  Hash: {hash:016x}");
            }
        }
        Ok(report) => {
            eprintln!("FAIL: Non-determinism detected!");
            for (run, hash) in report.hashes.iter().enumerate() {
                eprintln!("  Run {run}: {hash:016x}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {e}");
            std::process::exit(1);
        }
    }
}

/// Print the default config
fn cmd_show_config() {
    match EngineConfig::default().to_ron_string() {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Failed to render config: {e}");
            std::process::exit(1);
        }
    }
}
