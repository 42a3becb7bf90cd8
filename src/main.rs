//! NIP-13 Miner CLI
//!
//! Reads one Nostr event as JSON on stdin, mines a nonce tag into it and
//! prints the result as one line of JSON on stdout.
//!
//! # Commands
//!
//! - *(none)* - Mine the event read from stdin
//! - `list-devices` - Show available compute backends
//! - `benchmark` - Find the fastest batch size for a device
//! - `cross-check` - Check that all kernel variants agree

use std::io::{self, Read};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use nip13::backend;
use nip13::config::{
    BatchSizeSpec, DeviceSelector, KernelSelector, MinerConfig, DEFAULT_DIFFICULTY,
};
use nip13::diagnostics::{self, BenchmarkConfig};
use nip13::logging;
use nip13::progress::ProgressLine;
use nip13::{Event, MineError, SearchContext, Session};

/// Difficulty used by `cross-check` unless one is given
const CROSS_CHECK_DIFFICULTY: u32 = 8;

/// Exit status when kernel variants disagree
const EXIT_MISMATCH: i32 = 3;

#[derive(Parser)]
#[command(name = "nip13-miner")]
#[command(version)]
#[command(about = "NIP-13 proof-of-work miner for Nostr events")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Required leading zero bits in the event id (default: 16)
    #[arg(long, global = true)]
    difficulty: Option<u32>,

    /// Nonces per batch as a power of ten (0-10), or auto
    #[arg(long, global = true, default_value = "auto", allow_hyphen_values = true)]
    batch_size: BatchSizeSpec,

    /// Device index from list-devices, or auto
    #[arg(short, long, global = true, default_value = "auto", allow_hyphen_values = true)]
    device: DeviceSelector,

    /// Kernel variant: auto, generic or midstate
    #[arg(long, global = true, default_value = "auto")]
    kernel: KernelSelector,

    /// Number of CPU worker threads (default: number of CPU cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available compute devices
    ListDevices,

    /// Sweep batch sizes and recommend the fastest
    Benchmark {
        /// Seconds per run
        #[arg(long, default_value = "5")]
        duration: u64,

        /// Runs per batch size, each on a fresh random event
        #[arg(long, default_value = "3")]
        runs: u32,
    },

    /// Mine random events with every kernel variant and compare the results
    CrossCheck {
        /// Number of random events
        #[arg(long, default_value = "10")]
        events: usize,
    },
}

impl Cli {
    fn config(&self, default_difficulty: u32) -> MinerConfig {
        MinerConfig {
            difficulty: self.difficulty.unwrap_or(default_difficulty),
            batch_size: self.batch_size,
            device: self.device,
            kernel: self.kernel,
            threads: self.threads,
            verbose: self.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let code = logging::scoped(cli.verbose, || match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<MineError>()
                .map_or(1, MineError::exit_code)
        }
    });

    std::process::exit(code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    match cli.command {
        None => cmd_mine(&cli.config(DEFAULT_DIFFICULTY)),
        Some(Commands::ListDevices) => cmd_list_devices(&cli.config(DEFAULT_DIFFICULTY)),
        Some(Commands::Benchmark { duration, runs }) => {
            cmd_benchmark(&cli.config(DEFAULT_DIFFICULTY), duration, runs)
        }
        Some(Commands::CrossCheck { events }) => {
            cmd_cross_check(&cli.config(CROSS_CHECK_DIFFICULTY), events)
        }
    }
}

fn log_config(config: &MinerConfig) -> anyhow::Result<()> {
    debug!("Configuration: {}", serde_json::to_string(config)?);
    Ok(())
}

fn cmd_mine(config: &MinerConfig) -> anyhow::Result<i32> {
    log_config(config)?;

    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("Failed to read event from stdin")?;
    let event = Event::from_json(&input).context("Failed to parse event JSON")?;

    let mut session = Session::open(config)?;

    let mut line = ProgressLine::new(io::stderr());
    let solution = {
        let mut ctx = SearchContext::new(&mut line);
        session.miner(config.difficulty).mine(&event, &mut ctx)?
    };

    debug!(
        nonce = solution.nonce,
        tested = solution.tested,
        rejected = solution.rejected,
        elapsed = ?solution.elapsed,
        "Found nonce"
    );
    println!("{}", solution.event.to_json_line()?);

    Ok(0)
}

fn cmd_list_devices(config: &MinerConfig) -> anyhow::Result<i32> {
    config.validate()?;
    let backends = backend::enumerate(config.worker_threads());
    diagnostics::list_devices(&backends, &mut io::stdout().lock())?;
    Ok(0)
}

fn cmd_benchmark(config: &MinerConfig, duration: u64, runs: u32) -> anyhow::Result<i32> {
    log_config(config)?;
    let mut session = Session::open(config)?;

    let bench = BenchmarkConfig {
        runs: runs.max(1),
        duration: Duration::from_secs(duration),
        difficulty: config.difficulty,
        ..Default::default()
    };
    diagnostics::run_benchmark(
        session.backend.as_mut(),
        session.variant,
        &bench,
        &mut io::stdout().lock(),
    )?;

    Ok(0)
}

fn cmd_cross_check(config: &MinerConfig, events: usize) -> anyhow::Result<i32> {
    log_config(config)?;
    let mut session = Session::open(config)?;

    let report = diagnostics::cross_check(
        session.backend.as_mut(),
        events,
        config.difficulty,
        session.batch_size,
        &mut io::stdout().lock(),
    )?;

    Ok(if report.passed() { 0 } else { EXIT_MISMATCH })
}
