//! Diagnostic modes: device listing, batch-size benchmark and kernel
//! cross-check

use std::io::{self, Write};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::algorithm::{max_nonce_for_width, pow10, KernelParams, KernelVariant, MAX_MESSAGE_LEN};
use crate::backend::{Backend, BackendInfo};
use crate::batch_size;
use crate::error::{BackendError, ConfigError, MineError};
use crate::event::{locate_nonce_placeholder, Event};
use crate::miner::{Miner, SearchContext, WidthRange, MIN_MAX_NONCE_WIDTH};
use crate::validate::validate_event;

/// Print every backend with its capabilities.
pub fn list_devices<W: Write>(backends: &[BackendInfo], out: &mut W) -> io::Result<()> {
    if backends.is_empty() {
        writeln!(out, "No compute devices found")?;
        return Ok(());
    }

    for (index, info) in backends.iter().enumerate() {
        writeln!(out, "[{}] {} ({}) - {}", index, info.name, info.vendor, info.caps.class)?;
        if let Some(platform) = &info.platform {
            writeln!(out, "     Platform: {}", platform)?;
        }
        writeln!(out, "     Version: {}", info.version)?;

        let group = info
            .caps
            .group_size
            .map_or_else(|| "-".to_string(), |g| g.to_string());
        let memory = info
            .caps
            .global_mem
            .map_or_else(|| "-".to_string(), |m| format!("{} MB", m / (1024 * 1024)));
        writeln!(
            out,
            "     Compute Units: {}, Work Group Size: {}, Memory: {}",
            info.caps.compute_units, group, memory
        )?;
    }
    Ok(())
}

/// Content lengths in hex characters
const CONTENT_LENGTHS: [usize; 5] = [50, 100, 200, 500, 1000];
const TOPICS: [&str; 7] = ["bitcoin", "nostr", "opencl", "gpu", "mining", "crypto", "tech"];

fn random_bytes<const N: usize>() -> Result<[u8; N], getrandom::Error> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf)?;
    Ok(buf)
}

fn random_hex(len: usize) -> Result<String, getrandom::Error> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf)?;
    Ok(hex::encode(buf))
}

/// A kind-1 note with random author, content and tags, shaped like real
/// traffic.
pub fn random_event() -> Result<Event, getrandom::Error> {
    let pubkey = random_hex(32)?;
    let [pick_len, roll_p, roll_e, roll_t, pick_topic] = random_bytes::<5>()?;

    let content = random_hex(CONTENT_LENGTHS[pick_len as usize % CONTENT_LENGTHS.len()] / 2)?;

    let mut tags = vec![vec![
        "p".to_string(),
        pubkey.clone(),
        "wss://relay.example.com".to_string(),
    ]];
    if roll_p % 10 < 3 {
        tags.push(vec!["p".to_string(), random_hex(32)?, String::new()]);
    }
    if roll_e % 10 < 2 {
        tags.push(vec![
            "e".to_string(),
            random_hex(32)?,
            "wss://relay.example.com".to_string(),
        ]);
    }
    if roll_t % 10 < 4 {
        let topic = TOPICS[pick_topic as usize % TOPICS.len()];
        tags.push(vec!["t".to_string(), topic.to_string()]);
    }

    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    Ok(Event {
        pubkey,
        created_at,
        kind: 1,
        tags,
        content,
        ..Default::default()
    })
}

fn fresh_event() -> Result<Event, BackendError> {
    random_event().map_err(|e| BackendError::Random(e.to_string()))
}

/// Settings for a batch-size sweep
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub powers: RangeInclusive<u32>,
    /// Fresh random events per power
    pub runs: u32,
    /// Time spent per run
    pub duration: Duration,
    pub difficulty: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            powers: 3..=10,
            runs: 3,
            duration: Duration::from_secs(5),
            difficulty: 16,
        }
    }
}

/// Averaged throughput of one batch size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkRow {
    pub power: u32,
    pub batch_size: usize,
    /// Nonces per second
    pub rate: f64,
}

/// Outcome of a sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkReport {
    pub rows: Vec<BenchmarkRow>,
}

impl BenchmarkReport {
    /// Fastest batch size
    pub fn best(&self) -> Option<&BenchmarkRow> {
        self.rows
            .iter()
            .fold(None, |best: Option<&BenchmarkRow>, row| match best {
                Some(b) if b.rate >= row.rate => Some(b),
                _ => Some(row),
            })
    }

    pub fn write_table<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(best) = self.best() else {
            writeln!(out, "No valid batch sizes to test")?;
            return Ok(());
        };

        writeln!(out)?;
        writeln!(out, "=== Benchmark Results ===")?;
        for row in &self.rows {
            let marker = if row.power == best.power { "*" } else { " " };
            writeln!(
                out,
                "{} Batch size 10^{} ({}): {:.2}M nonces/s",
                marker,
                row.power,
                row.batch_size,
                row.rate / 1_000_000.0
            )?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "Recommended batch size: 10^{} ({}) with {:.2}M nonces/s",
            best.power,
            best.batch_size,
            best.rate / 1_000_000.0
        )?;
        writeln!(out, "Use: --batch-size {}", best.power)
    }
}

/// Nonce throughput of `backend` on one event for roughly `duration`.
///
/// Fails if the event does not fit the kernel. Always runs at least one batch. Nonces wrap back to the start of the tier
/// when the tier runs out.
pub fn measure_rate(
    backend: &mut dyn Backend,
    variant: KernelVariant,
    event: &Event,
    batch_size: usize,
    difficulty: u32,
    duration: Duration,
) -> Result<f64, MineError> {
    let width = WidthRange::new(batch_size, 0).min.max(MIN_MAX_NONCE_WIDTH);
    let placeholder = "0".repeat(width as usize);

    let mut event = event.clone();
    event.set_nonce_tag(&placeholder, difficulty);
    let message = event.serialize();
    let nonce_offset = locate_nonce_placeholder(&message, &placeholder)
        .ok_or(MineError::PlaceholderNotFound { width })?;

    let params = KernelParams {
        message: &message,
        nonce_offset,
        digit_width: width,
        difficulty,
    };
    if !params.is_runnable() {
        return Err(ConfigError::EventTooLarge {
            len: message.len(),
            width,
            max: MAX_MESSAGE_LEN,
        }
        .into());
    }
    backend.prepare(variant, params)?;

    let first = pow10(width - 1).unwrap_or(u64::MAX);
    let last = max_nonce_for_width(width);
    let mut base = first;
    let mut tested = 0u64;
    let start = Instant::now();

    loop {
        let lanes = (batch_size as u64).min(last - base + 1) as usize;
        backend.dispatch(base, lanes)?;
        tested += lanes as u64;
        base = if last - base + 1 > lanes as u64 {
            base + lanes as u64
        } else {
            first
        };
        if start.elapsed() >= duration {
            break;
        }
    }

    Ok(tested as f64 / start.elapsed().as_secs_f64())
}

/// Sweep batch sizes on one backend and report the throughput of each.
///
/// Stops at the first power that fails or that the device limits clamp.
pub fn run_benchmark<W: Write>(
    backend: &mut dyn Backend,
    variant: KernelVariant,
    config: &BenchmarkConfig,
    out: &mut W,
) -> Result<BenchmarkReport, MineError> {
    let caps = backend.info().caps;
    writeln!(out, "Running benchmark to find optimal batch size...")?;
    writeln!(
        out,
        "Each batch size will be tested {} times ({} seconds each) with different events.",
        config.runs,
        config.duration.as_secs_f64()
    )?;
    writeln!(out)?;
    writeln!(out, "Testing on device: {} ({} kernel)", backend.info().name, variant)?;
    writeln!(out)?;

    let mut report = BenchmarkReport::default();
    for power in config.powers.clone() {
        let requested = pow10(power).unwrap_or(u64::MAX) as usize;
        let batch_size = batch_size::clamp(requested, &caps);
        if batch_size < requested {
            writeln!(
                out,
                "Batch size 10^{} exceeds device limits (clamped to {}). Stopping benchmark.",
                power, batch_size
            )?;
            break;
        }

        write!(out, "Testing batch size 10^{} ({})... ", power, batch_size)?;
        out.flush()?;

        let mut rates = Vec::with_capacity(config.runs as usize);
        let mut failed = false;
        for run in 0..config.runs {
            let event = fresh_event()?;
            match measure_rate(backend, variant, &event, batch_size, config.difficulty, config.duration) {
                Ok(rate) => {
                    if run + 1 < config.runs {
                        write!(out, "{:.2}M ", rate / 1_000_000.0)?;
                    }
                    rates.push(rate);
                }
                Err(e) => {
                    warn!(power, "benchmark run failed: {}", e);
                    writeln!(out)?;
                    writeln!(out, "Error testing batch size 10^{} ({}): {}", power, batch_size, e)?;
                    writeln!(out, "Batch size too large for this device. Stopping benchmark.")?;
                    failed = true;
                    break;
                }
            }
        }
        if failed {
            break;
        }

        let rate = rates.iter().sum::<f64>() / rates.len().max(1) as f64;
        writeln!(
            out,
            "{:.2}M nonces/s (avg of {} runs)",
            rate / 1_000_000.0,
            rates.len()
        )?;
        report.rows.push(BenchmarkRow {
            power,
            batch_size,
            rate,
        });
    }

    report.write_table(out)?;
    Ok(report)
}

/// One cross-check disagreement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub event_index: usize,
    pub detail: String,
}

/// Outcome of a cross-check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossCheckReport {
    pub events: usize,
    pub mismatches: Vec<Mismatch>,
}

impl CrossCheckReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Mine `events` random events with every kernel variant and compare.
///
/// With identical batch sizes every variant must land on the same nonce,
/// since each reports the lowest valid lane of the first batch with one.
pub fn cross_check<W: Write>(
    backend: &mut dyn Backend,
    events: usize,
    difficulty: u32,
    batch_size: usize,
    out: &mut W,
) -> Result<CrossCheckReport, MineError> {
    let mut report = CrossCheckReport {
        events,
        mismatches: Vec::new(),
    };

    for index in 0..events {
        let event = fresh_event()?;

        let mut solutions = Vec::with_capacity(KernelVariant::ALL.len());
        for variant in KernelVariant::ALL {
            let solution = Miner::new(backend, variant, batch_size, difficulty)
                .mine(&event, &mut SearchContext::silent())?;
            if let Err(e) = validate_event(&solution.event, difficulty) {
                report.mismatches.push(Mismatch {
                    event_index: index,
                    detail: format!("{} kernel produced an invalid event: {}", variant, e),
                });
            }
            solutions.push((variant, solution));
        }

        let (reference_variant, reference) = &solutions[0];
        for (variant, solution) in &solutions[1..] {
            if solution.nonce != reference.nonce || solution.id != reference.id {
                report.mismatches.push(Mismatch {
                    event_index: index,
                    detail: format!(
                        "{} found nonce {} ({}), {} found nonce {} ({})",
                        reference_variant,
                        reference.nonce,
                        hex::encode(reference.id),
                        variant,
                        solution.nonce,
                        hex::encode(solution.id)
                    ),
                });
            }
        }

        debug!(index, nonce = reference.nonce, "cross-check event done");
        writeln!(
            out,
            "[{}/{}] nonce {} id {}",
            index + 1,
            events,
            reference.nonce,
            hex::encode(reference.id)
        )?;
    }

    for mismatch in &report.mismatches {
        writeln!(out, "MISMATCH event {}: {}", mismatch.event_index, mismatch.detail)?;
    }
    writeln!(
        out,
        "Cross-check {}: {} events, {} mismatches",
        if report.passed() { "passed" } else { "FAILED" },
        report.events,
        report.mismatches.len()
    )?;

    Ok(report)
}
