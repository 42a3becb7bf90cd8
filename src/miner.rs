//! Batch orchestrator
//!
//! The search walks digit-width tiers. For each width `w` the event gets a
//! `w`-zero placeholder nonce tag, is serialized, and the backend is prepared
//! with the placeholder offset. Batches then cover `[10^(w-1), 10^w - 1]` in
//! ascending, non-overlapping ranges. Every hit is re-validated on the host
//! before it is accepted; rejected hits are logged and skipped.

use std::time::{Duration, Instant};

use tracing::{debug, info_span, warn, Span};

use crate::algorithm::{
    decimal_digits, digest, max_nonce_for_width, pow10, render_nonce, Digest, KernelParams,
    KernelVariant, LaneHit, MAX_MESSAGE_LEN,
};
use crate::backend::{self, Backend};
use crate::batch_size;
use crate::config::MinerConfig;
use crate::error::{ConfigError, MineError};
use crate::event::{locate_nonce_placeholder, Event};
use crate::progress::{NoProgress, Progress, ProgressObserver};
use crate::validate::{validate_candidate, validate_event};

/// Narrowest nonce placeholder
pub const MIN_NONCE_WIDTH: u32 = 5;

/// Widest tier limit derived from the difficulty is never below this
pub const MIN_MAX_NONCE_WIDTH: u32 = 10;

/// Digits added on top of the expected attempt count
pub const WIDTH_MARGIN: u32 = 2;

/// Widest tier; every 19-digit nonce fits in a `u64`
pub const MAX_NONCE_WIDTH: u32 = 19;

/// Inclusive range of digit widths a search walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthRange {
    pub min: u32,
    pub max: u32,
}

impl WidthRange {
    /// Widths for a given batch size and difficulty.
    ///
    /// The first tier must hold at least one full batch; the last allows two
    /// orders of magnitude more attempts than `2^difficulty`.
    pub fn new(batch_size: usize, difficulty: u32) -> Self {
        let batch_digits = decimal_digits((batch_size.max(1) - 1) as u64);
        let min = (batch_digits + 1).clamp(MIN_NONCE_WIDTH, MAX_NONCE_WIDTH);

        // ceil(log10(2^d))
        let expected_digits = (difficulty as f64 * std::f64::consts::LOG10_2).ceil() as u32;
        let max = (expected_digits + WIDTH_MARGIN)
            .max(MIN_MAX_NONCE_WIDTH)
            .clamp(min, MAX_NONCE_WIDTH);

        Self { min, max }
    }
}

/// Per-run context threaded through the search in place of global state
pub struct SearchContext<'o> {
    observer: Option<&'o mut dyn ProgressObserver>,
    span: Span,
}

impl<'o> SearchContext<'o> {
    pub fn new(observer: &'o mut dyn ProgressObserver) -> Self {
        Self {
            observer: Some(observer),
            span: Span::current(),
        }
    }

    /// A context that reports no progress.
    pub fn silent() -> SearchContext<'static> {
        SearchContext {
            observer: None,
            span: Span::current(),
        }
    }

    /// Log under `span` instead of the caller's current span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// An accepted, host-validated solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The event with its nonce tag and id filled in
    pub event: Event,
    pub nonce: u64,
    pub digit_width: u32,
    pub id: Digest,
    /// Nonces tested, including the winning one
    pub tested: u64,
    /// Kernel hits that failed host validation
    pub rejected: u64,
    pub elapsed: Duration,
}

/// Drives a backend through the tiered search for one event
pub struct Miner<'b> {
    backend: &'b mut dyn Backend,
    variant: KernelVariant,
    batch_size: usize,
    difficulty: u32,
}

impl<'b> Miner<'b> {
    pub fn new(
        backend: &'b mut dyn Backend,
        variant: KernelVariant,
        batch_size: usize,
        difficulty: u32,
    ) -> Self {
        Self {
            backend,
            variant,
            batch_size: batch_size.max(1),
            difficulty,
        }
    }

    pub fn widths(&self) -> WidthRange {
        WidthRange::new(self.batch_size, self.difficulty)
    }

    /// Find a nonce giving `event` an id with at least `difficulty` leading
    /// zero bits.
    pub fn mine(&mut self, event: &Event, ctx: &mut SearchContext<'_>) -> Result<Solution, MineError> {
        let span = info_span!(
            parent: &ctx.span,
            "mine",
            difficulty = self.difficulty,
            kernel = %self.variant
        );
        let _guard = span.enter();

        let mut none = NoProgress;
        let observer: &mut dyn ProgressObserver = match ctx.observer.as_deref_mut() {
            Some(observer) => observer,
            None => &mut none,
        };
        let result = self.search(event, observer);
        observer.on_finish();
        result
    }

    fn search(
        &mut self,
        event: &Event,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Solution, MineError> {
        let widths = self.widths();
        let difficulty = self.difficulty;

        let mut event = event.clone();
        event.strip_nonce_tags();
        event.id.clear();
        self.check_fits(&mut event, widths.max)?;

        debug!(
            "Difficulty: {}, Nonce digits: {}-{} (dynamic sizing)",
            difficulty, widths.min, widths.max
        );
        debug!("Batch size: {} nonces", self.batch_size);

        let start = Instant::now();
        let mut tested = 0u64;
        let mut rejected = 0u64;

        for width in widths.min..=widths.max {
            // Sizing
            let placeholder = "0".repeat(width as usize);
            event.set_nonce_tag(&placeholder, difficulty);
            let message = event.serialize();
            let nonce_offset = locate_nonce_placeholder(&message, &placeholder)
                .ok_or(MineError::PlaceholderNotFound { width })?;

            self.backend.prepare(
                self.variant,
                KernelParams {
                    message: &message,
                    nonce_offset,
                    digit_width: width,
                    difficulty,
                },
            )?;

            let first = pow10(width - 1).unwrap_or(u64::MAX);
            let last = max_nonce_for_width(width);
            debug!("Trying {}-digit nonces: {} to {}", width, first, last);

            let mut base = first;
            while base <= last {
                // Dispatch
                let lanes = (self.batch_size as u64).min(last - base + 1) as usize;
                let results = self.backend.dispatch(base, lanes)?;

                // Harvest, lowest lane first
                for hit in &results.hits {
                    let id = hit
                        .digest
                        .unwrap_or_else(|| candidate_digest(&message, nonce_offset, width, hit));

                    // Validate
                    match validate_candidate(&event, hit.nonce, width, &id, difficulty) {
                        Ok(solved) => {
                            check_emitted(&solved, difficulty)?;
                            tested += hit.lane as u64 + 1;
                            debug!(nonce = hit.nonce, tested, "accepted nonce");
                            return Ok(Solution {
                                event: solved,
                                nonce: hit.nonce,
                                digit_width: width,
                                id,
                                tested,
                                rejected,
                                elapsed: start.elapsed(),
                            });
                        }
                        Err(e) => {
                            rejected += 1;
                            warn!(nonce = hit.nonce, lane = hit.lane, "Validation error: {}. Continuing...", e);
                        }
                    }
                }

                base += lanes as u64;
                tested += lanes as u64;
                observer.on_batch(&Progress {
                    digit_width: width,
                    last_nonce: base - 1,
                    total_tested: tested,
                    elapsed: start.elapsed(),
                    difficulty,
                });
            }

            debug!("Exhausted {}-digit nonces", width);
        }

        Err(MineError::Exhausted {
            difficulty,
            min_width: widths.min,
            max_width: widths.max,
        })
    }

    /// Reject events the kernel's working buffer cannot hold at the widest tier.
    fn check_fits(&self, event: &mut Event, max_width: u32) -> Result<(), ConfigError> {
        event.set_nonce_tag(&"0".repeat(max_width as usize), self.difficulty);
        let len = event.serialize().len();
        event.strip_nonce_tags();

        if len > MAX_MESSAGE_LEN {
            return Err(ConfigError::EventTooLarge {
                len,
                width: max_width,
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(())
    }
}

/// Validate the event as a reader of the printed JSON line will see it.
fn check_emitted(event: &Event, difficulty: u32) -> Result<(), MineError> {
    let emitted = Event::from_json(event.to_json_line()?.as_bytes())?;
    validate_event(&emitted, difficulty)?;
    Ok(())
}

/// Digest for a compact-layout hit, which carries only the lane.
fn candidate_digest(message: &[u8], nonce_offset: usize, width: u32, hit: &LaneHit) -> Digest {
    let mut buf = message.to_vec();
    render_nonce(hit.nonce, &mut buf[nonce_offset..nonce_offset + width as usize]);
    digest(&buf)
}

/// A backend opened and sized for a [`MinerConfig`]
pub struct Session {
    pub backend: Box<dyn Backend>,
    pub variant: KernelVariant,
    pub batch_size: usize,
}

impl Session {
    /// Enumerate backends, pick one, and resolve the kernel and batch size.
    pub fn open(config: &MinerConfig) -> Result<Self, MineError> {
        config.validate()?;

        let backends = backend::enumerate(config.worker_threads());
        let index = backend::select(&backends, config.device)?;
        let info = &backends[index];

        let variant = backend::resolve_kernel(info, config.kernel);
        let batch_size = batch_size::resolve(config.batch_size, &info.caps);
        let backend = backend::open(info)?;

        debug!(
            device = %info.name,
            kernel = %variant,
            batch_size,
            "session opened"
        );
        Ok(Self {
            backend,
            variant,
            batch_size,
        })
    }

    pub fn miner(&mut self, difficulty: u32) -> Miner<'_> {
        Miner::new(self.backend.as_mut(), self.variant, self.batch_size, difficulty)
    }
}
