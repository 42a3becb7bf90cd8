//! Progress reporting during a search
//!
//! The orchestrator reports after every batch through [`ProgressObserver`].
//! [`ProgressLine`] turns that into a single rewritten status line on stderr.

use std::io::Write;
use std::time::{Duration, Instant};

/// Snapshot taken after a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Digit width of the current tier
    pub digit_width: u32,
    /// Highest nonce tested so far in this tier
    pub last_nonce: u64,
    /// Nonces tested across all tiers
    pub total_tested: u64,
    pub elapsed: Duration,
    pub difficulty: u32,
}

/// Receives progress from the orchestrator
pub trait ProgressObserver {
    fn on_batch(&mut self, progress: &Progress);

    /// Called once when the search ends, found or not.
    fn on_finish(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_batch(&mut self, _progress: &Progress) {}
}

/// Percentage of the expected `2^difficulty` attempts already made.
///
/// Can exceed 100 on an unlucky run.
pub fn expected_percent(total_tested: u64, difficulty: u32) -> f64 {
    let expected = 2f64.powi(difficulty as i32);
    total_tested as f64 / expected * 100.0
}

/// Format a rate as `1.23M`, `4.56K` or a plain integer.
pub fn format_rate(rate: f64) -> String {
    if rate >= 1_000_000.0 {
        format!("{:.2}M", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else {
        format!("{:.0}", rate)
    }
}

/// Format elapsed time as `1h2m3s`, `2m3s` or `3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Nonces per second.
pub fn rate(total_tested: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        total_tested as f64 / secs
    } else {
        0.0
    }
}

/// The status line text, without carriage return.
pub fn render(progress: &Progress) -> String {
    format!(
        "[{} digits] Nonce: {} ({:.1}% of expected) | Rate: {} nonces/s | Elapsed: {}",
        progress.digit_width,
        progress.last_nonce,
        expected_percent(progress.total_tested, progress.difficulty),
        format_rate(rate(progress.total_tested, progress.elapsed)),
        format_elapsed(progress.elapsed),
    )
}

/// Rewrites one terminal line at most every `interval`
pub struct ProgressLine<W: Write> {
    out: W,
    interval: Duration,
    last_draw: Option<Instant>,
    drawn: usize,
}

impl<W: Write> ProgressLine<W> {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(out: W) -> Self {
        Self::with_interval(out, Self::DEFAULT_INTERVAL)
    }

    pub fn with_interval(out: W, interval: Duration) -> Self {
        Self {
            out,
            interval,
            last_draw: None,
            drawn: 0,
        }
    }

    /// Blank the line if anything was drawn.
    pub fn clear(&mut self) {
        if self.drawn > 0 {
            // Progress output is best effort
            let _ = write!(self.out, "\r{}\r", " ".repeat(self.drawn));
            let _ = self.out.flush();
            self.drawn = 0;
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressObserver for ProgressLine<W> {
    fn on_batch(&mut self, progress: &Progress) {
        let now = Instant::now();
        if self
            .last_draw
            .is_some_and(|last| now.duration_since(last) < self.interval)
        {
            return;
        }
        self.last_draw = Some(now);

        let line = render(progress);
        let pad = self.drawn.saturating_sub(line.len());
        let _ = write!(self.out, "\r{}{}", line, " ".repeat(pad));
        let _ = self.out.flush();
        self.drawn = line.len();
    }

    fn on_finish(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> Progress {
        Progress {
            digit_width: 7,
            last_nonce: 1_234_567,
            total_tested: 32_768,
            elapsed: Duration::from_secs(2),
            difficulty: 16,
        }
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(2_500_000.0), "2.50M");
        assert_eq!(format_rate(1_500.0), "1.50K");
        assert_eq!(format_rate(999.4), "999");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(5)), "5s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m5s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "1h2m3s");
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(&progress()),
            "[7 digits] Nonce: 1234567 (50.0% of expected) | Rate: 16.38K nonces/s | Elapsed: 2s"
        );
    }

    #[test]
    fn test_line_throttles_and_clears() {
        let mut line = ProgressLine::with_interval(Vec::new(), Duration::from_secs(3600));
        line.on_batch(&progress());
        line.on_batch(&progress());
        line.on_finish();

        let out = String::from_utf8(line.into_inner()).unwrap();
        assert_eq!(out.matches("digits]").count(), 1);
        assert!(out.ends_with('\r'));
    }
}
