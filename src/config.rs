//! Miner configuration
//!
//! The CLI builds a [`MinerConfig`] from its flags; everything downstream
//! takes the validated config rather than raw arguments.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::algorithm::KernelVariant;
use crate::error::ConfigError;

/// Highest accepted difficulty (a SHA-256 digest has 256 bits)
pub const MAX_DIFFICULTY: u32 = 256;

/// Highest accepted batch size power (10^10 lanes)
pub const MAX_BATCH_POWER: u32 = 10;

/// Default difficulty in leading zero bits
pub const DEFAULT_DIFFICULTY: u32 = 16;

/// Lanes per dispatch, as a power of ten
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchSizeSpec {
    /// Derive from the selected backend's capabilities
    #[default]
    Auto,
    /// `10^n` lanes
    Power(u32),
}

impl FromStr for BatchSizeSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(BatchSizeSpec::Auto);
        }
        let power: i64 = s
            .parse()
            .map_err(|_| ConfigError::BatchSizeSyntax(s.to_string()))?;
        match power {
            -1 => Ok(BatchSizeSpec::Auto),
            0..=10 => Ok(BatchSizeSpec::Power(power as u32)),
            _ => Err(ConfigError::BatchSizeRange {
                got: power,
                max: MAX_BATCH_POWER,
            }),
        }
    }
}

impl fmt::Display for BatchSizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchSizeSpec::Auto => f.write_str("auto"),
            BatchSizeSpec::Power(p) => write!(f, "{}", p),
        }
    }
}

/// Which backend to mine on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// First GPU-class backend, else the first backend
    #[default]
    Auto,
    /// Index into the enumerated backend list
    Index(usize),
}

impl FromStr for DeviceSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s == "-1" {
            return Ok(DeviceSelector::Auto);
        }
        s.parse()
            .map(DeviceSelector::Index)
            .map_err(|_| ConfigError::DeviceSyntax(s.to_string()))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Auto => f.write_str("auto"),
            DeviceSelector::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Which kernel variant to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KernelSelector {
    /// Pick from the backend's class and vendor
    #[default]
    Auto,
    Variant(KernelVariant),
}

impl FromStr for KernelSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(KernelSelector::Auto);
        }
        s.parse()
            .map(KernelSelector::Variant)
            .map_err(|_| ConfigError::Kernel(s.to_string()))
    }
}

impl fmt::Display for KernelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelSelector::Auto => f.write_str("auto"),
            KernelSelector::Variant(v) => fmt::Display::fmt(v, f),
        }
    }
}

macro_rules! serialize_as_display {
    ($($ty:ty),*) => {
        $(impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        })*
    };
}

serialize_as_display!(BatchSizeSpec, DeviceSelector, KernelSelector);

/// Settings for one mining run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerConfig {
    /// Required leading zero bits
    pub difficulty: u32,
    pub batch_size: BatchSizeSpec,
    pub device: DeviceSelector,
    pub kernel: KernelSelector,
    /// CPU worker threads (default: number of CPU cores)
    pub threads: Option<usize>,
    pub verbose: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            batch_size: BatchSizeSpec::Auto,
            device: DeviceSelector::Auto,
            kernel: KernelSelector::Auto,
            threads: None,
            verbose: false,
        }
    }
}

impl MinerConfig {
    /// Reject out-of-range values before any backend is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::Difficulty {
                got: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        if let BatchSizeSpec::Power(p) = self.batch_size {
            if p > MAX_BATCH_POWER {
                return Err(ConfigError::BatchSizeRange {
                    got: p as i64,
                    max: MAX_BATCH_POWER,
                });
            }
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Threads);
        }
        Ok(())
    }

    /// Worker threads for the CPU pool.
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}
