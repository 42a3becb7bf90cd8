//! Error types for the miner
//!
//! Configuration and backend errors are fatal and surface at the CLI. A
//! rejected kernel candidate is a [`ValidationError`] that the orchestrator
//! logs and moves past; it only escapes when the final event fails its own
//! re-check.

use thiserror::Error;

/// Caller mistakes: bad flags or an event the kernel cannot hold
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Difficulty must be between 0 and {max}, got {got}")]
    Difficulty { got: u32, max: u32 },

    #[error("Batch size power must be between -1 (auto) and {max}, got {got}")]
    BatchSizeRange { got: i64, max: u32 },

    #[error("Invalid batch size '{0}' (expected auto, -1 or a power of ten between 0 and 10)")]
    BatchSizeSyntax(String),

    #[error("Invalid device selector '{0}' (expected auto, -1 or a device index)")]
    DeviceSyntax(String),

    #[error("Device index {index} is out of range ({count} devices available, see list-devices)")]
    DeviceOutOfRange { index: usize, count: usize },

    #[error("Unknown kernel '{0}' (expected auto, generic or midstate)")]
    Kernel(String),

    #[error("Thread count must be at least 1")]
    Threads,

    #[error("Serialized event is {len} bytes with a {width}-digit nonce, kernel limit is {max} bytes")]
    EventTooLarge { len: usize, width: u32, max: usize },
}

/// Failures of the compute environment
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No compute backend available")]
    NoBackend,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Dispatch before a job was prepared")]
    NotPrepared,

    #[error("Random number generation failed: {0}")]
    Random(String),

    #[cfg(feature = "opencl")]
    #[error("OpenCL error: {0}")]
    OpenCl(#[from] ocl::Error),
}

/// Why a candidate nonce was rejected on the host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Nonce {nonce} does not fit in {width} digits")]
    NonceWidth { nonce: u64, width: u32 },

    #[error("Event ID mismatch: expected {expected}, got {got}")]
    IdMismatch { expected: String, got: String },

    #[error("Event ID has {actual} leading zero bits, need {required}")]
    Insufficient { actual: u32, required: u32 },

    #[error("Committed difficulty mismatch: expected {expected}, got {got:?}")]
    CommittedDifficulty { expected: u32, got: Option<u32> },
}

/// Everything that can end a mining run without a solution
#[derive(Error, Debug)]
pub enum MineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Could not find nonce placeholder in serialized event (digits: {width})")]
    PlaceholderNotFound { width: u32 },

    #[error("No valid nonce for difficulty {difficulty} in {min_width} to {max_width} digit nonces")]
    Exhausted {
        difficulty: u32,
        min_width: u32,
        max_width: u32,
    },

    #[error("Mined event failed final validation: {0}")]
    FinalValidation(#[from] ValidationError),

    #[error("Event JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MineError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            MineError::Exhausted { .. } => 2,
            _ => 1,
        }
    }
}
