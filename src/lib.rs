//! NIP-13 Proof-of-Work Miner Library
//!
//! Mines a nonce tag into a Nostr event so that its id starts with a chosen
//! number of zero bits.
//!
//! # Overview
//!
//! The SHA-256 kernel lives in [`algorithm`] (the `nip13-core` crate). This
//! crate adds the event model, host-side validation, compute backends and the
//! tiered search that drives them.
//!
//! - **Tiered search**: nonces grow one decimal digit at a time
//! - **Two kernels**: a generic one and one that resumes from a midstate
//! - **Backends**: a rayon CPU pool, plus OpenCL devices with the `opencl` feature
//! - **Host validation**: every kernel hit is re-checked before it is accepted
//!
//! # Example
//!
//! ```rust
//! use nip13::backend::CpuBackend;
//! use nip13::{Event, KernelVariant, Miner, SearchContext};
//!
//! let event = Event::from_json(br#"{"pubkey":"ab","created_at":1,"kind":1,"tags":[],"content":"gm"}"#)?;
//!
//! let mut backend = CpuBackend::new(2)?;
//! let solution = Miner::new(&mut backend, KernelVariant::Midstate, 1_000, 8)
//!     .mine(&event, &mut SearchContext::silent())?;
//!
//! assert!(solution.event.id_difficulty().unwrap_or(0) >= 8);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export the core algorithm
pub use nip13_core as algorithm;

pub mod backend;
pub mod batch_size;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod logging;
pub mod miner;
pub mod progress;
pub mod validate;

// Convenience re-exports
pub use algorithm::{leading_zero_bits, KernelVariant};
pub use config::MinerConfig;
pub use error::{BackendError, ConfigError, MineError, ValidationError};
pub use event::Event;
pub use miner::{Miner, SearchContext, Session, Solution};
