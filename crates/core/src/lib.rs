//! # NIP-13 Nonce Search Kernel
//!
//! The algorithmic core of a proof-of-work miner: find a decimal nonce that,
//! written into a serialized record, makes its SHA-256 digest start with at
//! least N zero bits.
//!
//! ## Layers
//!
//! - [`primitives`]: SHA-256 message schedule and compression function
//! - [`padding`]: Merkle–Damgård padding into 64-byte blocks
//! - [`sha256`]: digest and resumable midstate
//! - [`difficulty`]: leading-zero-bit counting
//! - [`kernel`]: per-lane candidate evaluation, two interchangeable variants
//! - `batch`: running a kernel over a contiguous range of lanes (requires `std`)
//!
//! ## Example
//!
//! ```rust
//! use nip13_core::{KernelParams, KernelVariant, LaneResult, PreparedKernel};
//!
//! let message = br#"[0,"pk",1,1,[["nonce","00000","0"]],"hi"]"#;
//! let params = KernelParams {
//!     message,
//!     nonce_offset: 23,
//!     digit_width: 5,
//!     difficulty: 0,
//! };
//!
//! let kernel = PreparedKernel::new(KernelVariant::Generic, params);
//! // Difficulty 0 accepts any digest
//! assert!(matches!(kernel.evaluate(10_000, 0), LaneResult::Found { nonce: 10_000, .. }));
//! ```
//!
//! ## no_std Support
//!
//! Everything except the batch runner works without `std`:
//!
//! ```toml
//! [dependencies]
//! nip13-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod difficulty;
pub mod kernel;
pub mod nonce;
pub mod padding;
mod params;
pub mod primitives;
pub mod sha256;

#[cfg(feature = "std")]
pub mod batch;

pub use difficulty::{leading_zero_bits, leading_zero_bits_hex, meets_difficulty};
pub use kernel::{
    KernelParams, KernelVariant, LaneResult, PreparedKernel, ResultLayout, UnknownVariant,
    decode_lane_record, encode_lane_record, evaluate_lane,
};
pub use nonce::{decimal_digits, fits_width, max_nonce_for_width, pow10, render_nonce};
pub use padding::{PaddedBlocks, padded_block_count};
pub use params::*;
pub use sha256::{Digest, Midstate, digest};

#[cfg(feature = "std")]
pub use batch::{BatchResults, LaneHit, NO_HIT, hit_from_index, hits_from_records, run_batch};

#[cfg(test)]
mod tests;
