//! SHA-256 digest built from the raw compression function
//!
//! [`digest`] hashes a whole message. [`Midstate`] absorbs a block-aligned
//! prefix once so the same prefix can be finished with many different tails,
//! which is what the midstate kernel relies on.

use crate::padding::PaddedBlocks;
use crate::params::{BLOCK_SIZE, DIGEST_SIZE, IV, STATE_WORDS};
use crate::primitives::compress;

/// A 32-byte SHA-256 digest
pub type Digest = [u8; DIGEST_SIZE];

/// Serialize a state as 32 bytes, big-endian per word.
#[inline(always)]
pub fn state_to_bytes(state: &[u32; STATE_WORDS]) -> Digest {
    let mut out = [0u8; DIGEST_SIZE];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// Compute the SHA-256 digest of `message`.
///
/// # Example
///
/// ```rust
/// use nip13_core::digest;
///
/// let d = digest(b"abc");
/// assert_eq!(d[0], 0xba);
/// assert_eq!(d[31], 0xad);
/// ```
pub fn digest(message: &[u8]) -> Digest {
    let mut state = IV;
    for block in PaddedBlocks::new(message) {
        compress(&mut state, &block);
    }
    state_to_bytes(&state)
}

/// Running state after absorbing a block-aligned message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Midstate {
    state: [u32; STATE_WORDS],
    absorbed: usize,
}

impl Midstate {
    /// State before any input.
    pub const fn new() -> Self {
        Self {
            state: IV,
            absorbed: 0,
        }
    }

    /// Absorb every complete block of `prefix`. A trailing partial block is
    /// left for [`Midstate::finish`].
    pub fn absorb(prefix: &[u8]) -> Self {
        let mut mid = Self::new();
        for chunk in prefix.chunks_exact(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            compress(&mut mid.state, &block);
            mid.absorbed += BLOCK_SIZE;
        }
        mid
    }

    /// Bytes absorbed so far
    pub const fn absorbed(&self) -> usize {
        self.absorbed
    }

    /// Raw state words
    pub const fn words(&self) -> &[u32; STATE_WORDS] {
        &self.state
    }

    /// Finish the digest with the rest of the message.
    pub fn finish(&self, tail: &[u8]) -> Digest {
        let mut state = self.state;
        for block in PaddedBlocks::with_prefix_len(tail, self.absorbed) {
            compress(&mut state, &block);
        }
        state_to_bytes(&state)
    }
}

impl Default for Midstate {
    fn default() -> Self {
        Self::new()
    }
}
