//! Merkle–Damgård padding
//!
//! Splits a message into 64-byte blocks and appends `0x80`, zero fill and the
//! 64-bit big-endian bit length. Blocks are produced lazily so a lane never
//! allocates.

use crate::params::{BLOCK_SIZE, LENGTH_SUFFIX_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Data,
    Final,
    LengthOnly,
    Done,
}

/// Iterator over the padded blocks of a message.
#[derive(Debug, Clone)]
pub struct PaddedBlocks<'a> {
    remaining: &'a [u8],
    bit_len: u64,
    stage: Stage,
}

impl<'a> PaddedBlocks<'a> {
    /// Pad a complete message.
    pub fn new(message: &'a [u8]) -> Self {
        Self::with_prefix_len(message, 0)
    }

    /// Pad the tail of a message whose first `prefix_len` bytes were already
    /// absorbed block by block.
    ///
    /// `prefix_len` must be a multiple of [`BLOCK_SIZE`].
    pub fn with_prefix_len(tail: &'a [u8], prefix_len: usize) -> Self {
        debug_assert_eq!(prefix_len % BLOCK_SIZE, 0);
        let total = (prefix_len + tail.len()) as u64;
        Self {
            remaining: tail,
            bit_len: total.wrapping_mul(8),
            stage: Stage::Data,
        }
    }

    fn length_block(&self) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[BLOCK_SIZE - LENGTH_SUFFIX_SIZE..].copy_from_slice(&self.bit_len.to_be_bytes());
        block
    }
}

impl Iterator for PaddedBlocks<'_> {
    type Item = [u8; BLOCK_SIZE];

    fn next(&mut self) -> Option<Self::Item> {
        if self.stage == Stage::Data {
            if self.remaining.len() >= BLOCK_SIZE {
                let (head, rest) = self.remaining.split_at(BLOCK_SIZE);
                self.remaining = rest;
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(head);
                return Some(block);
            }
            self.stage = Stage::Final;
        }

        match self.stage {
            Stage::Final => {
                let rem = self.remaining.len();
                let mut block = [0u8; BLOCK_SIZE];
                block[..rem].copy_from_slice(self.remaining);
                block[rem] = 0x80;
                if rem + 1 + LENGTH_SUFFIX_SIZE <= BLOCK_SIZE {
                    block[BLOCK_SIZE - LENGTH_SUFFIX_SIZE..]
                        .copy_from_slice(&self.bit_len.to_be_bytes());
                    self.stage = Stage::Done;
                } else {
                    self.stage = Stage::LengthOnly;
                }
                self.remaining = &[];
                Some(block)
            }
            Stage::LengthOnly => {
                self.stage = Stage::Done;
                Some(self.length_block())
            }
            Stage::Data | Stage::Done => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self.stage {
            Stage::Data => padded_block_count(self.remaining.len()),
            Stage::Final => 1 + usize::from(self.remaining.len() + 1 + LENGTH_SUFFIX_SIZE > BLOCK_SIZE),
            Stage::LengthOnly => 1,
            Stage::Done => 0,
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for PaddedBlocks<'_> {}

/// Number of blocks a message of `len` bytes pads to.
#[inline]
pub const fn padded_block_count(len: usize) -> usize {
    (len + 1 + LENGTH_SUFFIX_SIZE).div_ceil(BLOCK_SIZE)
}
