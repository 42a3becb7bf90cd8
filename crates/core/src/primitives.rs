//! SHA-256 block compression
//!
//! The message schedule expansion and the 64-round compression function from
//! FIPS 180-4. All arithmetic is 32-bit wraparound.

use crate::params::{BLOCK_SIZE, K, ROUNDS, STATE_WORDS};

#[inline(always)]
fn ch(x: u32, y: u32, z: u32) -> u32 {
    (x & y) ^ (!x & z)
}

#[inline(always)]
fn maj(x: u32, y: u32, z: u32) -> u32 {
    (x & y) ^ (x & z) ^ (y & z)
}

/// Σ0
#[inline(always)]
fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

/// Σ1
#[inline(always)]
fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

/// σ0
#[inline(always)]
fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

/// σ1
#[inline(always)]
fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

/// Expand a 64-byte block into the 64-word message schedule.
///
/// The first 16 words are the block read big-endian; the rest follow
/// `W[t] = σ1(W[t-2]) + W[t-7] + σ0(W[t-15]) + W[t-16]`.
#[inline(always)]
pub fn message_schedule(block: &[u8; BLOCK_SIZE]) -> [u32; ROUNDS] {
    let mut w = [0u32; ROUNDS];
    for (word, chunk) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for t in 16..ROUNDS {
        w[t] = small_sigma1(w[t - 2])
            .wrapping_add(w[t - 7])
            .wrapping_add(small_sigma0(w[t - 15]))
            .wrapping_add(w[t - 16]);
    }
    w
}

/// Apply the SHA-256 compression function to `state` with one block.
#[inline(always)]
pub fn compress(state: &mut [u32; STATE_WORDS], block: &[u8; BLOCK_SIZE]) {
    let w = message_schedule(block);

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for t in 0..ROUNDS {
        let t1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(K[t])
            .wrapping_add(w[t]);
        let t2 = big_sigma0(a).wrapping_add(maj(a, b, c));
        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    for (word, v) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::IV;

    #[test]
    fn test_compress_deterministic() {
        let block = [1u8; BLOCK_SIZE];

        let mut state1 = IV;
        let mut state2 = IV;
        compress(&mut state1, &block);
        compress(&mut state2, &block);

        assert_eq!(state1, state2);
        assert_ne!(state1, IV);
    }

    #[test]
    fn test_schedule_copies_block_big_endian() {
        let mut block = [0u8; BLOCK_SIZE];
        block[0..4].copy_from_slice(&[0x61, 0x62, 0x63, 0x80]);
        block[63] = 0x18;

        let w = message_schedule(&block);
        assert_eq!(w[0], 0x6162_6380);
        assert_eq!(w[15], 0x0000_0018);
        // W[16] = σ1(W[14]) + W[9] + σ0(W[1]) + W[0] with all but W[0] zero
        assert_eq!(w[16], 0x6162_6380);
    }

    #[test]
    fn test_compress_matches_reference_for_abc() {
        // "abc" padded into a single block
        let mut block = [0u8; BLOCK_SIZE];
        block[0..3].copy_from_slice(b"abc");
        block[3] = 0x80;
        block[63] = 24;

        let mut state = IV;
        compress(&mut state, &block);

        assert_eq!(
            state,
            [
                0xba7816bf, 0x8f01cfea, 0x414140de, 0x5dae2223, 0xb00361a3, 0x96177a9c,
                0xb410ff61, 0xf20015ad,
            ]
        );
    }
}
