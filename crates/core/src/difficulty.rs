//! Proof-of-work difficulty as leading zero bits

/// Count the leading zero bits of a digest, byte-major, most significant bit
/// first. An all-zero input counts `8 * len`.
///
/// # Example
///
/// ```rust
/// use nip13_core::leading_zero_bits;
///
/// assert_eq!(leading_zero_bits(&[0x00, 0x00, 0x0F, 0xFF]), 20);
/// assert_eq!(leading_zero_bits(&[0x80, 0x00]), 0);
/// ```
#[inline(always)]
pub fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut zero_bits = 0u32;

    for byte in digest.iter() {
        if *byte == 0 {
            zero_bits += 8;
        } else {
            zero_bits += byte.leading_zeros();
            break;
        }
    }

    zero_bits
}

/// Check if a digest has at least `difficulty` leading zero bits.
#[inline(always)]
pub fn meets_difficulty(digest: &[u8], difficulty: u32) -> bool {
    leading_zero_bits(digest) >= difficulty
}

/// Leading zero bits of a hex-encoded digest, as NIP-13 counts them.
///
/// Returns `None` if the string contains a non-hex character before the first
/// set bit.
pub fn leading_zero_bits_hex(hex_digest: &str) -> Option<u32> {
    let mut zero_bits = 0u32;

    for c in hex_digest.chars() {
        let nibble = c.to_digit(16)?;
        if nibble == 0 {
            zero_bits += 4;
        } else {
            zero_bits += (nibble as u8).leading_zeros() - 4;
            break;
        }
    }

    Some(zero_bits)
}
