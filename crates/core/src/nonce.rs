//! Fixed-width decimal nonces

use crate::params::MAX_NONCE_DIGITS;

/// `10^exp`, or `None` if it does not fit in a `u64`.
#[inline]
pub const fn pow10(exp: u32) -> Option<u64> {
    10u64.checked_pow(exp)
}

/// Largest nonce representable in `width` decimal digits.
///
/// Widths of 20 and above are clamped to `u64::MAX`.
#[inline]
pub const fn max_nonce_for_width(width: u32) -> u64 {
    match pow10(width) {
        Some(p) => p - 1,
        None => u64::MAX,
    }
}

/// Number of decimal digits in `n` (`0` has one digit).
#[inline]
pub const fn decimal_digits(mut n: u64) -> u32 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Write `nonce` as exactly `out.len()` zero-padded ASCII digits.
///
/// Digits are produced right to left; if `nonce` has more digits than fit,
/// the high digits are dropped, so callers check the width first.
#[inline(always)]
pub fn render_nonce(nonce: u64, out: &mut [u8]) {
    let mut n = nonce;
    for slot in out.iter_mut().rev() {
        *slot = b'0' + (n % 10) as u8;
        n /= 10;
    }
}

/// Check that `nonce` renders in `width` digits and that the width is
/// supported by the kernel.
#[inline(always)]
pub const fn fits_width(nonce: u64, width: u32) -> bool {
    width > 0 && width <= MAX_NONCE_DIGITS && nonce <= max_nonce_for_width(width)
}
