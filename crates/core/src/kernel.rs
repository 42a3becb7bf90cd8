//! Candidate kernel
//!
//! One lane evaluates one nonce: copy the serialized message into a private
//! buffer, overwrite the placeholder digits with the zero-padded nonce, hash,
//! and compare the leading zero bits against the threshold. Lanes share the
//! message read-only and never talk to each other.

use core::fmt;
use core::str::FromStr;

use crate::difficulty::leading_zero_bits;
use crate::nonce::{fits_width, render_nonce};
use crate::params::{BLOCK_SIZE, LANE_RECORD_SIZE, MAX_MESSAGE_LEN, MAX_NONCE_DIGITS};
use crate::sha256::{Digest, Midstate, digest};

/// Inputs shared by every lane of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelParams<'a> {
    /// Serialized record with the placeholder nonce in place
    pub message: &'a [u8],
    /// Byte offset of the first placeholder digit
    pub nonce_offset: usize,
    /// Placeholder width in ASCII digits
    pub digit_width: u32,
    /// Required leading zero bits
    pub difficulty: u32,
}

impl KernelParams<'_> {
    /// Whether a lane can do meaningful work with these parameters.
    ///
    /// Oversized messages, unsupported widths and a placeholder that runs past
    /// the end of the message all make every lane report "not found".
    pub fn is_runnable(&self) -> bool {
        self.message.len() <= MAX_MESSAGE_LEN
            && self.digit_width > 0
            && self.digit_width <= MAX_NONCE_DIGITS
            && self
                .nonce_offset
                .checked_add(self.digit_width as usize)
                .is_some_and(|end| end <= self.message.len())
    }
}

/// How a kernel reports its lanes back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultLayout {
    /// One record per lane: found flag, nonce and digest
    Full,
    /// Only the lowest hit lane index; the host recomputes nonce and digest
    Compact,
}

/// Behaviorally equivalent kernel implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelVariant {
    /// Hash the full message from the initial vector in every lane
    Generic,
    /// Hash the block-aligned prefix once, lanes only compress the tail
    Midstate,
}

impl KernelVariant {
    /// Every variant, in a stable order
    pub const ALL: [KernelVariant; 2] = [KernelVariant::Generic, KernelVariant::Midstate];

    /// Short lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            KernelVariant::Generic => "generic",
            KernelVariant::Midstate => "midstate",
        }
    }

    /// Result layout this variant emits
    pub const fn result_layout(self) -> ResultLayout {
        match self {
            KernelVariant::Generic => ResultLayout::Full,
            KernelVariant::Midstate => ResultLayout::Compact,
        }
    }
}

impl fmt::Display for KernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown kernel name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant;

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown kernel variant (expected generic or midstate)")
    }
}

impl FromStr for KernelVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is = |name: &str| s.eq_ignore_ascii_case(name);
        if is("generic") || is("mine") {
            Ok(KernelVariant::Generic)
        } else if is("midstate") || is("ckolivas") {
            Ok(KernelVariant::Midstate)
        } else {
            Err(UnknownVariant)
        }
    }
}

/// Outcome of one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneResult {
    NotFound,
    Found { nonce: u64, digest: Digest },
}

impl LaneResult {
    pub const fn is_found(&self) -> bool {
        matches!(self, LaneResult::Found { .. })
    }
}

/// A kernel bound to its parameters, with any per-dispatch precomputation done.
#[derive(Debug, Clone)]
pub struct PreparedKernel<'a> {
    params: KernelParams<'a>,
    variant: KernelVariant,
    runnable: bool,
    midstate: Midstate,
}

impl<'a> PreparedKernel<'a> {
    pub fn new(variant: KernelVariant, params: KernelParams<'a>) -> Self {
        let runnable = params.is_runnable();
        let midstate = match variant {
            KernelVariant::Midstate if runnable => {
                let prefix_len = (params.nonce_offset / BLOCK_SIZE) * BLOCK_SIZE;
                Midstate::absorb(&params.message[..prefix_len])
            }
            _ => Midstate::new(),
        };
        Self {
            params,
            variant,
            runnable,
            midstate,
        }
    }

    pub const fn params(&self) -> &KernelParams<'a> {
        &self.params
    }

    pub const fn variant(&self) -> KernelVariant {
        self.variant
    }

    /// Evaluate lane `lane` of a dispatch starting at `base_nonce`.
    #[inline]
    pub fn evaluate(&self, base_nonce: u64, lane: u64) -> LaneResult {
        let Some(nonce) = base_nonce.checked_add(lane) else {
            return LaneResult::NotFound;
        };
        if !self.runnable || !fits_width(nonce, self.params.digit_width) {
            return LaneResult::NotFound;
        }

        let digest = match self.variant {
            KernelVariant::Generic => self.digest_generic(nonce),
            KernelVariant::Midstate => self.digest_midstate(nonce),
        };

        if leading_zero_bits(&digest) >= self.params.difficulty {
            LaneResult::Found { nonce, digest }
        } else {
            LaneResult::NotFound
        }
    }

    fn digest_generic(&self, nonce: u64) -> Digest {
        let len = self.params.message.len();
        let start = self.params.nonce_offset;
        let end = start + self.params.digit_width as usize;

        let mut work = [0u8; MAX_MESSAGE_LEN];
        work[..len].copy_from_slice(self.params.message);
        render_nonce(nonce, &mut work[start..end]);
        digest(&work[..len])
    }

    fn digest_midstate(&self, nonce: u64) -> Digest {
        let prefix_len = self.midstate.absorbed();
        let tail = &self.params.message[prefix_len..];
        let start = self.params.nonce_offset - prefix_len;
        let end = start + self.params.digit_width as usize;

        let mut work = [0u8; MAX_MESSAGE_LEN];
        work[..tail.len()].copy_from_slice(tail);
        render_nonce(nonce, &mut work[start..end]);
        self.midstate.finish(&work[..tail.len()])
    }
}

/// Evaluate a single lane without keeping a prepared kernel around.
pub fn evaluate_lane(
    variant: KernelVariant,
    params: KernelParams<'_>,
    base_nonce: u64,
    lane: u64,
) -> LaneResult {
    PreparedKernel::new(variant, params).evaluate(base_nonce, lane)
}

/// Write a lane result in the full record layout.
pub fn encode_lane_record(result: &LaneResult, out: &mut [u8; LANE_RECORD_SIZE]) {
    match result {
        LaneResult::NotFound => *out = [0u8; LANE_RECORD_SIZE],
        LaneResult::Found { nonce, digest } => {
            out[0] = 1;
            out[1..9].copy_from_slice(&nonce.to_be_bytes());
            out[9..].copy_from_slice(digest);
        }
    }
}

/// Read a lane result from the full record layout.
///
/// Returns `None` if `record` is shorter than [`LANE_RECORD_SIZE`].
pub fn decode_lane_record(record: &[u8]) -> Option<LaneResult> {
    let record = record.get(..LANE_RECORD_SIZE)?;
    if record[0] != 1 {
        return Some(LaneResult::NotFound);
    }
    let mut nonce = [0u8; 8];
    nonce.copy_from_slice(&record[1..9]);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&record[9..]);
    Some(LaneResult::Found {
        nonce: u64::from_be_bytes(nonce),
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSG: &[u8] = br#"[0,"ab",1,1,[["nonce","00000","0"]],"hello"]"#;

    fn params(difficulty: u32) -> KernelParams<'static> {
        KernelParams {
            message: MSG,
            nonce_offset: 23,
            digit_width: 5,
            difficulty,
        }
    }

    #[test]
    fn test_placeholder_offset_fixture() {
        assert_eq!(&MSG[23..28], b"00000");
    }

    #[test]
    fn test_lane_hashes_substituted_message() {
        let result = evaluate_lane(KernelVariant::Generic, params(0), 40, 2);
        let mut expected = MSG.to_vec();
        expected[23..28].copy_from_slice(b"00042");

        assert_eq!(
            result,
            LaneResult::Found {
                nonce: 42,
                digest: digest(&expected)
            }
        );
    }

    #[test]
    fn test_out_of_range_nonce_not_found() {
        assert_eq!(
            evaluate_lane(KernelVariant::Generic, params(0), 99_999, 1),
            LaneResult::NotFound
        );
        assert_eq!(
            evaluate_lane(KernelVariant::Midstate, params(0), u64::MAX, 1),
            LaneResult::NotFound
        );
    }

    #[test]
    fn test_oversized_message_not_found() {
        let big = [b'0'; MAX_MESSAGE_LEN + 1];
        let p = KernelParams {
            message: &big,
            nonce_offset: 0,
            digit_width: 5,
            difficulty: 0,
        };
        assert!(!p.is_runnable());
        assert_eq!(evaluate_lane(KernelVariant::Generic, p, 0, 0), LaneResult::NotFound);
    }

    #[test]
    fn test_width_beyond_kernel_limit_not_found() {
        let msg = [b'0'; 64];
        let p = KernelParams {
            message: &msg,
            nonce_offset: 0,
            digit_width: MAX_NONCE_DIGITS + 1,
            difficulty: 0,
        };
        assert_eq!(evaluate_lane(KernelVariant::Midstate, p, 0, 0), LaneResult::NotFound);
    }

    #[test]
    fn test_variants_agree() {
        let msg: Vec<u8> = (0..500u32)
            .map(|i| if (200..210).contains(&i) { b'0' } else { b'a' + (i % 26) as u8 })
            .collect();
        let p = KernelParams {
            message: &msg,
            nonce_offset: 200,
            digit_width: 10,
            difficulty: 0,
        };
        let generic = PreparedKernel::new(KernelVariant::Generic, p);
        let midstate = PreparedKernel::new(KernelVariant::Midstate, p);
        for lane in 0..32 {
            assert_eq!(
                generic.evaluate(1_000_000_000, lane),
                midstate.evaluate(1_000_000_000, lane)
            );
        }
    }

    #[test]
    fn test_lane_is_idempotent() {
        let kernel = PreparedKernel::new(KernelVariant::Midstate, params(0));
        assert_eq!(kernel.evaluate(10_000, 7), kernel.evaluate(10_000, 7));
    }

    #[test]
    fn test_lane_record_layout() {
        let found = LaneResult::Found {
            nonce: 0x0102_0304_0506_0708,
            digest: [0xAB; 32],
        };
        let mut record = [0xFFu8; LANE_RECORD_SIZE];
        encode_lane_record(&found, &mut record);
        assert_eq!(record[0], 1);
        assert_eq!(&record[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(decode_lane_record(&record), Some(found));

        encode_lane_record(&LaneResult::NotFound, &mut record);
        assert_eq!(decode_lane_record(&record), Some(LaneResult::NotFound));
        assert_eq!(decode_lane_record(&record[..40]), None);
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("Generic".parse(), Ok(KernelVariant::Generic));
        assert_eq!("midstate".parse(), Ok(KernelVariant::Midstate));
        assert_eq!("fast".parse::<KernelVariant>(), Err(UnknownVariant));
    }
}
