//! Dispatching a kernel across a batch of lanes on the host
//!
//! A batch covers `[base_nonce, base_nonce + lanes)`; lane `i` tests nonce
//! `base_nonce + i`. Hits always come back in ascending lane order no matter
//! how lanes were scheduled.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::kernel::{LaneResult, PreparedKernel, ResultLayout, decode_lane_record};
use crate::params::LANE_RECORD_SIZE;
use crate::sha256::Digest;

/// Sentinel for "no lane found anything" in the compact layout
pub const NO_HIT: u32 = u32::MAX;

/// A lane that reported a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneHit {
    pub lane: usize,
    pub nonce: u64,
    /// Kernel-computed digest; `None` when the layout leaves it to the host
    pub digest: Option<Digest>,
}

/// Harvested results of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResults {
    /// Number of lanes dispatched
    pub lanes: usize,
    /// Hits, sorted by lane
    pub hits: Vec<LaneHit>,
}

impl BatchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Lowest hit lane, if any
    pub fn first(&self) -> Option<&LaneHit> {
        self.hits.first()
    }
}

fn hit(kernel: &PreparedKernel<'_>, base_nonce: u64, lane: usize) -> Option<LaneHit> {
    match kernel.evaluate(base_nonce, lane as u64) {
        LaneResult::Found { nonce, digest } => Some(LaneHit {
            lane,
            nonce,
            digest: Some(digest),
        }),
        LaneResult::NotFound => None,
    }
}

/// Run `lanes` lanes of `kernel` and harvest the hits in the kernel's layout.
#[cfg(feature = "parallel")]
pub fn run_batch(kernel: &PreparedKernel<'_>, base_nonce: u64, lanes: usize) -> BatchResults {
    let hits = match kernel.variant().result_layout() {
        ResultLayout::Full => (0..lanes)
            .into_par_iter()
            .filter_map(|lane| hit(kernel, base_nonce, lane))
            .collect(),
        ResultLayout::Compact => (0..lanes)
            .into_par_iter()
            .find_first(|&lane| kernel.evaluate(base_nonce, lane as u64).is_found())
            .map(|lane| compact_hit(base_nonce, lane))
            .into_iter()
            .collect(),
    };
    BatchResults { lanes, hits }
}

/// Run `lanes` lanes of `kernel` and harvest the hits in the kernel's layout.
#[cfg(not(feature = "parallel"))]
pub fn run_batch(kernel: &PreparedKernel<'_>, base_nonce: u64, lanes: usize) -> BatchResults {
    let hits = match kernel.variant().result_layout() {
        ResultLayout::Full => (0..lanes)
            .filter_map(|lane| hit(kernel, base_nonce, lane))
            .collect(),
        ResultLayout::Compact => (0..lanes)
            .find(|&lane| kernel.evaluate(base_nonce, lane as u64).is_found())
            .map(|lane| compact_hit(base_nonce, lane))
            .into_iter()
            .collect(),
    };
    BatchResults { lanes, hits }
}

fn compact_hit(base_nonce: u64, lane: usize) -> LaneHit {
    LaneHit {
        lane,
        nonce: base_nonce.wrapping_add(lane as u64),
        digest: None,
    }
}

/// Collect hits from a buffer of full lane records.
///
/// Only the first `lanes` records are inspected.
pub fn hits_from_records(records: &[u8], lanes: usize) -> Vec<LaneHit> {
    records
        .chunks_exact(LANE_RECORD_SIZE)
        .take(lanes)
        .enumerate()
        .filter_map(|(lane, record)| match decode_lane_record(record) {
            Some(LaneResult::Found { nonce, digest }) => Some(LaneHit {
                lane,
                nonce,
                digest: Some(digest),
            }),
            _ => None,
        })
        .collect()
}

/// Convert a compact found-index into a hit.
pub fn hit_from_index(base_nonce: u64, index: u32, lanes: usize) -> Option<LaneHit> {
    let lane = index as usize;
    (index != NO_HIT && lane < lanes).then(|| compact_hit(base_nonce, lane))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelParams, KernelVariant, encode_lane_record};

    fn message() -> Vec<u8> {
        let mut m = br#"[0,"pk",1,1,[["nonce","00000","1"]],"batch"]"#.to_vec();
        m.extend_from_slice(&[b'z'; 100]);
        m
    }

    fn params(message: &[u8], difficulty: u32) -> KernelParams<'_> {
        let nonce_offset = message.windows(5).position(|w| w == b"00000").unwrap();
        KernelParams {
            message,
            nonce_offset,
            digit_width: 5,
            difficulty,
        }
    }

    #[test]
    fn test_difficulty_zero_hits_lane_zero() {
        let m = message();
        for variant in KernelVariant::ALL {
            let kernel = PreparedKernel::new(variant, params(&m, 0));
            let results = run_batch(&kernel, 10_000, 100);
            assert_eq!(results.lanes, 100);
            let first = results.first().unwrap();
            assert_eq!(first.lane, 0);
            assert_eq!(first.nonce, 10_000);
        }
    }

    #[test]
    fn test_full_layout_hits_sorted() {
        let m = message();
        let kernel = PreparedKernel::new(KernelVariant::Generic, params(&m, 2));
        let results = run_batch(&kernel, 10_000, 2_000);
        assert!(!results.is_empty());
        assert!(results.hits.windows(2).all(|w| w[0].lane < w[1].lane));
        for h in &results.hits {
            assert_eq!(h.nonce, 10_000 + h.lane as u64);
            assert!(h.digest.is_some());
        }
    }

    #[test]
    fn test_compact_layout_reports_lowest_full_hit() {
        let m = message();
        let full = run_batch(&PreparedKernel::new(KernelVariant::Generic, params(&m, 4)), 10_000, 5_000);
        let compact = run_batch(&PreparedKernel::new(KernelVariant::Midstate, params(&m, 4)), 10_000, 5_000);

        assert!(compact.hits.len() <= 1);
        assert_eq!(full.first().map(|h| h.lane), compact.first().map(|h| h.lane));
        assert!(compact.hits.iter().all(|h| h.digest.is_none()));
    }

    #[test]
    fn test_partial_last_batch_stops_at_width() {
        let m = message();
        let kernel = PreparedKernel::new(KernelVariant::Generic, params(&m, 0));
        let results = run_batch(&kernel, 99_990, 100);
        assert_eq!(results.hits.len(), 10);
        assert_eq!(results.hits.last().unwrap().nonce, 99_999);
    }

    #[test]
    fn test_hits_from_records() {
        let mut buf = vec![0u8; LANE_RECORD_SIZE * 4];
        let mut record = [0u8; LANE_RECORD_SIZE];
        encode_lane_record(
            &LaneResult::Found {
                nonce: 12,
                digest: [0; 32],
            },
            &mut record,
        );
        buf[LANE_RECORD_SIZE * 2..LANE_RECORD_SIZE * 3].copy_from_slice(&record);

        let hits = hits_from_records(&buf, 4);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].lane, 2);
        assert_eq!(hits[0].nonce, 12);

        assert!(hits_from_records(&buf, 2).is_empty());
    }

    #[test]
    fn test_hit_from_index() {
        assert_eq!(hit_from_index(100, NO_HIT, 10), None);
        assert_eq!(hit_from_index(100, 10, 10), None);
        assert_eq!(hit_from_index(100, 3, 10).map(|h| h.nonce), Some(103));
    }
}
