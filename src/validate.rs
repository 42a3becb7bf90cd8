//! Host-side re-validation of kernel candidates
//!
//! Nothing the kernel reports is trusted: the candidate nonce is written into
//! a fresh copy of the event, the id is recomputed with an independent
//! SHA-256, and both the real difficulty and the committed difficulty are
//! checked before a solution is accepted.

use crate::algorithm::{fits_width, Digest};
use crate::error::ValidationError;
use crate::event::{id_meets_difficulty, Event};

/// Render `nonce` zero-padded to `width` digits.
pub fn format_nonce(nonce: u64, width: u32) -> String {
    format!("{:0width$}", nonce, width = width as usize)
}

/// Check a candidate reported for the `width`-digit tier.
///
/// `candidate_id` is the digest the kernel (or the host, for compact results)
/// claims for the event with this nonce. On success the returned event carries
/// the nonce tag and the verified id.
pub fn validate_candidate(
    event: &Event,
    nonce: u64,
    width: u32,
    candidate_id: &Digest,
    difficulty: u32,
) -> Result<Event, ValidationError> {
    if !fits_width(nonce, width) {
        return Err(ValidationError::NonceWidth { nonce, width });
    }

    let mut candidate = event.clone();
    candidate.set_nonce_tag(&format_nonce(nonce, width), difficulty);
    candidate.id = hex::encode(candidate_id);

    validate_event(&candidate, difficulty)?;
    Ok(candidate)
}

/// Check a fully formed event: its id matches its content, reaches
/// `difficulty`, and the nonce tag commits to exactly `difficulty`.
pub fn validate_event(event: &Event, difficulty: u32) -> Result<(), ValidationError> {
    let expected = event.compute_id();
    let expected_hex = hex::encode(expected);
    if expected_hex != event.id {
        return Err(ValidationError::IdMismatch {
            expected: expected_hex,
            got: event.id.clone(),
        });
    }

    if !id_meets_difficulty(&expected, difficulty) {
        return Err(ValidationError::Insufficient {
            actual: event.id_difficulty().unwrap_or(0),
            required: difficulty,
        });
    }

    let committed = event.committed_difficulty();
    if committed != Some(difficulty) {
        return Err(ValidationError::CommittedDifficulty {
            expected: difficulty,
            got: committed,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            pubkey: "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798".into(),
            created_at: 1_700_000_000,
            kind: 1,
            content: "validate me".into(),
            ..Default::default()
        }
    }

    fn id_for(event: &Event, nonce: u64, width: u32, difficulty: u32) -> Digest {
        let mut e = event.clone();
        e.set_nonce_tag(&format_nonce(nonce, width), difficulty);
        e.compute_id()
    }

    #[test]
    fn test_format_nonce() {
        assert_eq!(format_nonce(42, 5), "00042");
        assert_eq!(format_nonce(12345, 5), "12345");
    }

    #[test]
    fn test_accepts_honest_candidate_at_difficulty_zero() {
        let base = event();
        let id = id_for(&base, 10_000, 5, 0);
        let accepted = validate_candidate(&base, 10_000, 5, &id, 0).unwrap();

        assert_eq!(accepted.id, hex::encode(id));
        assert_eq!(accepted.nonce_tag().unwrap()[1], "10000");
        assert!(validate_event(&accepted, 0).is_ok());
    }

    #[test]
    fn test_rejects_wrong_digest() {
        let base = event();
        let err = validate_candidate(&base, 10_000, 5, &[0u8; 32], 0).unwrap_err();
        assert!(matches!(err, ValidationError::IdMismatch { .. }));
    }

    #[test]
    fn test_rejects_honest_digest_below_difficulty() {
        let base = event();
        // Find a nonce whose id does not reach 12 bits
        let (nonce, id) = (10_000..)
            .map(|n| (n, id_for(&base, n, 5, 12)))
            .find(|(_, id)| !id_meets_difficulty(id, 12))
            .unwrap();

        let err = validate_candidate(&base, nonce, 5, &id, 12).unwrap_err();
        assert!(matches!(err, ValidationError::Insufficient { required: 12, .. }));
    }

    #[test]
    fn test_rejects_nonce_wider_than_tier() {
        let err = validate_candidate(&event(), 100_000, 5, &[0u8; 32], 0).unwrap_err();
        assert_eq!(err, ValidationError::NonceWidth { nonce: 100_000, width: 5 });
    }

    #[test]
    fn test_committed_difficulty_must_match() {
        let base = event();
        let id = id_for(&base, 10_000, 5, 0);
        let mut accepted = validate_candidate(&base, 10_000, 5, &id, 0).unwrap();

        // Rewrite the tag to commit to nothing parseable, then fix up the id
        accepted.set_nonce_tag("10000", 0);
        accepted.tags.last_mut().unwrap()[2] = "zero".into();
        accepted.id = accepted.compute_id_hex();

        let err = validate_event(&accepted, 0).unwrap_err();
        assert_eq!(
            err,
            ValidationError::CommittedDifficulty {
                expected: 0,
                got: None
            }
        );
    }
}
