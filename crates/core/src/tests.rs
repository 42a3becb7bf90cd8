//! Tests for the digest and kernel against reference SHA-256

use sha2::{Digest as _, Sha256};

use crate::{
    KernelParams, KernelVariant, LaneResult, PreparedKernel, digest, leading_zero_bits,
    padded_block_count,
};

fn reference(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}

#[test]
fn test_basic_digest() {
    let input = b"test input data";
    let result = digest(input);

    assert_eq!(result.len(), 32);
    assert_eq!(result, digest(input));
}

#[test]
fn test_known_vectors() {
    assert_eq!(
        hex::encode(digest(b"")),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        hex::encode(digest(b"abc")),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    // 56 bytes: padding spills into a second block
    let two_block = b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq";
    assert_eq!(padded_block_count(two_block.len()), 2);
    assert_eq!(
        hex::encode(digest(two_block)),
        "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
    );
}

#[test]
fn test_matches_reference_across_lengths() {
    let data: Vec<u8> = (0..3000u32).map(|i| (i.wrapping_mul(31) ^ (i >> 3)) as u8).collect();
    for len in (0..200).chain([511, 512, 513, 1023, 1024, 2047, 2048, 2999]) {
        assert_eq!(digest(&data[..len]), reference(&data[..len]), "len {}", len);
    }
}

#[test]
fn test_different_inputs_produce_different_digests() {
    assert_ne!(digest(b"input 1"), digest(b"input 2"));
}

#[test]
fn test_found_lane_reproduces_digest() {
    // Substituting the reported nonce at the offset and hashing with the
    // reference implementation must give the same digest and difficulty.
    let template = br#"[0,"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",1700000000,1,[["t","nostr"],["nonce","0000000000","8"]],"proof of work"]"#;
    let offset = template.windows(10).position(|w| w == b"0000000000").unwrap();

    for variant in KernelVariant::ALL {
        let kernel = PreparedKernel::new(
            variant,
            KernelParams {
                message: template,
                nonce_offset: offset,
                digit_width: 10,
                difficulty: 8,
            },
        );

        let found = (0..20_000)
            .map(|lane| kernel.evaluate(1_000_000_000, lane))
            .find(LaneResult::is_found);

        let Some(LaneResult::Found { nonce, digest }) = found else {
            panic!("no nonce with 8 leading zero bits in 20000 lanes");
        };

        let mut buf = template.to_vec();
        buf[offset..offset + 10].copy_from_slice(format!("{:010}", nonce).as_bytes());
        assert_eq!(reference(&buf), digest, "{}", variant);
        assert!(leading_zero_bits(&digest) >= 8);
    }
}

#[test]
fn test_substitution_only_touches_placeholder() {
    let template = br#"[0,"pk",1,1,[["nonce","00000","0"]],"scenario"]"#;
    let offset = template.windows(5).position(|w| w == b"00000").unwrap();
    assert_eq!(offset, 23);

    let mut buf = template.to_vec();
    crate::render_nonce(42, &mut buf[offset..offset + 5]);

    let differing: Vec<usize> = buf
        .iter()
        .zip(template.iter())
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(&buf[offset..offset + 5], b"00042");
    assert!(differing.iter().all(|i| (offset..offset + 5).contains(i)));
    assert_eq!(differing, vec![offset + 3, offset + 4]);
}

#[cfg(feature = "std")]
#[test]
fn test_batch_runner_matches_single_lanes() {
    use crate::run_batch;

    let template = br#"[0,"pk",1,1,[["nonce","000000","3"]],"batch runner"]"#;
    let offset = template.windows(6).position(|w| w == b"000000").unwrap();
    let params = KernelParams {
        message: template,
        nonce_offset: offset,
        digit_width: 6,
        difficulty: 3,
    };
    let kernel = PreparedKernel::new(KernelVariant::Generic, params);
    let results = run_batch(&kernel, 100_000, 1_000);

    let expected: Vec<u64> = (0..1_000)
        .filter_map(|lane| match kernel.evaluate(100_000, lane) {
            LaneResult::Found { nonce, .. } => Some(nonce),
            LaneResult::NotFound => None,
        })
        .collect();
    let got: Vec<u64> = results.hits.iter().map(|h| h.nonce).collect();
    assert_eq!(got, expected);
}
