//! Nostr events and their canonical serialization
//!
//! The event id is the SHA-256 of `[0,"<pubkey>",<created_at>,<kind>,<tags>,"<content>"]`
//! with no whitespace. The miner writes a `nonce` tag into the tag list,
//! serializes, and hands the kernel the byte offset of the nonce digits.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::algorithm::{leading_zero_bits, leading_zero_bits_hex, Digest};

/// Tag name carrying the proof-of-work nonce
pub const NONCE_TAG: &str = "nonce";

/// A tag is an ordered list of strings, the first being its name
pub type Tag = Vec<String>;

/// A Nostr event as read from and written to JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub kind: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sig: String,
}

impl Event {
    /// Parse an event from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Render the event as a single line of JSON.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Canonical serialization used for the event id.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.content.len() + self.pubkey.len());

        out.extend_from_slice(b"[0,");
        write_string(&mut out, &self.pubkey);
        out.push(b',');
        out.extend_from_slice(self.created_at.to_string().as_bytes());
        out.push(b',');
        out.extend_from_slice(self.kind.to_string().as_bytes());
        out.push(b',');

        out.push(b'[');
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.push(b'[');
            for (j, item) in tag.iter().enumerate() {
                if j > 0 {
                    out.push(b',');
                }
                write_string(&mut out, item);
            }
            out.push(b']');
        }
        out.push(b']');

        out.push(b',');
        write_string(&mut out, &self.content);
        out.push(b']');
        out
    }

    /// Event id computed from the canonical serialization.
    pub fn compute_id(&self) -> Digest {
        Sha256::digest(self.serialize()).into()
    }

    /// Lowercase hex of [`Event::compute_id`].
    pub fn compute_id_hex(&self) -> String {
        hex::encode(self.compute_id())
    }

    /// The first `nonce` tag, if any.
    pub fn nonce_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|tag| is_nonce_tag(tag))
    }

    /// Remove every `nonce` tag.
    pub fn strip_nonce_tags(&mut self) {
        self.tags.retain(|tag| !is_nonce_tag(tag));
    }

    /// Replace any `nonce` tags with exactly one `["nonce", nonce, difficulty]`.
    pub fn set_nonce_tag(&mut self, nonce: &str, difficulty: u32) {
        self.strip_nonce_tags();
        self.tags.push(vec![
            NONCE_TAG.to_string(),
            nonce.to_string(),
            difficulty.to_string(),
        ]);
    }

    /// Leading zero bits of the `id` field as it currently stands.
    pub fn id_difficulty(&self) -> Option<u32> {
        leading_zero_bits_hex(&self.id)
    }

    /// Difficulty the event commits to in its nonce tag.
    ///
    /// `None` when there is no complete nonce tag, the target does not parse,
    /// or the id does not actually reach the target.
    pub fn committed_difficulty(&self) -> Option<u32> {
        let tag = self.nonce_tag()?;
        let target: u32 = tag.get(2)?.parse().ok()?;
        let actual = self.id_difficulty()?;
        (target <= actual).then_some(target)
    }
}

fn is_nonce_tag(tag: &Tag) -> bool {
    tag.first().is_some_and(|name| name == NONCE_TAG)
}

/// Append `s` as a JSON string literal with the escaping the id is defined over.
pub fn write_string(out: &mut Vec<u8>, s: &str) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    out.push(b'"');
    for &b in s.as_bytes() {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x09 => out.extend_from_slice(b"\\t"),
            0x0A => out.extend_from_slice(b"\\n"),
            0x0C => out.extend_from_slice(b"\\f"),
            0x0D => out.extend_from_slice(b"\\r"),
            0x00..=0x1F => {
                out.extend_from_slice(b"\\u00");
                out.push(HEX[(b >> 4) as usize]);
                out.push(HEX[(b & 0x0F) as usize]);
            }
            _ => out.push(b),
        }
    }
    out.push(b'"');
}

/// Byte offset of the nonce digits in a serialized event.
///
/// Matches the serialized tag prefix `["nonce","<placeholder>"` rather than
/// the bare digits, so a run of zeros in the pubkey or content cannot be
/// mistaken for the placeholder.
pub fn locate_nonce_placeholder(serialized: &[u8], placeholder: &str) -> Option<usize> {
    let mut needle = Vec::with_capacity(placeholder.len() + 12);
    needle.extend_from_slice(b"[\"nonce\",\"");
    let digits_at = needle.len();
    needle.extend_from_slice(placeholder.as_bytes());
    needle.push(b'"');

    serialized
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map(|start| start + digits_at)
}

/// Check an id digest against a difficulty, as the kernel does.
pub fn id_meets_difficulty(id: &Digest, difficulty: u32) -> bool {
    leading_zero_bits(id) >= difficulty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event {
            pubkey: "ab".to_string(),
            created_at: 1,
            kind: 1,
            tags: vec![],
            content: "hello".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_canonical_form() {
        let mut event = sample();
        event.tags = vec![vec!["p".into(), "cd".into(), "".into()], vec!["t".into()]];
        assert_eq!(
            event.serialize(),
            br#"[0,"ab",1,1,[["p","cd",""],["t"]],"hello"]"#.to_vec()
        );
    }

    #[test]
    fn test_escaping() {
        let mut out = Vec::new();
        write_string(&mut out, "a\"b\\c\n\t\r\u{8}\u{c}\u{1}\u{1f}é<>&");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"a\\\"b\\\\c\\n\\t\\r\\b\\f\\u0001\\u001fé<>&\""
        );
    }

    #[test]
    fn test_compute_id_matches_known_event() {
        // NIP-01 id over an empty note
        let event = Event {
            pubkey: "0000000000000000000000000000000000000000000000000000000000000000".into(),
            created_at: 0,
            kind: 1,
            ..Default::default()
        };
        let expected: [u8; 32] = Sha256::digest(
            br#"[0,"0000000000000000000000000000000000000000000000000000000000000000",0,1,[],""]"#,
        )
        .into();
        assert_eq!(event.compute_id(), expected);
        assert_eq!(event.compute_id_hex(), hex::encode(expected));
    }

    #[test]
    fn test_set_nonce_tag_replaces() {
        let mut event = sample();
        event.tags = vec![
            vec!["nonce".into(), "1".into(), "1".into()],
            vec!["t".into(), "x".into()],
            vec!["nonce".into(), "2".into()],
        ];
        event.set_nonce_tag("00000", 8);

        let nonces: Vec<_> = event.tags.iter().filter(|t| is_nonce_tag(t)).collect();
        assert_eq!(nonces.len(), 1);
        assert_eq!(nonces[0], &vec!["nonce".to_string(), "00000".into(), "8".into()]);
        assert_eq!(event.tags[0][0], "t");
    }

    #[test]
    fn test_locate_placeholder() {
        let mut event = sample();
        event.set_nonce_tag("00000", 0);
        let serialized = event.serialize();
        assert_eq!(serialized, br#"[0,"ab",1,1,[["nonce","00000","0"]],"hello"]"#.to_vec());

        let offset = locate_nonce_placeholder(&serialized, "00000").unwrap();
        assert_eq!(offset, 23);
        assert_eq!(&serialized[offset..offset + 5], b"00000");

        assert_eq!(locate_nonce_placeholder(&serialized, "000000"), None);
    }

    #[test]
    fn test_locate_ignores_zeros_elsewhere() {
        let mut event = sample();
        event.pubkey = "00000000".into();
        event.content = "00000".into();
        event.set_nonce_tag("00000", 0);
        let serialized = event.serialize();

        let offset = locate_nonce_placeholder(&serialized, "00000").unwrap();
        assert!(serialized[..offset].ends_with(br#"["nonce",""#));
    }

    #[test]
    fn test_committed_difficulty() {
        let mut event = sample();
        event.set_nonce_tag("1", 8);
        event.id = "00f0000000000000000000000000000000000000000000000000000000000000".into();
        assert_eq!(event.id_difficulty(), Some(8));
        assert_eq!(event.committed_difficulty(), Some(8));

        event.set_nonce_tag("1", 9);
        assert_eq!(event.committed_difficulty(), None);

        event.set_nonce_tag("1", 4);
        assert_eq!(event.committed_difficulty(), Some(4));

        event.strip_nonce_tags();
        assert_eq!(event.committed_difficulty(), None);
    }

    #[test]
    fn test_json_round_trip_keeps_field_order() {
        let json = br#"{"id":"","pubkey":"ab","created_at":1,"kind":1,"tags":[["t","x"]],"content":"hi","sig":""}"#;
        let event = Event::from_json(json).unwrap();
        assert_eq!(event.to_json_line().unwrap().as_bytes(), json);
    }

    #[test]
    fn test_missing_fields_default() {
        let event = Event::from_json(br#"{"content":"x"}"#).unwrap();
        assert_eq!(event.kind, 0);
        assert!(event.tags.is_empty());
    }
}
