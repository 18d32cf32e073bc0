use std::io::{self, Read};

use sha2::{Digest, Sha256};

/// Domain-separated SHA-256 hasher over length-prefixed fields.
///
/// Each field is written as its byte length (u64, big-endian) followed by the
/// bytes themselves, after a `domain:` prefix. Moving a boundary between two
/// fields therefore always changes the hashed input: `("1", "23")` and
/// `("12", "3")` cannot collide.
pub struct FieldHasher {
    domain: &'static str,
}

impl FieldHasher {
    /// Hasher for block headers.
    pub const BLOCK: Self = Self {
        domain: "vcl-block-v1",
    };
    /// Hasher for certificate id derivation.
    pub const CERTIFICATE_ID: Self = Self {
        domain: "vcl-certificate-id-v1",
    };
    /// Hasher for issuer seal messages.
    pub const SEAL: Self = Self {
        domain: "vcl-seal-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash an ordered list of fields.
    pub fn hash_fields(&self, fields: &[&[u8]]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for field in fields {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field);
        }
        hasher.finalize().into()
    }

    /// Hash an ordered list of fields and hex-encode the digest.
    pub fn hash_fields_hex(&self, fields: &[&[u8]]) -> String {
        hex::encode(self.hash_fields(fields))
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Plain SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Plain SHA-256, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Stream a reader (typically a recording on disk) through SHA-256.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash of a block header.
///
/// Numbers are rendered as decimal strings, then every field is
/// length-prefixed by [`FieldHasher::BLOCK`]. The field order is fixed.
pub fn block_hash(
    block_number: u64,
    timestamp: i64,
    payload_hash: &str,
    previous_hash: &str,
    nonce: u64,
) -> String {
    let number = block_number.to_string();
    let ts = timestamp.to_string();
    let nonce = nonce.to_string();
    FieldHasher::BLOCK.hash_fields_hex(&[
        number.as_bytes(),
        ts.as_bytes(),
        payload_hash.as_bytes(),
        previous_hash.as_bytes(),
        nonce.as_bytes(),
    ])
}

/// Compare two hex digests, ignoring case.
pub fn hashes_match(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}

/// Returns `true` for a 64-character hex string.
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Display helper: first `n` and last `n` characters joined by `...`.
///
/// Strings no longer than `2 * n` are returned unchanged.
pub fn short_hash(hash: &str, n: usize) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= n.saturating_mul(2) {
        return hash.to_string();
    }
    let head: String = chars[..n].iter().collect();
    let tail: String = chars[chars.len() - n..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn reader_matches_slice_hash() {
        let data = vec![7u8; 200_000];
        assert_eq!(sha256_reader(&data[..]).unwrap(), sha256_hex(&data));
    }

    #[test]
    fn block_hash_is_deterministic() {
        let a = block_hash(3, 1_700_000_000_000, &"ab".repeat(32), &"cd".repeat(32), 42);
        let b = block_hash(3, 1_700_000_000_000, &"ab".repeat(32), &"cd".repeat(32), 42);
        assert_eq!(a, b);
        assert!(is_sha256_hex(&a));
    }

    #[test]
    fn shifted_numeric_boundary_does_not_collide() {
        let a = block_hash(1, 23, "p", "q", 0);
        let b = block_hash(12, 3, "p", "q", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn shifted_string_boundary_does_not_collide() {
        let a = FieldHasher::BLOCK.hash_fields(&[b"ab", b"c"]);
        let b = FieldHasher::BLOCK.hash_fields(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn domains_separate_identical_fields() {
        let fields: [&[u8]; 2] = [b"x", b"y"];
        assert_ne!(
            FieldHasher::BLOCK.hash_fields(&fields),
            FieldHasher::CERTIFICATE_ID.hash_fields(&fields)
        );
        assert_ne!(
            FieldHasher::new("custom-v1").hash_fields(&fields),
            FieldHasher::SEAL.hash_fields(&fields)
        );
    }

    #[test]
    fn hash_comparison_ignores_case() {
        assert!(hashes_match("ABCdef", "abcDEF"));
        assert!(!hashes_match("abc", "abd"));
    }

    #[test]
    fn sha256_format_validation() {
        assert!(is_sha256_hex(&"aF".repeat(32)));
        assert!(!is_sha256_hex(&"a".repeat(63)));
        assert!(!is_sha256_hex(&"g".repeat(64)));
    }

    #[test]
    fn short_hash_trims_middle() {
        let h = "0123456789abcdef0123";
        assert_eq!(short_hash(h, 4), "0123...0123");
        assert_eq!(short_hash("abcd", 4), "abcd");
        assert_eq!(short_hash("", 8), "");
    }

    proptest! {
        #[test]
        fn moving_digits_between_number_and_timestamp_never_collides(
            a in 0u64..1_000_000,
            b in 0i64..1_000_000,
            c in 0u64..1_000_000,
            d in 0i64..1_000_000,
        ) {
            prop_assume!((a, b) != (c, d));
            prop_assert_ne!(
                block_hash(a, b, "payload", "prev", 1),
                block_hash(c, d, "payload", "prev", 1)
            );
        }

        #[test]
        fn any_payload_change_changes_the_hash(payload in "[0-9a-f]{64}", idx in 0usize..64) {
            let mut flipped: Vec<char> = payload.chars().collect();
            flipped[idx] = if flipped[idx] == '0' { '1' } else { '0' };
            let flipped: String = flipped.into_iter().collect();
            prop_assert_ne!(
                block_hash(5, 10, &payload, "prev", 9),
                block_hash(5, 10, &flipped, "prev", 9)
            );
        }
    }
}
