//! Identifier and nonce derivation.
//!
//! Certificate ids are the first [`CERTIFICATE_ID_LEN`] hex characters of a
//! domain-separated hash over the camera id, the issuance instant and a
//! random salt. That leaves 64 bits of id space: by the birthday bound a 50%
//! chance of any collision is reached only after roughly 2^32 (about 4.3
//! billion) certificates. The chain builder additionally checks each fresh id
//! against the store and regenerates on a hit.

use rand::Rng;
use uuid::Uuid;

use crate::hasher::FieldHasher;

/// Length of a certificate id in hex characters (64 bits).
pub const CERTIFICATE_ID_LEN: usize = 16;

/// Largest nonce handed out. Kept within 2^53 so the value survives stores
/// and clients that model numbers as IEEE doubles.
pub const MAX_NONCE: u64 = (1 << 53) - 1;

/// Derive a fresh certificate id for a camera and issuance instant.
pub fn certificate_id(camera_id: &str, issued_at: i64) -> String {
    let salt = Uuid::now_v7();
    certificate_id_with_salt(camera_id, issued_at, salt.as_bytes())
}

/// Deterministic id derivation with an explicit salt.
pub fn certificate_id_with_salt(camera_id: &str, issued_at: i64, salt: &[u8]) -> String {
    let ts = issued_at.to_string();
    let mut id =
        FieldHasher::CERTIFICATE_ID.hash_fields_hex(&[camera_id.as_bytes(), ts.as_bytes(), salt]);
    id.truncate(CERTIFICATE_ID_LEN);
    id
}

/// Random uniqueness token for a new block.
pub fn block_nonce() -> u64 {
    rand::thread_rng().gen_range(0..=MAX_NONCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_has_fixed_length_and_is_hex() {
        let id = certificate_id("CAM-1", 1_700_000_000_000);
        assert_eq!(id.len(), CERTIFICATE_ID_LEN);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn same_inputs_get_different_ids() {
        let ids: HashSet<_> = (0..100)
            .map(|_| certificate_id("CAM-1", 1_700_000_000_000))
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn salted_derivation_is_deterministic() {
        let a = certificate_id_with_salt("CAM-1", 5, b"salt");
        let b = certificate_id_with_salt("CAM-1", 5, b"salt");
        assert_eq!(a, b);
        assert_ne!(a, certificate_id_with_salt("CAM-1", 5, b"other"));
    }

    #[test]
    fn nonce_stays_in_safe_range() {
        for _ in 0..1000 {
            assert!(block_nonce() <= MAX_NONCE);
        }
    }
}
