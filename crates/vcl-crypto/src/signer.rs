use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hasher::FieldHasher;

/// Ed25519 signing key (private) held by a certificate issuer.
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// Ed25519 signature. Serialized as lowercase hex.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

/// Message an issuer signs for a certificate: the seal-domain hash of the
/// certificate id and the hash of the block anchoring it.
pub fn seal_message(certificate_id: &str, block_hash: &str) -> [u8; 32] {
    FieldHasher::SEAL.hash_fields(&[certificate_id.as_bytes(), block_hash.as_bytes()])
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a 64-character hex secret.
    pub fn from_hex(hex_secret: &str) -> Result<Self, SignatureError> {
        Ok(Self::from_bytes(decode_fixed(hex_secret)?))
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message))
    }

    /// Seal a certificate anchored at `block_hash`.
    pub fn seal(&self, certificate_id: &str, block_hash: &str) -> Signature {
        self.sign(&seal_message(certificate_id, block_hash))
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(message, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Verify an issuer seal for a certificate.
    pub fn verify_seal(
        &self,
        certificate_id: &str,
        block_hash: &str,
        signature: &Signature,
    ) -> Result<(), SignatureError> {
        self.verify(&seal_message(certificate_id, block_hash), signature)
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, SignatureError> {
        Self::from_bytes(decode_fixed(hex_key)?)
    }
}

impl Signature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    pub fn from_hex(hex_sig: &str) -> Result<Self, SignatureError> {
        let bytes: [u8; 64] = decode_fixed(hex_sig)?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&bytes)))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], SignatureError> {
    let bytes = hex::decode(value).map_err(|e| SignatureError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| SignatureError::InvalidLength { expected: N, actual })
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        let sig = sk.sign(b"hello world");
        assert!(vk.verify(b"hello world", &sig).is_ok());
    }

    #[test]
    fn seal_binds_certificate_and_block() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        let block_hash = "ab".repeat(32);
        let seal = sk.seal("0123456789abcdef", &block_hash);
        assert!(vk.verify_seal("0123456789abcdef", &block_hash, &seal).is_ok());
        assert_eq!(
            vk.verify_seal("0123456789abcdee", &block_hash, &seal),
            Err(SignatureError::InvalidSignature)
        );
        assert_eq!(
            vk.verify_seal("0123456789abcdef", &"cd".repeat(32), &seal),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let sk1 = SigningKey::generate();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign(b"message");
        assert!(sk2.verifying_key().verify(b"message", &sig).is_err());
    }

    #[test]
    fn hex_roundtrips() {
        let sk = SigningKey::generate();
        let sk2 = SigningKey::from_hex(&hex::encode(sk.as_bytes())).unwrap();
        assert_eq!(sk.verifying_key(), sk2.verifying_key());

        let vk = sk.verifying_key();
        assert_eq!(VerifyingKey::from_hex(&vk.to_hex()).unwrap(), vk);

        let sig = sk.sign(b"m");
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(matches!(
            VerifyingKey::from_hex("zz"),
            Err(SignatureError::InvalidHex(_))
        ));
        assert_eq!(
            Signature::from_hex("abcd").unwrap_err(),
            SignatureError::InvalidLength {
                expected: 64,
                actual: 2
            }
        );
    }

    #[test]
    fn signature_serializes_as_hex_string() {
        let sig = SigningKey::generate().sign(b"test");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", sig.to_hex()));
        let parsed: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(sig, parsed);
    }

    #[test]
    fn debug_redacts_signing_key() {
        let debug = format!("{:?}", SigningKey::generate());
        assert!(debug.contains("redacted"));
    }
}
