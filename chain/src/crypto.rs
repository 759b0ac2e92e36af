//! Cryptographic primitives shared by every PoS/PoA message kind.
//!
//! This module is deliberately small: key generation, detached sign/verify,
//! SHA-256 hashing, and a leading-zero-bit counter used by the PoS difficulty
//! predicates. Nothing here knows about training declarations, block
//! headers, or any other domain type.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length in bytes of every hash produced by this module.
pub const HASH_LEN: usize = 32;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// First 8 hex characters of the digest, used for short log identifiers.
    pub fn short_id(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Number of leading all-zero bits, scanning most-significant byte first.
    pub fn leading_zero_bits(&self) -> u32 {
        let mut count = 0u32;
        for byte in self.0.iter() {
            if *byte == 0 {
                count += 8;
            } else {
                count += byte.leading_zeros();
                break;
            }
        }
        count
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", hex::encode(self.0))
    }
}

/// Ed25519 public key, carried through the protocol in its raw 32-byte form.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::MalformedKey)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// Detached Ed25519 signature, 64 bytes.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// A signature placeholder used before a message has been signed.
    ///
    /// `dumps_without_sig()` needs a fixed-length, deterministic stand-in so
    /// that signing and hashing operate over the exact same bytes.
    pub fn empty() -> Self {
        Signature(vec![0u8; 64])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..self.0.len().min(8)]))
    }
}

/// Errors produced by the crypto primitives.
#[derive(Debug)]
pub enum CryptoError {
    /// A public key or signature had the wrong length or was not a valid
    /// point/scalar encoding.
    MalformedKey,
    /// Signature verification failed.
    BadSignature,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::MalformedKey => write!(f, "malformed public key or signature"),
            CryptoError::BadSignature => write!(f, "signature verification failed"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// An Ed25519 key pair for a single node or user.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        KeyPair { signing_key }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs `message` with the private key, returning a detached signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes().to_vec())
    }
}

/// Verifies a detached Ed25519 signature over `message`.
///
/// Returns `false` on any malformed input rather than propagating an error:
/// callers treat "does not verify" and "cannot be parsed" identically.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = public_key.to_verifying_key() else {
        return false;
    };
    let sig_bytes: [u8; 64] = match signature.0.as_slice().try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &sig).is_ok()
}

/// Number of leading zero bits in the big-endian bit representation of
/// `bytes`, i.e. the length of the longest all-zero MSB-first prefix.
pub fn count_leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0u32;
    for byte in bytes {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = KeyPair::generate();
        let msg = b"training declaration bytes";
        let sig = kp.sign(msg);
        assert!(verify(&kp.public_key(), msg, &sig));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(!verify(&kp.public_key(), b"tampered", &sig));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let sig = kp1.sign(b"msg");
        assert!(!verify(&kp2.public_key(), b"msg", &sig));
    }

    #[test]
    fn leading_zero_bits_counts_full_zero_bytes() {
        assert_eq!(count_leading_zero_bits(&[0x00, 0x00, 0x0f]), 20);
        assert_eq!(count_leading_zero_bits(&[0xff]), 0);
        assert_eq!(count_leading_zero_bits(&[0x00, 0x00]), 16);
    }

    #[test]
    fn hash256_leading_zero_bits_matches_free_function() {
        let h = Hash256([0u8; HASH_LEN]);
        assert_eq!(h.leading_zero_bits(), 256);
    }
}
