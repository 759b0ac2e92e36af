//! The hashable-signable message base shared by every PoS/PoA message kind.
//!
//! `TrainingDeclaration`, `BlockHeader`, `StakeholderSignature`, and
//! `WrappedBlock` all implement [`PotMessage`] instead of hand-rolling their
//! own hash/sign/verify boilerplate. The canonical encoding is bincode 2 over
//! the message with its signature field zeroed, the same way a UTXO ledger
//! derives its signing message by clearing signature fields before
//! serializing.

use serde::Serialize;

use crate::crypto::{self, Hash256, KeyPair, PublicKey, Signature};

/// Operations shared by every signed, hashable protocol message.
///
/// Implementors only need to provide access to their own `signature` and
/// `public_key` fields; the rest follow mechanically.
pub trait PotMessage: Serialize + Clone {
    fn signature(&self) -> &Signature;
    fn set_signature(&mut self, sig: Signature);
    fn public_key(&self) -> &PublicKey;

    /// Deterministic canonical encoding with the signature field zeroed.
    fn dumps_without_sig(&self) -> Vec<u8> {
        let mut clone = self.clone();
        clone.set_signature(Signature::empty());
        bincode::serde::encode_to_vec(&clone, bincode::config::standard())
            .expect("protocol messages are always serializable")
    }

    /// SHA-256 of [`Self::dumps_without_sig`].
    fn calculate_hash(&self) -> Hash256 {
        Hash256::compute(&self.dumps_without_sig())
    }

    /// Signs `dumps_without_sig()` with `keypair` and stores the result.
    fn sign(&mut self, keypair: &KeyPair) {
        let bytes = self.dumps_without_sig();
        let sig = keypair.sign(&bytes);
        self.set_signature(sig);
    }

    /// First 8 hex characters of the hash, for logging.
    fn get_id(&self) -> String {
        self.calculate_hash().short_id()
    }

    /// Verifies this message's own signature against its own public key.
    fn verify_signature(&self) -> bool {
        crypto::verify(self.public_key(), &self.dumps_without_sig(), self.signature())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde::Deserialize;

    /// Minimal `PotMessage` used only to exercise the base trait in
    /// isolation from any real protocol message.
    #[derive(Clone, Serialize, Deserialize)]
    pub struct Ping {
        pub nonce: u64,
        pub public_key: PublicKey,
        pub signature: Signature,
    }

    impl PotMessage for Ping {
        fn signature(&self) -> &Signature {
            &self.signature
        }
        fn set_signature(&mut self, sig: Signature) {
            self.signature = sig;
        }
        fn public_key(&self) -> &PublicKey {
            &self.public_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::Ping;
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = KeyPair::generate();
        let mut ping = Ping {
            nonce: 7,
            public_key: kp.public_key(),
            signature: Signature::empty(),
        };
        ping.sign(&kp);
        assert!(ping.verify_signature());
    }

    #[test]
    fn get_id_is_first_eight_hex_chars_of_hash() {
        let kp = KeyPair::generate();
        let mut ping = Ping {
            nonce: 1,
            public_key: kp.public_key(),
            signature: Signature::empty(),
        };
        ping.sign(&kp);
        let hash = ping.calculate_hash();
        assert_eq!(ping.get_id(), hash.short_id());
        assert_eq!(ping.get_id().len(), 8);
    }

    #[test]
    fn dumps_without_sig_is_independent_of_current_signature() {
        let kp = KeyPair::generate();
        let mut ping = Ping {
            nonce: 1,
            public_key: kp.public_key(),
            signature: Signature::empty(),
        };
        let before = ping.dumps_without_sig();
        ping.sign(&kp);
        let after = ping.dumps_without_sig();
        assert_eq!(before, after);
    }
}
