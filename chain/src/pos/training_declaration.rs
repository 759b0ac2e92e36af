//! Training declarations (TD): stake-weighted PoS tickets.

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::message::PotMessage;

use super::{CoinstakeLog2, TD_COINSTAKE_LOG2, meets_difficulty};

/// A node's committed assertion that it performed training for stage `id_s`.
///
/// `training_secret_commitment` is a signature of the node's freshly
/// computed training secret under its own private key; it does not reveal
/// the secret itself. Only once a `BlockHeader` discloses the cleartext
/// secret can peers check that the commitment opens to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingDeclaration {
    /// Stable identifier of the model being trained.
    pub id_m: String,
    /// Stage id, `"<id_m>:<iteration>"`.
    pub id_s: String,
    pub public_key: PublicKey,
    pub timestamp: u64,
    pub coinstake_log2: CoinstakeLog2,
    /// Signature of the (still secret) training secret under this node's key.
    pub training_secret_commitment: Signature,
    /// Hex-encoded hash of the model weights at this iteration.
    pub h_s: String,
    pub signature: Signature,
}

impl TrainingDeclaration {
    /// Builds and self-signs a new declaration.
    pub fn new(
        id_m: impl Into<String>,
        id_s: impl Into<String>,
        keypair: &KeyPair,
        timestamp: u64,
        training_secret: &[u8; 32],
        h_s: impl Into<String>,
    ) -> Self {
        let training_secret_commitment = keypair.sign(training_secret);
        let mut td = TrainingDeclaration {
            id_m: id_m.into(),
            id_s: id_s.into(),
            public_key: keypair.public_key(),
            timestamp,
            coinstake_log2: TD_COINSTAKE_LOG2,
            training_secret_commitment,
            h_s: h_s.into(),
            signature: Signature::empty(),
        };
        td.sign(keypair);
        td
    }

    /// Re-stamps `timestamp` and re-signs, used by the difficulty retry loop.
    pub fn retry_with_timestamp(&mut self, timestamp: u64, keypair: &KeyPair) {
        self.timestamp = timestamp;
        self.sign(keypair);
    }

    pub fn meets_difficulty(&self) -> bool {
        meets_difficulty(&self.calculate_hash(), self.coinstake_log2)
    }
}

impl PotMessage for TrainingDeclaration {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_declaration_verifies_against_its_own_signature() {
        let kp = KeyPair::generate();
        let secret = [7u8; 32];
        let td = TrainingDeclaration::new("dnn-mnist", "dnn-mnist:0", &kp, 1_700_000_000, &secret, "deadbeef");
        assert!(td.verify_signature());
    }

    #[test]
    fn zero_difficulty_coinstake_always_satisfied() {
        let kp = KeyPair::generate();
        let secret = [1u8; 32];
        let mut td = TrainingDeclaration::new("m", "m:0", &kp, 0, &secret, "h");
        td.coinstake_log2 = 256;
        td.sign(&kp);
        assert!(td.meets_difficulty());
    }
}
