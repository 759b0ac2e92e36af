//! Block headers (BH): the per-round artifact that discloses the proposer's
//! training secret and bundles enough peer training declarations to reach
//! `EMPLOYER_CONFIDENCE`.

use serde::{Deserialize, Serialize};

use crate::crypto::{self, Hash256, KeyPair, PublicKey, Signature};
use crate::message::PotMessage;

use super::{BH_COINSTAKE_LOG2, CoinstakeLog2, TrainingDeclaration, meets_difficulty};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id_m: String,
    pub id_s: String,
    pub public_key: PublicKey,
    pub timestamp: u64,
    pub coinstake_log2: CoinstakeLog2,
    pub parent_block_hash: Hash256,
    pub block_index: u64,
    /// Cleartext training secret. Publishing it lets any peer verify every
    /// enclosed TD's commitment.
    pub training_secret: [u8; 32],
    pub training_declarations: Vec<TrainingDeclaration>,
    pub signature: Signature,
}

impl BlockHeader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id_m: impl Into<String>,
        id_s: impl Into<String>,
        keypair: &KeyPair,
        timestamp: u64,
        parent_block_hash: Hash256,
        block_index: u64,
        training_secret: [u8; 32],
        training_declarations: Vec<TrainingDeclaration>,
    ) -> Self {
        let mut bh = BlockHeader {
            id_m: id_m.into(),
            id_s: id_s.into(),
            public_key: keypair.public_key(),
            timestamp,
            coinstake_log2: BH_COINSTAKE_LOG2,
            parent_block_hash,
            block_index,
            training_secret,
            training_declarations,
            signature: Signature::empty(),
        };
        bh.sign(keypair);
        bh
    }

    pub fn retry_with_timestamp(&mut self, timestamp: u64, keypair: &KeyPair) {
        self.timestamp = timestamp;
        self.sign(keypair);
    }

    pub fn meets_difficulty(&self) -> bool {
        meets_difficulty(&self.calculate_hash(), self.coinstake_log2)
    }

    /// Verifies every embedded TD's commitment opens to this header's
    /// disclosed cleartext secret, under that TD's own public key.
    ///
    /// This does not reverify the embedded model hash or `id_s` match
    /// across TDs; only the commitment-opens-to-secret relation is checked,
    /// by design.
    pub fn check_included_training_declarations(&self) -> bool {
        self.training_declarations.iter().all(|td| {
            crypto::verify(
                &td.public_key,
                &self.training_secret,
                &td.training_secret_commitment,
            )
        })
    }
}

impl PotMessage for BlockHeader {
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

    fn dummy_td(keypair: &KeyPair, secret: &[u8; 32]) -> TrainingDeclaration {
        TrainingDeclaration::new("m", "m:0", keypair, 0, secret, "h")
    }

    #[test]
    fn header_verifies_own_signature() {
        let kp = KeyPair::generate();
        let secret = [9u8; 32];
        let td = dummy_td(&kp, &secret);
        let bh = BlockHeader::new(
            "m",
            "m:0",
            &kp,
            1_700_000_000,
            Hash256([0u8; 32]),
            1,
            secret,
            vec![td],
        );
        assert!(bh.verify_signature());
    }

    #[test]
    fn included_declarations_check_passes_when_commitment_matches_secret() {
        let proposer_kp = KeyPair::generate();
        let td_kp = KeyPair::generate();
        let secret = [3u8; 32];
        let td = dummy_td(&td_kp, &secret);

        let bh = BlockHeader::new(
            "m",
            "m:0",
            &proposer_kp,
            0,
            Hash256([0u8; 32]),
            1,
            secret,
            vec![td],
        );

        assert!(bh.check_included_training_declarations());
    }

    #[test]
    fn included_declarations_check_fails_for_mismatched_secret() {
        let proposer_kp = KeyPair::generate();
        let td_kp = KeyPair::generate();
        let committed_secret = [3u8; 32];
        let disclosed_secret = [4u8; 32];
        let td = dummy_td(&td_kp, &committed_secret);

        let bh = BlockHeader::new(
            "m",
            "m:0",
            &proposer_kp,
            0,
            Hash256([0u8; 32]),
            1,
            disclosed_secret,
            vec![td],
        );

        assert!(!bh.check_included_training_declarations());
    }
}
