//! Stakeholder signatures (SS): a committee member's endorsement of a block
//! header.
//!
//! Unlike the other message kinds, an SS's signature is **not** over its own
//! canonical bytes — it is over `block_header.dumps_without_sig()`. It does
//! not implement [`crate::message::PotMessage`] for that reason; it carries
//! its own narrower sign/verify pair instead.

use serde::{Deserialize, Serialize};

use crate::crypto::{self, KeyPair, PublicKey, Signature};
use crate::message::PotMessage;
use crate::pos::BlockHeader;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakeholderSignature {
    pub block_header: BlockHeader,
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl StakeholderSignature {
    /// Signs `block_header.dumps_without_sig()` with `keypair`.
    pub fn sign(block_header: BlockHeader, keypair: &KeyPair) -> Self {
        let message = block_header.dumps_without_sig();
        let signature = keypair.sign(&message);
        StakeholderSignature {
            block_header,
            public_key: keypair.public_key(),
            signature,
        }
    }

    /// Verifies that `signature` is a valid Ed25519 signature of
    /// `block_header.dumps_without_sig()` under `public_key`.
    pub fn verify(&self) -> bool {
        let message = self.block_header.dumps_without_sig();
        crypto::verify(&self.public_key, &message, &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Hash256;

    fn dummy_header(keypair: &KeyPair) -> BlockHeader {
        BlockHeader::new("m", "m:0", keypair, 0, Hash256([0u8; 32]), 1, [1u8; 32], vec![])
    }

    #[test]
    fn signature_verifies_against_the_header_it_signs() {
        let proposer_kp = KeyPair::generate();
        let header = dummy_header(&proposer_kp);
        let stakeholder_kp = KeyPair::generate();
        let ss = StakeholderSignature::sign(header, &stakeholder_kp);
        assert!(ss.verify());
    }

    #[test]
    fn signature_does_not_verify_under_a_different_key() {
        let proposer_kp = KeyPair::generate();
        let header = dummy_header(&proposer_kp);
        let stakeholder_kp = KeyPair::generate();
        let mut ss = StakeholderSignature::sign(header, &stakeholder_kp);
        ss.public_key = KeyPair::generate().public_key();
        assert!(!ss.verify());
    }
}
