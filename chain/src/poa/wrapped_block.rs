//! Wrapped blocks (WB): the PoA-finalized payload broadcast by the Roy
//! stakeholder and appended by every peer.

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::message::PotMessage;
use crate::pos::BlockHeader;
use crate::types::Transaction;

use super::StakeholderSignature;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedBlock {
    pub block_header: BlockHeader,
    pub coinbase_transaction: Transaction,
    pub transactions: Vec<Transaction>,
    pub stakeholders_signatures: Vec<StakeholderSignature>,
    pub public_key: PublicKey,
    pub timestamp: u64,
    pub signature: Signature,
}

impl WrappedBlock {
    pub fn new(
        block_header: BlockHeader,
        coinbase_transaction: Transaction,
        transactions: Vec<Transaction>,
        stakeholders_signatures: Vec<StakeholderSignature>,
        keypair: &KeyPair,
        timestamp: u64,
    ) -> Self {
        let mut wb = WrappedBlock {
            block_header,
            coinbase_transaction,
            transactions,
            stakeholders_signatures,
            public_key: keypair.public_key(),
            timestamp,
            signature: Signature::empty(),
        };
        wb.sign(keypair);
        wb
    }

    /// Every enclosed stakeholder signature must verify against the
    /// enclosed header.
    pub fn verify_stakeholder_signatures(&self) -> bool {
        self.stakeholders_signatures.iter().all(|ss| ss.verify())
    }
}

impl PotMessage for WrappedBlock {
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
    use crate::crypto::Hash256;
    use crate::types::{CoinbaseUser, EmployeeUser};

    fn dummy_header(keypair: &KeyPair) -> BlockHeader {
        BlockHeader::new("m", "m:0", keypair, 0, Hash256([0u8; 32]), 1, [1u8; 32], vec![])
    }

    #[test]
    fn wrapped_block_with_valid_stakeholder_signatures_verifies() {
        let proposer_kp = KeyPair::generate();
        let roy_kp = KeyPair::generate();
        let header = dummy_header(&proposer_kp);
        let stakeholder_kp = KeyPair::generate();
        let ss = StakeholderSignature::sign(header.clone(), &stakeholder_kp);

        let roy = EmployeeUser::new("Roy");
        let coinbase_user = CoinbaseUser::new(1);
        let coinbase_tx = coinbase_user.create_transaction(&roy.inner, 0);

        let wb = WrappedBlock::new(header, coinbase_tx, vec![], vec![ss], &roy_kp, 0);

        assert!(wb.verify_signature());
        assert!(wb.verify_stakeholder_signatures());
    }

    #[test]
    fn wrapped_block_rejects_tampered_stakeholder_signature() {
        let proposer_kp = KeyPair::generate();
        let roy_kp = KeyPair::generate();
        let header = dummy_header(&proposer_kp);
        let stakeholder_kp = KeyPair::generate();
        let mut ss = StakeholderSignature::sign(header.clone(), &stakeholder_kp);
        ss.public_key = KeyPair::generate().public_key();

        let roy = EmployeeUser::new("Roy");
        let coinbase_user = CoinbaseUser::new(1);
        let coinbase_tx = coinbase_user.create_transaction(&roy.inner, 0);

        let wb = WrappedBlock::new(header, coinbase_tx, vec![], vec![ss], &roy_kp, 0);
        assert!(!wb.verify_stakeholder_signatures());
    }
}
