//! The append-only chain: genesis construction, fork-tolerant append, and
//! the follow-the-coin committee draw.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::crypto::Hash256;
use crate::poa::{StakeholderSignature, WrappedBlock};
use crate::pos::BlockHeader;
use crate::types::Transaction;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash256,
    pub timestamp: u64,
    pub header: Option<BlockHeader>,
    pub coinbase_tx: Option<Transaction>,
    pub transactions: Vec<Transaction>,
    pub stakeholder_sigs: Vec<StakeholderSignature>,
    pub hash: Hash256,
}

/// Encoding used only to derive `Block::hash`; never stored or sent.
#[derive(Serialize)]
struct BlockPreimage<'a> {
    index: u64,
    previous_hash: &'a Hash256,
    timestamp: u64,
    header: &'a Option<BlockHeader>,
    coinbase_tx: &'a Option<Transaction>,
    transactions: &'a [Transaction],
    stakeholder_sigs: &'a [StakeholderSignature],
}

impl Block {
    fn build(
        index: u64,
        previous_hash: Hash256,
        timestamp: u64,
        header: Option<BlockHeader>,
        coinbase_tx: Option<Transaction>,
        transactions: Vec<Transaction>,
        stakeholder_sigs: Vec<StakeholderSignature>,
    ) -> Block {
        let preimage = BlockPreimage {
            index,
            previous_hash: &previous_hash,
            timestamp,
            header: &header,
            coinbase_tx: &coinbase_tx,
            transactions: &transactions,
            stakeholder_sigs: &stakeholder_sigs,
        };
        let bytes = bincode::serde::encode_to_vec(&preimage, bincode::config::standard())
            .expect("block preimage is always serializable");
        let hash = Hash256::compute(&bytes);
        Block {
            index,
            previous_hash,
            timestamp,
            header,
            coinbase_tx,
            transactions,
            stakeholder_sigs,
            hash,
        }
    }

    /// The genesis sentinel hash: there is no real parent, so `previous_hash`
    /// is derived from the literal placeholder bytes `b"0"` rather than any
    /// block that ever existed.
    fn genesis_previous_hash() -> Hash256 {
        Hash256::compute(b"0")
    }

    /// One block at index 0, no header, no coinbase, carrying a single
    /// amount-1 transaction per known employee name so the eligibility pool
    /// for follow-the-coin is non-empty from round 1.
    pub fn genesis(employee_names: &[String], timestamp: u64) -> Block {
        let sender = crate::types::EmployeeUser::new("Genesis A");
        let receiver = crate::types::EmployeeUser::new("Genesis B");
        let transactions = employee_names
            .iter()
            .map(|name| {
                let mut tx = sender
                    .inner
                    .create_transaction(1.0, &receiver.inner, None, timestamp);
                tx.set_employee_name(name.clone());
                tx
            })
            .collect();
        Block::build(0, Self::genesis_previous_hash(), timestamp, None, None, transactions, vec![])
    }
}

pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn genesis(employee_names: &[String], timestamp: u64) -> Chain {
        Chain {
            blocks: vec![Block::genesis(employee_names, timestamp)],
        }
    }

    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("chain always has a genesis block")
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a peer- or self-produced wrapped block onto the current tip.
    ///
    /// If `wb.block_header.parent_block_hash` does not match the current
    /// tip's hash, this logs a fork warning but proceeds regardless — the
    /// protocol does not arbitrate forks, it only reports them.
    pub fn append_wrapped(&mut self, wb: WrappedBlock, now: u64) {
        let tip_hash = self.tip().hash.clone();
        if wb.block_header.parent_block_hash.as_bytes() != tip_hash.as_bytes() {
            tracing::warn!(
                id_bh = %wb.block_header.get_id(),
                expected_parent = %tip_hash.short_id(),
                got_parent = %wb.block_header.parent_block_hash.short_id(),
                "appending wrapped block whose parent hash does not match the local tip",
            );
        }

        let block = Block::build(
            self.tip().index + 1,
            tip_hash,
            now,
            Some(wb.block_header),
            Some(wb.coinbase_transaction),
            wb.transactions,
            wb.stakeholders_signatures,
        );
        self.blocks.push(block);
    }

    /// Every non-coinbase transaction recorded anywhere on the chain, oldest
    /// first. Coinbase transactions are deliberately excluded, matching the
    /// reference implementation's `Blockchain.all_transactions` (which only
    /// ever aggregates `Block.transactions`, never `Block.coinbase_transaction`).
    pub fn all_transactions(&self) -> Vec<&Transaction> {
        self.blocks.iter().flat_map(|b| b.transactions.iter()).collect()
    }

    /// Sum of every non-coinbase transaction's amount on the chain. An
    /// ambient bookkeeping helper, not a protocol invariant.
    pub fn count_transferred_coins(&self) -> f64 {
        self.all_transactions().iter().map(|tx| tx.amount).sum()
    }

    /// Deterministic stake-weighted committee draw, seeded by `rand_source`
    /// (conventionally the hash of a block header). Draws `stakeholders_num`
    /// distinct employee names without replacement from the set of names
    /// that have ever appeared as a transaction's `employee_name`. The last
    /// drawn name is the Roy stakeholder; the rest are Normal.
    ///
    /// Returns fewer than `stakeholders_num` names if the eligibility pool
    /// is smaller than that.
    pub fn follow_the_coin(&self, rand_source: &Hash256, stakeholders_num: usize) -> Vec<String> {
        let eligible: BTreeSet<&str> = self
            .all_transactions()
            .iter()
            .filter_map(|tx| tx.employee_name.as_deref())
            .collect();
        let pool: Vec<&str> = eligible.into_iter().collect();

        let mut rng = StdRng::from_seed(*rand_source.as_bytes());
        pool.choose_multiple(&mut rng, stakeholders_num)
            .map(|name| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Employee-{i}")).collect()
    }

    #[test]
    fn genesis_has_one_transaction_per_employee() {
        let employees = names(3);
        let chain = Chain::genesis(&employees, 1_700_000_000);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.all_transactions().len(), 3);
    }

    #[test]
    fn genesis_previous_hash_is_derived_not_literal_zero_bytes() {
        let block = Block::genesis(&names(1), 0);
        assert_eq!(block.previous_hash.as_bytes(), Hash256::compute(b"0").as_bytes());
    }

    #[test]
    fn follow_the_coin_is_deterministic_given_identical_seed_and_pool() {
        let chain = Chain::genesis(&names(5), 0);
        let seed = Hash256::compute(b"round-seed");
        let a = chain.follow_the_coin(&seed, 3);
        let b = chain.follow_the_coin(&seed, 3);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn follow_the_coin_differs_across_distinct_seeds_with_overwhelming_probability() {
        let chain = Chain::genesis(&names(20), 0);
        let a = chain.follow_the_coin(&Hash256::compute(b"seed-a"), 3);
        let b = chain.follow_the_coin(&Hash256::compute(b"seed-b"), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn append_wrapped_extends_index_and_chains_hash() {
        let employees = names(2);
        let mut chain = Chain::genesis(&employees, 0);
        let tip_hash = chain.tip().hash.clone();

        let proposer_kp = crate::crypto::KeyPair::generate();
        let header = BlockHeader::new(
            "m",
            "m:0",
            &proposer_kp,
            1,
            tip_hash.clone(),
            1,
            [7u8; 32],
            vec![],
        );
        let roy_kp = crate::crypto::KeyPair::generate();
        let roy = crate::types::EmployeeUser::new("Roy");
        let coinbase_tx = crate::types::CoinbaseUser::new(1).create_transaction(&roy.inner, 1);
        let wb = WrappedBlock::new(header, coinbase_tx, vec![], vec![], &roy_kp, 1);

        chain.append_wrapped(wb, 1);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.tip().index, 1);
        assert_eq!(chain.tip().previous_hash.as_bytes(), tip_hash.as_bytes());
    }

    #[test]
    fn append_wrapped_with_mismatched_parent_still_appends() {
        let employees = names(1);
        let mut chain = Chain::genesis(&employees, 0);

        let proposer_kp = crate::crypto::KeyPair::generate();
        let bogus_parent = Hash256::compute(b"not-the-tip");
        let header = BlockHeader::new("m", "m:0", &proposer_kp, 1, bogus_parent, 1, [0u8; 32], vec![]);
        let roy_kp = crate::crypto::KeyPair::generate();
        let roy = crate::types::EmployeeUser::new("Roy");
        let coinbase_tx = crate::types::CoinbaseUser::new(1).create_transaction(&roy.inner, 1);
        let wb = WrappedBlock::new(header, coinbase_tx, vec![], vec![], &roy_kp, 1);

        chain.append_wrapped(wb, 1);
        assert_eq!(chain.len(), 2, "fork warning must not block the append");
    }
}
