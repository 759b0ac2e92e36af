//! The node state machine ("employee"): the per-round three-phase protocol
//! run by each peer, grounded on the reference implementation's
//! `Employee.simulate()` and its helpers.
//!
//! Each node owns its state entirely — chain, books, pending pool, key
//! material, restart flag — and communicates only through its
//! [`crate::fabric::NodeHandle`]. There is no lock shared with any other
//! node's task.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::{Duration, sleep};

use crate::books::{SsBook, TdBook};
use crate::chain::Chain;
use crate::config::SimulationConfig;
use crate::crypto::KeyPair;
use crate::error::ConsensusError;
use crate::fabric::{FabricMessage, NodeHandle};
use crate::message::PotMessage;
use crate::metrics::MetricsRegistry;
use crate::poa::{StakeholderSignature, WrappedBlock};
use crate::pos::{BlockHeader, TrainingDeclaration};
use crate::training::TrainingSubstrate;
use crate::types::{CoinbaseUser, EmployeeUser, Transaction};

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_secs()
}

/// A single peer's full protocol state.
pub struct Employee<M: TrainingSubstrate> {
    name: String,
    keypair: KeyPair,
    config: SimulationConfig,
    chain: Chain,
    td_book: TdBook,
    ss_book: SsBook,
    pending_transactions: Vec<Transaction>,
    model: M,
    employee_user: EmployeeUser,
    restart_flag: bool,
    handle: NodeHandle,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<M: TrainingSubstrate> Employee<M> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        handle: NodeHandle,
        employee_names: &[String],
        genesis_timestamp: u64,
        config: SimulationConfig,
        model: M,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        let name = name.into();
        Employee {
            keypair: KeyPair::generate(),
            chain: Chain::genesis(employee_names, genesis_timestamp),
            td_book: TdBook::new(),
            ss_book: SsBook::new(),
            pending_transactions: Vec::new(),
            employee_user: EmployeeUser::new(name.clone()),
            model,
            restart_flag: false,
            handle,
            metrics,
            name,
            config,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Drives the node through rounds until its chain reaches
    /// `target_blockchain_length`, then reports its result, exits, and
    /// returns its own final chain (handy for tests and harnesses that want
    /// to compare replicas directly, alongside the single exemplar the
    /// fabric forwards to the simulation sink).
    pub async fn run(mut self) -> Vec<crate::chain::Block> {
        self.handle.send(FabricMessage::EmployeeAlive { name: self.name.clone() });
        tracing::info!(employee = %self.name, "node is alive");

        while (self.chain.len() as u64) < self.config.target_blockchain_length {
            self.run_one_round().await;
        }

        tracing::info!(
            employee = %self.name,
            chain_length = self.chain.len(),
            "reached target chain length",
        );
        self.handle
            .send(FabricMessage::ResultLocalBlockchain(self.chain.blocks().to_vec()));
        self.handle
            .send(FabricMessage::EmployeeFinished { name: self.name.clone() });
        self.chain.blocks().to_vec()
    }

    /// One pass of the three-phase round. Returns (by falling through to the
    /// end) whether the round completed naturally or aborted at a restart
    /// checkpoint; either way the caller simply loops again.
    async fn run_one_round(&mut self) {
        self.restart_flag = false;

        // Phase 1: verifiable training.
        let secret = self.model.train_one_batch();
        let id_s = self.model.id_s();
        tracing::debug!(employee = %self.name, id_s = %id_s, "performed one training batch");

        let mut td = TrainingDeclaration::new(
            self.model.id_m(),
            id_s.clone(),
            &self.keypair,
            now(),
            &secret,
            self.model.model_hash(),
        );
        td.coinstake_log2 = self.config.td_coinstake_log2;
        td.sign(&self.keypair);

        if !self.wait_for_td_difficulty(&mut td).await {
            return;
        }
        self.td_book.add(td.clone());
        self.handle.send(FabricMessage::TrainingDeclaration(td));
        tracing::info!(employee = %self.name, id_s = %id_s, "sent training declaration");

        // Phase 2: block-header production.
        self.wait_for_training_declarations(&id_s).await;
        if self.restart_flag {
            return;
        }

        let tds = self.td_book.list(&id_s);
        self.td_book.close(&id_s);
        let (tip_hash, tip_index) = {
            let tip = self.chain.tip();
            (tip.hash, tip.index)
        };
        let mut bh = BlockHeader::new(
            self.model.id_m(),
            id_s.clone(),
            &self.keypair,
            now(),
            tip_hash,
            tip_index + 1,
            secret,
            tds,
        );
        bh.coinstake_log2 = self.config.bh_coinstake_log2;
        bh.sign(&self.keypair);

        if !self.wait_for_bh_difficulty(&mut bh).await {
            return;
        }
        self.handle.send(FabricMessage::BlockHeader(bh.clone()));
        tracing::info!(employee = %self.name, id_bh = %bh.get_id(), "sent block header");

        if let Some(metrics) = &self.metrics {
            metrics.protocol.rounds_completed.inc();
        }

        self.evaluate_stakeholder_role(&bh, true);
        if self.restart_flag {
            return;
        }

        // Phase 3: drain inbound messages until something closes the round.
        while !self.restart_flag {
            self.collect_messages();
            sleep(Duration::from_millis(50)).await;
        }
    }

    async fn wait_for_td_difficulty(&mut self, td: &mut TrainingDeclaration) -> bool {
        loop {
            self.collect_messages();
            if self.restart_flag {
                return false;
            }
            if td.meets_difficulty() {
                return true;
            }
            td.retry_with_timestamp(now(), &self.keypair);
            sleep(Duration::from_secs(1)).await;
        }
    }

    async fn wait_for_bh_difficulty(&mut self, bh: &mut BlockHeader) -> bool {
        loop {
            self.collect_messages();
            if self.restart_flag {
                return false;
            }
            if bh.meets_difficulty() {
                return true;
            }
            bh.retry_with_timestamp(now(), &self.keypair);
            sleep(Duration::from_secs(1)).await;
        }
    }

    async fn wait_for_training_declarations(&mut self, id_s: &str) {
        while self.td_book.count(id_s) < self.config.employer_confidence {
            self.collect_messages();
            if self.restart_flag {
                return;
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    /// Drains every message currently ready on the inbox without blocking.
    fn collect_messages(&mut self) {
        while let Some(msg) = self.handle.try_recv() {
            self.dispatch(msg);
        }
    }

    fn dispatch(&mut self, msg: FabricMessage) {
        match msg {
            FabricMessage::Transaction(tx) => {
                self.pending_transactions.push(tx);
            }
            FabricMessage::TrainingDeclaration(td) => match self.verify_alien_td(&td) {
                Ok(()) => self.td_book.add(td),
                Err(err) => {
                    tracing::debug!(employee = %self.name, %err, "rejected training declaration");
                }
            },
            FabricMessage::BlockHeader(bh) => match self.verify_alien_bh(&bh) {
                Ok(()) => self.evaluate_stakeholder_role(&bh, false),
                Err(err) => {
                    tracing::debug!(employee = %self.name, id_bh = %bh.get_id(), %err, "rejected block header");
                }
            },
            FabricMessage::StakeholderSignature(ss) => {
                let id_s = ss.block_header.id_s.clone();
                let id_bh = ss.block_header.get_id();
                let is_roy = self.am_i_roy(&ss.block_header);
                let header = ss.block_header.clone();
                self.ss_book.add(&id_s, &id_bh, ss, is_roy);
                // `is_open` guards against re-triggering the Roy procedure
                // from later signatures delivered in the same drain batch:
                // `perform_roy_procedure` closes the stage as its first
                // step, so only the signature that crosses the threshold
                // ever sees it still open.
                if is_roy
                    && self.ss_book.is_open(&id_s)
                    && self.ss_book.count(&id_s, &id_bh) >= self.config.stakeholders_num.saturating_sub(1)
                {
                    self.perform_roy_procedure(header);
                }
            }
            FabricMessage::WrappedBlock(wb) => {
                if let Err(err) = self.check_not_stale(&wb) {
                    tracing::debug!(
                        employee = %self.name,
                        got_index = wb.block_header.block_index,
                        tip_index = self.chain.tip().index,
                        %err,
                        "dropped stale wrapped block",
                    );
                    return;
                }
                match self.verify_alien_wb(&wb) {
                    Ok(()) => {
                        self.ss_book.close(&wb.block_header.id_s);
                        self.purge_served(&wb.transactions);
                        self.chain.append_wrapped(wb, now());
                        self.restart_flag = true;
                        if let Some(metrics) = &self.metrics {
                            metrics.protocol.blocks_finalized.inc();
                            metrics.protocol.chain_length.set(self.chain.len() as i64);
                        }
                    }
                    Err(err) => {
                        tracing::debug!(employee = %self.name, %err, "rejected wrapped block");
                    }
                }
            }
            FabricMessage::EmployeeAlive { .. } => {}
            FabricMessage::EmployeeFinished { .. } | FabricMessage::ResultLocalBlockchain(_) => {
                unreachable!("the fabric absorbs these message kinds instead of relaying them")
            }
        }
    }

    /// A `WrappedBlock` for an index at or below the local tip is stale: it
    /// either duplicates an extension already applied, or lost a race with
    /// one that was. This is checked ahead of (and independently of)
    /// signature/difficulty soundness, per the error-handling table's
    /// "drop silently" treatment.
    fn check_not_stale(&self, wb: &WrappedBlock) -> Result<(), ConsensusError> {
        if wb.block_header.block_index <= self.chain.tip().index {
            return Err(ConsensusError::StaleBlockIndex);
        }
        Ok(())
    }

    fn verify_alien_td(&self, td: &TrainingDeclaration) -> Result<(), ConsensusError> {
        if !td.verify_signature() {
            return Err(ConsensusError::InvalidSignature);
        }
        if !td.meets_difficulty() {
            return Err(ConsensusError::DifficultyNotMet);
        }
        Ok(())
    }

    fn verify_alien_bh(&self, bh: &BlockHeader) -> Result<(), ConsensusError> {
        if !bh.verify_signature() {
            return Err(ConsensusError::InvalidSignature);
        }
        if !bh.meets_difficulty() {
            return Err(ConsensusError::DifficultyNotMet);
        }
        if !bh.check_included_training_declarations() {
            return Err(ConsensusError::BadTrainingSecretCommitment);
        }
        Ok(())
    }

    fn verify_alien_wb(&self, wb: &WrappedBlock) -> Result<(), ConsensusError> {
        if !wb.verify_signature() {
            return Err(ConsensusError::InvalidSignature);
        }
        if !wb.verify_stakeholder_signatures() {
            return Err(ConsensusError::BadStakeholderSignature);
        }
        Ok(())
    }

    /// The stake-weighted committee for `bh`, seeded by its own hash.
    fn committee_for(&self, bh: &BlockHeader) -> Vec<String> {
        self.chain.follow_the_coin(&bh.calculate_hash(), self.config.stakeholders_num)
    }

    fn am_i_roy(&self, bh: &BlockHeader) -> bool {
        self.committee_for(bh).last().is_some_and(|name| name == &self.name)
    }

    /// Determines this node's role in `bh`'s committee and acts on it: signs
    /// as a Normal stakeholder, or does nothing yet as Roy (the Roy
    /// procedure is triggered later, once enough signatures accumulate).
    fn evaluate_stakeholder_role(&mut self, bh: &BlockHeader, locally_produced: bool) {
        let committee = self.committee_for(bh);
        if committee.is_empty() {
            return;
        }
        let roy_name = committee.last().expect("non-empty committee");
        if roy_name == &self.name {
            tracing::info!(
                employee = %self.name,
                id_bh = %bh.get_id(),
                locally_produced,
                "selected as Roy stakeholder",
            );
        } else if committee[..committee.len() - 1].iter().any(|n| n == &self.name) {
            tracing::info!(
                employee = %self.name,
                id_bh = %bh.get_id(),
                locally_produced,
                "selected as normal stakeholder",
            );
            self.perform_normal_stakeholder_procedure(bh.clone());
        }
    }

    fn perform_normal_stakeholder_procedure(&mut self, bh: BlockHeader) {
        let is_roy = self.am_i_roy(&bh);
        let id_s = bh.id_s.clone();
        let id_bh = bh.get_id();
        let ss = StakeholderSignature::sign(bh, &self.keypair);
        self.ss_book.add(&id_s, &id_bh, ss.clone(), is_roy);
        self.handle.send(FabricMessage::StakeholderSignature(ss));
    }

    fn perform_roy_procedure(&mut self, bh: BlockHeader) {
        let id_s = bh.id_s.clone();
        let id_bh = bh.get_id();
        let block_index = bh.block_index;
        let ts = now();

        // Closed first so a later signature for the same header (delivered
        // before this node's own wrapped block loops back through a peer)
        // cannot re-trigger finalization or keep accumulating.
        self.ss_book.close(&id_s);

        let coinbase_tx = CoinbaseUser::new(block_index).create_transaction(&self.employee_user.inner, ts);

        let mut served = self.pending_transactions.clone();
        for tx in served.iter_mut() {
            tx.set_employee_name(self.name.clone());
        }

        let sigs = self.ss_book.list(&id_s, &id_bh);
        let wb = WrappedBlock::new(bh, coinbase_tx, served.clone(), sigs, &self.keypair, ts);

        self.handle.send(FabricMessage::WrappedBlock(wb.clone()));
        tracing::info!(employee = %self.name, id_bh = %wb.block_header.get_id(), "finalized as Roy stakeholder");

        self.purge_served(&served);
        self.chain.append_wrapped(wb, ts);
        self.restart_flag = true;

        if let Some(metrics) = &self.metrics {
            metrics.protocol.blocks_finalized.inc();
            metrics.protocol.chain_length.set(self.chain.len() as i64);
        }
    }

    /// Removes every transaction in `served` from the pending pool, by id.
    /// `served` are clones stamped with an employee name; the originals in
    /// the pending pool are untouched until this point, per the "deep copy
    /// before stamping" design note.
    fn purge_served(&mut self, served: &[Transaction]) {
        let served_ids: HashSet<&str> = served.iter().map(|tx| tx.id.as_str()).collect();
        self.pending_transactions.retain(|tx| !served_ids.contains(tx.id.as_str()));
    }
}
