//! Per-node books: stage-keyed aggregation of training declarations and of
//! stakeholder signatures, each with an open/closed lifecycle.
//!
//! Entries become write-locked when closed: further `add` calls are silently
//! dropped rather than erroring. This is part of the contract, not a bug
//! (see the "books as nested maps" design note this module is grounded on).

use std::collections::HashMap;

use crate::pos::TrainingDeclaration;

/// A single stage's worth of training declarations.
#[derive(Default)]
pub struct TdStage {
    pub open: bool,
    pub tds: Vec<TrainingDeclaration>,
}

/// `id_s -> { open, tds }`.
#[derive(Default)]
pub struct TdBook {
    stages: HashMap<String, TdStage>,
}

impl TdBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `td` under `td.id_s`. Opens the stage on first insert. Drops
    /// the declaration silently if the stage has already been closed.
    pub fn add(&mut self, td: TrainingDeclaration) {
        let stage = self
            .stages
            .entry(td.id_s.clone())
            .or_insert_with(|| TdStage { open: true, tds: Vec::new() });
        if stage.open {
            stage.tds.push(td);
        }
    }

    pub fn count(&self, id_s: &str) -> usize {
        self.stages.get(id_s).map(|s| s.tds.len()).unwrap_or(0)
    }

    pub fn list(&self, id_s: &str) -> Vec<TrainingDeclaration> {
        self.stages
            .get(id_s)
            .map(|s| s.tds.clone())
            .unwrap_or_default()
    }

    /// Flips `open` to `false` for `id_s`. A no-op if the stage does not
    /// exist yet (nothing has been written, so nothing needs protecting).
    pub fn close(&mut self, id_s: &str) {
        if let Some(stage) = self.stages.get_mut(id_s) {
            stage.open = false;
        }
    }

    pub fn is_open(&self, id_s: &str) -> bool {
        self.stages.get(id_s).map(|s| s.open).unwrap_or(true)
    }
}

/// A single `(id_s, id_bh)` header's worth of stakeholder signatures.
#[derive(Default, Clone)]
pub struct SsHeaderEntry {
    pub sigs: Vec<crate::poa::StakeholderSignature>,
    pub roy: Option<bool>,
}

#[derive(Default)]
struct SsStage {
    open: bool,
    per_header: HashMap<String, SsHeaderEntry>,
}

/// `id_s -> { open, per_header: id_bh -> { sigs, roy } }`.
#[derive(Default)]
pub struct SsBook {
    stages: HashMap<String, SsStage>,
}

impl SsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `ss` under `(id_s, id_bh)`, recording whether the adding node
    /// is the Roy stakeholder for this header. If the stage has already been
    /// closed, the signature is dropped silently.
    ///
    /// Duplicate signature bytes are accepted and counted: idempotence is
    /// not required for live stages, only for already-closed ones.
    pub fn add(&mut self, id_s: &str, id_bh: &str, ss: crate::poa::StakeholderSignature, roy: bool) {
        let stage = self
            .stages
            .entry(id_s.to_string())
            .or_insert_with(|| SsStage { open: true, per_header: HashMap::new() });
        if !stage.open {
            return;
        }
        let entry = stage
            .per_header
            .entry(id_bh.to_string())
            .or_insert_with(|| SsHeaderEntry { sigs: Vec::new(), roy: Some(roy) });
        entry.sigs.push(ss);
    }

    pub fn count(&self, id_s: &str, id_bh: &str) -> usize {
        self.stages
            .get(id_s)
            .and_then(|s| s.per_header.get(id_bh))
            .map(|e| e.sigs.len())
            .unwrap_or(0)
    }

    pub fn list(&self, id_s: &str, id_bh: &str) -> Vec<crate::poa::StakeholderSignature> {
        self.stages
            .get(id_s)
            .and_then(|s| s.per_header.get(id_bh))
            .map(|e| e.sigs.clone())
            .unwrap_or_default()
    }

    pub fn close(&mut self, id_s: &str) {
        if let Some(stage) = self.stages.get_mut(id_s) {
            stage.open = false;
        }
    }

    pub fn is_open(&self, id_s: &str) -> bool {
        self.stages.get(id_s).map(|s| s.open).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Hash256, KeyPair};
    use crate::poa::StakeholderSignature;
    use crate::pos::BlockHeader;

    fn dummy_td(id_s: &str) -> TrainingDeclaration {
        let kp = KeyPair::generate();
        TrainingDeclaration::new("m", id_s, &kp, 0, &[1u8; 32], "h")
    }

    #[test]
    fn td_book_opens_on_first_insert_and_counts() {
        let mut book = TdBook::new();
        assert_eq!(book.count("m:0"), 0);
        book.add(dummy_td("m:0"));
        book.add(dummy_td("m:0"));
        assert_eq!(book.count("m:0"), 2);
        assert!(book.is_open("m:0"));
    }

    #[test]
    fn td_book_drops_writes_after_close() {
        let mut book = TdBook::new();
        book.add(dummy_td("m:0"));
        book.close("m:0");
        assert!(!book.is_open("m:0"));
        book.add(dummy_td("m:0"));
        assert_eq!(book.count("m:0"), 1, "write to closed stage must be dropped");
    }

    fn dummy_ss() -> StakeholderSignature {
        let proposer_kp = KeyPair::generate();
        let header = BlockHeader::new("m", "m:0", &proposer_kp, 0, Hash256([0u8; 32]), 1, [1u8; 32], vec![]);
        let stakeholder_kp = KeyPair::generate();
        StakeholderSignature::sign(header, &stakeholder_kp)
    }

    #[test]
    fn ss_book_tracks_roy_flag_and_counts_per_header() {
        let mut book = SsBook::new();
        book.add("m:0", "abcd1234", dummy_ss(), false);
        book.add("m:0", "abcd1234", dummy_ss(), true);
        assert_eq!(book.count("m:0", "abcd1234"), 2);
    }

    #[test]
    fn ss_book_drops_writes_after_close() {
        let mut book = SsBook::new();
        book.add("m:0", "abcd1234", dummy_ss(), false);
        book.close("m:0");
        book.add("m:0", "abcd1234", dummy_ss(), false);
        assert_eq!(book.count("m:0", "abcd1234"), 1);
    }
}
