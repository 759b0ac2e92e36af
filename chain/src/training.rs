//! Stand-in ML training substrate, kept behind an opaque trait boundary.
//!
//! The protocol only ever asks a model for three things: a batch's training
//! secret, a content hash of its weights, and its current stage id. This
//! module supplies an in-process, deterministic stand-in for that substrate —
//! no ML framework, no dataset loading — grounded on the reference
//! implementation's `ExampleModel` (a SHA-256 hash chain seeded by
//! `sha256(b"training_secret")`, one link per sample in the batch).

use sha2::{Digest, Sha256};

use crate::crypto::Hash256;

/// Samples folded into the training-secret hash chain per batch, mirroring
/// the reference model's `batch_size`.
pub const BATCH_SIZE: u64 = 10;

/// What the node state machine needs from a training stage.
///
/// Implementors own whatever "model" and "dataset" state they like; the
/// protocol never inspects it directly.
pub trait TrainingSubstrate {
    /// Stable identifier of the thing being trained, e.g. a model name.
    fn id_m(&self) -> &str;

    /// Current training iteration, starting at -1 before any batch runs.
    fn current_iteration(&self) -> i64;

    /// `"<id_m>:<current_iteration>"`.
    fn id_s(&self) -> String {
        format!("{}:{}", self.id_m(), self.current_iteration())
    }

    /// Runs one batch, advancing `current_iteration`, and returns the
    /// resulting 32-byte training secret.
    fn train_one_batch(&mut self) -> [u8; 32];

    /// Hex-encoded content hash of the current model weights.
    fn model_hash(&self) -> String;
}

/// Deterministic stand-in for the reference `ExampleModel`.
///
/// There is no real forward/backward pass: each "sample" contributes a
/// synthetic loss value derived from the model id and the iteration number
/// alone, **not** from the owning node's identity. Every honest node that
/// reaches iteration `i` of model `id_m` therefore derives the exact same
/// training secret for that batch — this is the whole point of the scheme:
/// a training declaration's commitment only opens against the *shared*
/// secret a header later discloses (see
/// [`crate::pos::block_header::BlockHeader::check_included_training_declarations`]),
/// so two nodes computing different secrets for the same stage could never
/// have their declarations embedded in the same header.
pub struct ExampleModel {
    id_m: String,
    owner_name: String,
    current_iteration: i64,
}

impl ExampleModel {
    pub fn new(owner_name: impl Into<String>) -> Self {
        ExampleModel {
            id_m: "Simple DNN for MNIST classification".to_string(),
            owner_name: owner_name.into(),
            current_iteration: -1,
        }
    }

    /// Synthetic per-sample loss in `[0, 1)`, standing in for a real
    /// forward-pass loss value. A pure function of the model id, the
    /// iteration, and the sample's position within the batch — identical
    /// across every node training the same stage.
    fn synthetic_loss(&self, sample_idx: u64) -> f32 {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(self.id_m.as_bytes());
        bytes.extend_from_slice(&self.current_iteration.to_be_bytes());
        bytes.extend_from_slice(&sample_idx.to_be_bytes());
        let h = Hash256::compute(&bytes);
        let raw = u32::from_be_bytes(h.as_bytes()[..4].try_into().expect("4 bytes"));
        (raw as f32) / (u32::MAX as f32)
    }
}

impl TrainingSubstrate for ExampleModel {
    fn id_m(&self) -> &str {
        &self.id_m
    }

    fn current_iteration(&self) -> i64 {
        self.current_iteration
    }

    /// Chains a synthetic per-sample loss into the running secret, one
    /// sample at a time: `secret_0 = sha256(b"training_secret")`,
    /// `secret_{i+1} = sha256(loss_be_bytes(i) ++ secret_i)`.
    fn train_one_batch(&mut self) -> [u8; 32] {
        self.current_iteration += 1;
        let mut secret = Hash256::compute(b"training_secret");
        for sample_idx in 0..BATCH_SIZE {
            let loss = self.synthetic_loss(sample_idx);
            let mut bytes = Vec::with_capacity(4 + 32);
            bytes.extend_from_slice(&loss.to_be_bytes());
            bytes.extend_from_slice(secret.as_bytes());
            secret = Hash256::compute(&bytes);
        }
        *secret.as_bytes()
    }

    /// Unlike the training secret, the model-weights content hash is left
    /// owner-specific: `h_s` is carried on every `TrainingDeclaration` but,
    /// per design, never reverified against anything (see
    /// `BlockHeader::check_included_training_declarations`), so it has no
    /// bearing on consensus outcomes.
    fn model_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.owner_name.as_bytes());
        hasher.update(self.current_iteration.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_iteration_starts_below_zero_and_advances_per_batch() {
        let mut model = ExampleModel::new("node-a");
        assert_eq!(model.current_iteration(), -1);
        model.train_one_batch();
        assert_eq!(model.current_iteration(), 0);
        model.train_one_batch();
        assert_eq!(model.current_iteration(), 1);
    }

    #[test]
    fn id_s_reflects_current_iteration() {
        let mut model = ExampleModel::new("node-a");
        model.train_one_batch();
        assert_eq!(model.id_s(), "Simple DNN for MNIST classification:0");
    }

    #[test]
    fn distinct_owners_produce_the_same_secret_for_the_same_stage() {
        // This is the crux of training verifiability: a header's disclosed
        // secret must match what every other honest node computed for the
        // same model and iteration, regardless of who is doing the work.
        let mut a = ExampleModel::new("node-a");
        let mut b = ExampleModel::new("node-b");
        assert_eq!(a.train_one_batch(), b.train_one_batch());
    }

    #[test]
    fn training_secret_is_deterministic_for_identical_owner_and_iteration() {
        let mut a = ExampleModel::new("node-a");
        let mut b = ExampleModel::new("node-a");
        assert_eq!(a.train_one_batch(), b.train_one_batch());
    }

    #[test]
    fn training_secret_changes_across_iterations() {
        let mut model = ExampleModel::new("node-a");
        let first = model.train_one_batch();
        let second = model.train_one_batch();
        assert_ne!(first, second);
    }

    #[test]
    fn model_hash_changes_after_training() {
        let mut model = ExampleModel::new("node-a");
        let before = model.model_hash();
        model.train_one_batch();
        let after = model.model_hash();
        assert_ne!(before, after);
    }
}
