//! Errors produced while a node dispatches inbound protocol messages.
//!
//! Every rejection path in `employee::Employee::dispatch` is represented as
//! one of these variants rather than a panic or a propagated escalation to
//! peers, in the manual-`enum` idiom (no `thiserror`/`anyhow`).

use std::fmt;

/// Reasons an alien (peer-originated) message can fail `verify_alien`.
#[derive(Debug)]
pub enum ConsensusError {
    /// `verify(public_key, dumps_without_sig(), signature)` returned false.
    InvalidSignature,
    /// The message's own hash does not meet its PoS difficulty predicate.
    DifficultyNotMet,
    /// A `BlockHeader`'s embedded training declaration does not open to the
    /// header's disclosed cleartext training secret.
    BadTrainingSecretCommitment,
    /// A `WrappedBlock` carries a stakeholder signature that does not
    /// verify against its enclosed header.
    BadStakeholderSignature,
    /// A `WrappedBlock` was received for an index at or below the local
    /// tip; stale or a duplicate of an already-applied extension.
    StaleBlockIndex,
}

impl fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusError::InvalidSignature => write!(f, "message signature does not verify"),
            ConsensusError::DifficultyNotMet => {
                write!(f, "message hash does not meet its PoS difficulty")
            }
            ConsensusError::BadTrainingSecretCommitment => write!(
                f,
                "a training declaration's commitment does not open to the header's disclosed secret"
            ),
            ConsensusError::BadStakeholderSignature => write!(
                f,
                "a stakeholder signature does not verify against its enclosed header"
            ),
            ConsensusError::StaleBlockIndex => {
                write!(f, "wrapped block index is at or below the local tip")
            }
        }
    }
}

impl std::error::Error for ConsensusError {}
