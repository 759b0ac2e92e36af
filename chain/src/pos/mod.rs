//! PoS message kinds: training declarations and block headers.
//!
//! Both kinds carry a `coinstake` and are subject to the same difficulty
//! predicate over their own hash (see [`meets_difficulty`]).

pub mod block_header;
pub mod training_declaration;

pub use block_header::BlockHeader;
pub use training_declaration::TrainingDeclaration;

use crate::crypto::Hash256;

/// `coinstake` is a power of two (`TD_COINSTAKE = 2^252`, `BH_COINSTAKE =
/// 2^251`); true magnitudes of that size don't fit in a 128-bit integer, and
/// the difficulty predicate only ever needs `log2(coinstake)`. Messages
/// therefore carry the exponent directly rather than the full value.
pub type CoinstakeLog2 = u32;

/// `TD_COINSTAKE = 2^252`.
pub const TD_COINSTAKE_LOG2: CoinstakeLog2 = 252;
/// `BH_COINSTAKE = 2^251`.
pub const BH_COINSTAKE_LOG2: CoinstakeLog2 = 251;

/// A PoS message meets difficulty iff
/// `leading_zero_bits(hash) >= 256 - log2(coinstake)`.
pub fn meets_difficulty(hash: &Hash256, coinstake_log2: CoinstakeLog2) -> bool {
    let threshold = 256u32.saturating_sub(coinstake_log2);
    hash.leading_zero_bits() >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_accepts_every_hash() {
        // coinstake = 2^256 => threshold = 0 => every hash satisfies it.
        let hash = Hash256([0xffu8; 32]);
        assert!(meets_difficulty(&hash, 256));
    }

    #[test]
    fn nonzero_threshold_rejects_hash_without_enough_leading_zeros() {
        let hash = Hash256([0xffu8; 32]);
        assert!(!meets_difficulty(&hash, 1));
    }
}
