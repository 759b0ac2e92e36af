//! PoA message kinds: stakeholder signatures and wrapped blocks.

pub mod stakeholder_signature;
pub mod wrapped_block;

pub use stakeholder_signature::StakeholderSignature;
pub use wrapped_block::WrappedBlock;
