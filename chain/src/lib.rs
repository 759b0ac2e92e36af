//! Chain library crate.
//!
//! This crate provides the core building blocks of a Proof-of-Training
//! consensus protocol: a hybrid proof-of-stake / proof-of-authority
//! mechanism in which block-producing rights are earned by performing
//! verifiable machine-learning work.
//!
//! - cryptographic primitives and the hashable-signable message base
//!   (`crypto`, `message`),
//! - the two PoS message kinds and the PoA envelope (`pos`, `poa`),
//! - per-node books and the append-only chain (`books`, `chain`),
//! - the broadcast fabric connecting nodes (`fabric`),
//! - the per-node state machine (`employee`),
//! - the transaction generator and training-substrate stand-in
//!   (`generator`, `training`),
//! - domain value types (`types`),
//! - and the ambient stack: configuration, error types, and Prometheus
//!   metrics (`config`, `error`, `metrics`).
//!
//! The top-level simulation harness binary (`main.rs`) composes these
//! pieces; none of them depend on the harness.

pub mod books;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod employee;
pub mod error;
pub mod fabric;
pub mod generator;
pub mod message;
pub mod metrics;
pub mod poa;
pub mod pos;
pub mod training;
pub mod types;

pub use chain::{Block, Chain};
pub use config::{ChainConfig, MetricsConfig, SimulationConfig};
pub use crypto::{CryptoError, Hash256, KeyPair, PublicKey, Signature};
pub use employee::Employee;
pub use error::ConsensusError;
pub use fabric::{Fabric, FabricMessage, NodeHandle};
pub use generator::TransactionGenerator;
pub use message::PotMessage;
pub use metrics::{MetricsRegistry, ProtocolMetrics, run_prometheus_http_server};
pub use poa::{StakeholderSignature, WrappedBlock};
pub use pos::{BH_COINSTAKE_LOG2, BlockHeader, CoinstakeLog2, TD_COINSTAKE_LOG2, TrainingDeclaration};
pub use training::{ExampleModel, TrainingSubstrate};
pub use types::{CoinbaseUser, EmployeeUser, Transaction, User, UserRef};
