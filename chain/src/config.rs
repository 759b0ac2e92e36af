//! Top-level configuration for a simulation run.
//!
//! This module aggregates configuration for:
//!
//! - protocol tunables (`SimulationConfig`): node/user counts, committee
//!   size, difficulty stakes, termination condition;
//! - metrics exporter (enable flag + listen address).
//!
//! The goal is a single `ChainConfig` struct that the harness binary
//! constructs from defaults and overrides as needed (e.g. smaller node
//! counts and trivial difficulty for a fast test run), then threads down by
//! value into every node's constructor.

use std::net::SocketAddr;

use crate::pos::CoinstakeLog2;

/// Protocol tunables, grouped so the harness can override them in one place
/// rather than leaving them as scattered bare constants.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Number of peer nodes.
    pub employees_num: usize,
    /// Number of external transacting users.
    pub users_num: usize,
    /// Transaction-generator cap.
    pub max_transactions_num: usize,
    /// Follow-the-coin committee size. Must be `<= employees_num`.
    pub stakeholders_num: usize,
    /// Chain length at which a node stops running rounds.
    pub target_blockchain_length: u64,
    /// Minimum training declarations (including self) before a node forges
    /// a block header.
    pub employer_confidence: usize,
    /// `log2` of the training-declaration PoS coinstake.
    pub td_coinstake_log2: CoinstakeLog2,
    /// `log2` of the block-header PoS coinstake.
    pub bh_coinstake_log2: CoinstakeLog2,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            employees_num: 11,
            users_num: 10,
            max_transactions_num: 100,
            stakeholders_num: 3,
            target_blockchain_length: 6,
            employer_confidence: 3,
            td_coinstake_log2: crate::pos::TD_COINSTAKE_LOG2,
            bh_coinstake_log2: crate::pos::BH_COINSTAKE_LOG2,
        }
    }
}

impl SimulationConfig {
    /// `stakeholders_num` must never exceed `employees_num`: the committee
    /// is drawn without replacement from (at most) the employee set.
    pub fn is_valid(&self) -> bool {
        self.stakeholders_num <= self.employees_num
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a simulation run.
#[derive(Clone, Debug, Default)]
pub struct ChainConfig {
    pub simulation: SimulationConfig,
    pub metrics: MetricsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_simulation_config_matches_reference_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.employees_num, 11);
        assert_eq!(config.users_num, 10);
        assert_eq!(config.max_transactions_num, 100);
        assert_eq!(config.stakeholders_num, 3);
        assert_eq!(config.target_blockchain_length, 6);
        assert_eq!(config.employer_confidence, 3);
        assert!(config.is_valid());
    }

    #[test]
    fn stakeholders_num_exceeding_employees_num_is_invalid() {
        let mut config = SimulationConfig::default();
        config.stakeholders_num = config.employees_num + 1;
        assert!(!config.is_valid());
    }
}
