//! Simulation harness binary.
//!
//! Wires up a fixed-size network of employee nodes, the broadcast fabric,
//! and the transaction generator; runs the simulation to completion; prints
//! a summary of the resulting replica. There is no singleton here: the
//! employee-name list and the configuration are built once and threaded
//! into every node's constructor by value, matching the non-singleton
//! harness design this crate settles on in place of the reference
//! implementation's singleton `Simulation` class.

use std::sync::Arc;

use chain::config::ChainConfig;
use chain::employee::Employee;
use chain::fabric::Fabric;
use chain::generator::TransactionGenerator;
use chain::metrics::{MetricsRegistry, run_prometheus_http_server};
use chain::training::ExampleModel;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ChainConfig::default();
    if !config.simulation.is_valid() {
        tracing::error!(
            stakeholders_num = config.simulation.stakeholders_num,
            employees_num = config.simulation.employees_num,
            "stakeholders_num must not exceed employees_num",
        );
        std::process::exit(1);
    }

    let metrics = match MetricsRegistry::new() {
        Ok(registry) => Some(Arc::new(registry)),
        Err(err) => {
            tracing::warn!(%err, "failed to initialize metrics registry, continuing without it");
            None
        }
    };
    if let (Some(metrics), true) = (&metrics, config.metrics.enabled) {
        let metrics = metrics.clone();
        let addr = config.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(err) = run_prometheus_http_server(metrics, addr).await {
                tracing::error!(%err, "metrics HTTP server error");
            }
        });
        tracing::info!(%addr, "metrics exporter listening on /metrics");
    }

    let employee_names: Vec<String> = (0..config.simulation.employees_num)
        .map(|i| format!("Employee-{i}"))
        .collect();
    let genesis_timestamp = unix_timestamp_now();

    let (fabric, handles, tx_gen_sender, mut sink) = Fabric::new(config.simulation.employees_num);
    let fabric_task = tokio::spawn(fabric.run());

    let generator = TransactionGenerator::new(
        config.simulation.users_num,
        config.simulation.max_transactions_num,
        tx_gen_sender,
    );
    let generator_task = tokio::spawn(generator.run());

    let mut node_tasks = Vec::with_capacity(handles.len());
    for (i, handle) in handles.into_iter().enumerate() {
        let name = employee_names[i].clone();
        let model = ExampleModel::new(name.clone());
        let employee = Employee::new(
            name,
            handle,
            &employee_names,
            genesis_timestamp,
            config.simulation.clone(),
            model,
            metrics.clone(),
        );
        node_tasks.push(tokio::spawn(employee.run()));
    }

    generator_task.await.expect("transaction generator task panicked");
    for task in node_tasks {
        task.await.expect("employee task panicked");
    }
    fabric_task.await.expect("fabric task panicked");

    tracing::info!("all processes have finished computing");
    match sink.recv().await {
        Some(blocks) => summarize(&blocks),
        None => tracing::warn!("simulation finished without a result replica"),
    }
}

fn summarize(blocks: &[chain::chain::Block]) {
    // Mirrors `Chain::count_transferred_coins`: coinbase transactions are
    // deliberately excluded from this tally, matching the reference
    // implementation's `Blockchain.count_transferred_coins`.
    let transactions: usize = blocks.iter().map(|b| b.transactions.len()).sum();
    let coins_transferred: f64 = blocks
        .iter()
        .flat_map(|b| b.transactions.iter())
        .map(|tx| tx.amount)
        .sum();

    tracing::info!(chain_length = blocks.len(), "blockchain view");
    for block in blocks {
        tracing::info!(
            index = block.index,
            hash = %block.hash.short_id(),
            previous_hash = %block.previous_hash.short_id(),
            transactions = block.transactions.len(),
            has_coinbase = block.coinbase_tx.is_some(),
            "block",
        );
    }
    tracing::info!(transactions, coins_transferred, "transactional summary");
}

fn unix_timestamp_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
