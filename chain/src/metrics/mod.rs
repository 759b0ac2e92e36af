//! Metrics and instrumentation for the simulation.
//!
//! This module defines Prometheus-compatible metrics for the protocol and
//! exposes a small HTTP exporter that serves `/metrics` in Prometheus text
//! format. Purely ambient observability; the node state machine functions
//! identically whether or not a registry is wired in.
//!
//! Typical usage in the harness:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use chain::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//!
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! registry.protocol.rounds_completed.inc();
//! ```

pub mod prometheus;

pub use prometheus::{MetricsRegistry, ProtocolMetrics, run_prometheus_http_server};
