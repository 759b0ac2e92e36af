//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus registry
//! and a set of strongly-typed protocol metrics, and an async HTTP exporter
//! that serves `/metrics` using `hyper`. Ambient observability only: nothing
//! here carries protocol semantics.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{self, Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// Protocol-level Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated from the node state
/// machine as rounds complete and blocks are finalized.
#[derive(Clone)]
pub struct ProtocolMetrics {
    /// Total rounds completed across all nodes (a node completing phase 2
    /// counts once, regardless of which node ends up finalizing the block).
    pub rounds_completed: IntCounter,
    /// Current length of the reporting node's local chain.
    pub chain_length: IntGauge,
    /// Total wrapped blocks appended, locally produced or peer-received.
    pub blocks_finalized: IntCounter,
}

impl ProtocolMetrics {
    /// Registers protocol metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let rounds_completed = IntCounter::with_opts(Opts::new(
            "protocol_rounds_completed_total",
            "Total number of rounds for which this node emitted a block header",
        ))?;
        registry.register(Box::new(rounds_completed.clone()))?;

        let chain_length = IntGauge::with_opts(Opts::new(
            "protocol_chain_length",
            "Current length of this node's local chain",
        ))?;
        registry.register(Box::new(chain_length.clone()))?;

        let blocks_finalized = IntCounter::with_opts(Opts::new(
            "protocol_blocks_finalized_total",
            "Total number of wrapped blocks appended to this node's chain",
        ))?;
        registry.register(Box::new(blocks_finalized.clone()))?;

        Ok(Self {
            rounds_completed,
            chain_length,
            blocks_finalized,
        })
    }
}

/// Wrapper around a Prometheus registry and the protocol metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub protocol: ProtocolMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the protocol metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chain".to_string()), None)?;
        let protocol = ProtocolMetrics::register(&registry)?;
        Ok(Self { registry, protocol })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn protocol_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = ProtocolMetrics::register(&registry).expect("register metrics");

        metrics.rounds_completed.inc();
        metrics.chain_length.set(3);
        metrics.blocks_finalized.inc();

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.protocol.rounds_completed.inc();
        let text = registry.gather_text();
        assert!(text.contains("protocol_rounds_completed_total"));
    }
}
