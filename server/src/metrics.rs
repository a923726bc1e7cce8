//! # Prometheus Metrics
//!
//! Exposes operational metrics for the fund server. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the server.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct FundMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total payment proofs submitted.
    pub proofs_submitted_total: IntCounter,
    /// Total payment proofs approved.
    pub proofs_approved_total: IntCounter,
    /// Total payment proofs rejected.
    pub proofs_rejected_total: IntCounter,
    /// Total ledger entries written (proof bookings and adjustments).
    pub ledger_entries_total: IntCounter,
    /// Current signed fund balance.
    pub fund_balance: IntGauge,
    /// Histogram of summary computation latency in seconds.
    pub summary_latency_seconds: Histogram,
}

impl FundMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("kas".into()), None)
            .expect("failed to create prometheus registry");

        let proofs_submitted_total = IntCounter::new(
            "proofs_submitted_total",
            "Total number of payment proofs submitted",
        )
        .expect("metric creation");
        registry
            .register(Box::new(proofs_submitted_total.clone()))
            .expect("metric registration");

        let proofs_approved_total = IntCounter::new(
            "proofs_approved_total",
            "Total number of payment proofs approved",
        )
        .expect("metric creation");
        registry
            .register(Box::new(proofs_approved_total.clone()))
            .expect("metric registration");

        let proofs_rejected_total = IntCounter::new(
            "proofs_rejected_total",
            "Total number of payment proofs rejected",
        )
        .expect("metric creation");
        registry
            .register(Box::new(proofs_rejected_total.clone()))
            .expect("metric registration");

        let ledger_entries_total = IntCounter::new(
            "ledger_entries_total",
            "Total number of ledger entries written",
        )
        .expect("metric creation");
        registry
            .register(Box::new(ledger_entries_total.clone()))
            .expect("metric registration");

        let fund_balance = IntGauge::new("fund_balance", "Current signed fund balance")
            .expect("metric creation");
        registry
            .register(Box::new(fund_balance.clone()))
            .expect("metric registration");

        let summary_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "summary_latency_seconds",
                "Latency of public summary computation in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(summary_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            proofs_submitted_total,
            proofs_approved_total,
            proofs_rejected_total,
            ledger_entries_total,
            fund_balance,
            summary_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for FundMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<FundMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = FundMetrics::new();
        metrics.proofs_submitted_total.inc();
        metrics.fund_balance.set(42_000);

        let body = metrics.encode().unwrap();
        assert!(body.contains("kas_proofs_submitted_total 1"));
        assert!(body.contains("kas_fund_balance 42000"));
    }
}
