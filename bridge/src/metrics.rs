//! Prometheus metrics for the bridge.
//!
//! [`BridgeMetrics`] owns a dedicated [`Registry`] that a host process can
//! encode into the Prometheus text exposition format via [`BridgeMetrics::encode`].

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Central collection of all bridge-level Prometheus metrics.
pub struct BridgeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Payments handed to the store queue.
    pub payments_submitted: IntCounter,
    /// Transactions that settled as purchased.
    pub transactions_purchased: IntCounter,
    /// Transactions that settled as failed.
    pub transactions_failed: IntCounter,
    /// Settlements that arrived while no caller was waiting for the product.
    pub settlements_unclaimed: IntCounter,
    /// `finish_transaction` calls made to the store queue.
    pub transactions_finished: IntCounter,
    /// Restores that completed.
    pub restores_completed: IntCounter,
    /// Restores the store reported as failed.
    pub restores_failed: IntCounter,
    /// Receipt validations that rejected a purchase or restore.
    pub validations_rejected: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from payment submission to settlement, in milliseconds.
    pub settlement_latency_ms: Histogram,
}

impl BridgeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let payments_submitted = register_int_counter_with_registry!(
            Opts::new("iap_payments_submitted_total", "Payments submitted to the store queue"),
            registry
        )
        .expect("failed to register payments_submitted counter");

        let transactions_purchased = register_int_counter_with_registry!(
            Opts::new(
                "iap_transactions_purchased_total",
                "Transactions settled as purchased"
            ),
            registry
        )
        .expect("failed to register transactions_purchased counter");

        let transactions_failed = register_int_counter_with_registry!(
            Opts::new("iap_transactions_failed_total", "Transactions settled as failed"),
            registry
        )
        .expect("failed to register transactions_failed counter");

        let settlements_unclaimed = register_int_counter_with_registry!(
            Opts::new(
                "iap_settlements_unclaimed_total",
                "Settlements with no caller waiting"
            ),
            registry
        )
        .expect("failed to register settlements_unclaimed counter");

        let transactions_finished = register_int_counter_with_registry!(
            Opts::new(
                "iap_transactions_finished_total",
                "Transactions acknowledged with the store queue"
            ),
            registry
        )
        .expect("failed to register transactions_finished counter");

        let restores_completed = register_int_counter_with_registry!(
            Opts::new("iap_restores_completed_total", "Restores completed"),
            registry
        )
        .expect("failed to register restores_completed counter");

        let restores_failed = register_int_counter_with_registry!(
            Opts::new("iap_restores_failed_total", "Restores reported failed"),
            registry
        )
        .expect("failed to register restores_failed counter");

        let validations_rejected = register_int_counter_with_registry!(
            Opts::new(
                "iap_validations_rejected_total",
                "Receipt validations that rejected"
            ),
            registry
        )
        .expect("failed to register validations_rejected counter");

        // 1 ms → ~32 s
        let settlement_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "iap_settlement_latency_ms",
                "Payment submission to settlement latency in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(1.0, 2.0, 16)
                    .expect("static bucket parameters are valid")
            ),
            registry
        )
        .expect("failed to register settlement_latency_ms histogram");

        Self {
            registry,
            payments_submitted,
            transactions_purchased,
            transactions_failed,
            settlements_unclaimed,
            transactions_finished,
            restores_completed,
            restores_failed,
            validations_rejected,
            settlement_latency_ms,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
