//! Prometheus metrics for the order gate.
//!
//! All metrics follow the naming convention: `order_gate_<metric>_<unit>`
//!
//! The gate itself only keeps atomic counters ([`GateMetrics`]).
//! [`GateMetricsExporter`] turns successive snapshots of those counters into
//! Prometheus counter increments. Run one exporter per process.

use lazy_static::lazy_static;
use order_gate::{GateMetrics, GateMetricsSnapshot};
use prometheus::{Counter, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Batches passed to `submit`
    pub static ref BATCHES_SUBMITTED: IntCounter = IntCounter::new(
        "order_gate_batches_submitted_total",
        "Total batches submitted to the gate"
    ).expect("metric creation failed");

    /// Transactions across submitted batches
    pub static ref TRANSACTIONS_SUBMITTED: IntCounter = IntCounter::new(
        "order_gate_transactions_submitted_total",
        "Total transactions submitted to the gate"
    ).expect("metric creation failed");

    /// Transactions with no document target
    pub static ref TRANSACTIONS_BYPASSED: IntCounter = IntCounter::new(
        "order_gate_transactions_bypassed_total",
        "Transactions that bypassed ordering (no document)"
    ).expect("metric creation failed");

    /// Batches that waited on an earlier batch
    pub static ref BATCHES_WAITED: IntCounter = IntCounter::new(
        "order_gate_batches_waited_total",
        "Batches that waited for an earlier batch on the same document"
    ).expect("metric creation failed");

    /// Cumulative wait time
    pub static ref WAIT_SECONDS: Counter = Counter::new(
        "order_gate_wait_seconds_total",
        "Total time batches spent waiting for earlier batches"
    ).expect("metric creation failed");

    /// Settled batches by outcome
    pub static ref BATCHES_SETTLED: IntCounterVec = IntCounterVec::new(
        Opts::new("order_gate_batches_settled_total", "Settled batches by outcome"),
        &["outcome"]  // completed / failed / abandoned
    ).expect("metric creation failed");

    /// Documents with a pending ticket
    pub static ref PENDING_DOCUMENTS: IntGauge = IntGauge::new(
        "order_gate_pending_documents",
        "Documents that currently have a batch in flight"
    ).expect("metric creation failed");

    /// Admitted, not yet settled
    pub static ref BATCHES_IN_FLIGHT: IntGauge = IntGauge::new(
        "order_gate_batches_in_flight",
        "Batches admitted but not yet settled"
    ).expect("metric creation failed");
}

/// Handle returned once metrics are registered
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BATCHES_SUBMITTED.clone()),
        Box::new(TRANSACTIONS_SUBMITTED.clone()),
        Box::new(TRANSACTIONS_BYPASSED.clone()),
        Box::new(BATCHES_WAITED.clone()),
        Box::new(WAIT_SECONDS.clone()),
        Box::new(BATCHES_SETTLED.clone()),
        Box::new(PENDING_DOCUMENTS.clone()),
        Box::new(BATCHES_IN_FLIGHT.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Feeds a gate's counters into the Prometheus metrics.
pub struct GateMetricsExporter {
    source: Arc<GateMetrics>,
    last: Mutex<GateMetricsSnapshot>,
}

impl GateMetricsExporter {
    pub fn new(source: Arc<GateMetrics>) -> Self {
        Self {
            source,
            last: Mutex::new(GateMetricsSnapshot::default()),
        }
    }

    /// Push everything counted since the previous export.
    pub fn export(&self, pending_documents: usize) -> GateMetricsSnapshot {
        let current = self.source.snapshot();
        let mut last = self.last.lock();

        BATCHES_SUBMITTED.inc_by(current.batches_submitted.saturating_sub(last.batches_submitted));
        TRANSACTIONS_SUBMITTED.inc_by(
            current
                .transactions_submitted
                .saturating_sub(last.transactions_submitted),
        );
        TRANSACTIONS_BYPASSED.inc_by(
            current
                .transactions_bypassed
                .saturating_sub(last.transactions_bypassed),
        );
        BATCHES_WAITED.inc_by(current.batches_waited.saturating_sub(last.batches_waited));
        WAIT_SECONDS.inc_by(
            current.wait_time_ns.saturating_sub(last.wait_time_ns) as f64 / 1_000_000_000.0,
        );
        BATCHES_SETTLED
            .with_label_values(&["completed"])
            .inc_by(current.batches_completed.saturating_sub(last.batches_completed));
        BATCHES_SETTLED
            .with_label_values(&["failed"])
            .inc_by(current.batches_failed.saturating_sub(last.batches_failed));
        BATCHES_SETTLED
            .with_label_values(&["abandoned"])
            .inc_by(current.batches_abandoned.saturating_sub(last.batches_abandoned));

        PENDING_DOCUMENTS.set(pending_documents as i64);
        BATCHES_IN_FLIGHT.set(current.batches_in_flight() as i64);

        *last = current;
        current
    }
}
