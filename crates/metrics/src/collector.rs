use std::time::Duration;

use launchpad_types::{ErrorKind, LedgerKind, TxKind};
use prometheus::{Encoder, TextEncoder};

use crate::metrics::*;

/// Metrics collector for the launchpad client
#[derive(Debug, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_submission(&self, ledger: LedgerKind, kind: TxKind) {
        TRANSACTIONS_SUBMITTED
            .with_label_values(&[ledger_label(ledger), kind.as_str()])
            .inc();
    }

    /// Record a terminal transaction outcome and how long it took
    pub fn record_transaction(
        &self,
        ledger: LedgerKind,
        kind: TxKind,
        error: Option<&ErrorKind>,
        duration: Duration,
    ) {
        let outcome = error.map_or("confirmed", ErrorKind::label);
        TRANSACTION_OUTCOMES
            .with_label_values(&[ledger_label(ledger), kind.as_str(), outcome])
            .inc();
        TRANSACTION_DURATION
            .with_label_values(&[ledger_label(ledger), kind.as_str()])
            .observe(duration.as_millis() as f64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a registry refresh; `pools` is the snapshot size on success
    pub fn record_refresh(
        &self,
        ledger: LedgerKind,
        result: Result<usize, &ErrorKind>,
        duration: Duration,
    ) {
        let ledger = ledger_label(ledger);
        let outcome = match result {
            Ok(pools) => {
                REGISTRY_POOLS.with_label_values(&[ledger]).set(pools as i64);
                "ok"
            }
            Err(err) => err.label(),
        };

        REGISTRY_REFRESHES.with_label_values(&[ledger, outcome]).inc();
        REGISTRY_REFRESH_DURATION
            .with_label_values(&[ledger])
            .observe(duration.as_millis() as f64);
    }

    pub fn record_registry_cleared(&self, ledger: LedgerKind) {
        REGISTRY_POOLS.with_label_values(&[ledger_label(ledger)]).set(0);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_connect(&self, ledger: LedgerKind, error: Option<&ErrorKind>) {
        let outcome = error.map_or("connected", ErrorKind::label);
        SESSION_CONNECTS
            .with_label_values(&[ledger_label(ledger), outcome])
            .inc();
    }

    pub fn record_reload(&self, ledger: LedgerKind) {
        SESSION_RELOADS.with_label_values(&[ledger_label(ledger)]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ERROR METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_error(&self, error_kind: &str) {
        ERRORS_SURFACED.with_label_values(&[error_kind]).inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

fn ledger_label(ledger: LedgerKind) -> &'static str {
    match ledger {
        LedgerKind::Evm => "evm",
        LedgerKind::Solana => "solana",
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}
