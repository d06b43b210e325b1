use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Writes handed to the wallet, by ledger and operation
    pub static ref TRANSACTIONS_SUBMITTED: IntCounterVec = register_int_counter_vec!(
        "launchpad_transactions_submitted_total",
        "Total number of transactions submitted",
        &["ledger", "kind"]
    )
    .expect("launchpad_transactions_submitted_total registers once");

    /// Terminal transaction outcomes; `outcome` is `confirmed` or an error label
    pub static ref TRANSACTION_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "launchpad_transaction_outcomes_total",
        "Total transactions by terminal outcome",
        &["ledger", "kind", "outcome"]
    )
    .expect("launchpad_transaction_outcomes_total registers once");

    /// Time from submission to a terminal outcome (in milliseconds)
    pub static ref TRANSACTION_DURATION: HistogramVec = register_histogram_vec!(
        "launchpad_transaction_duration_ms",
        "Transaction duration in milliseconds",
        &["ledger", "kind"],
        vec![500.0, 1000.0, 2500.0, 5000.0, 15000.0, 30000.0, 60000.0, 120000.0]
    )
    .expect("launchpad_transaction_duration_ms registers once");

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub static ref REGISTRY_REFRESHES: IntCounterVec = register_int_counter_vec!(
        "launchpad_registry_refreshes_total",
        "Total pool registry refreshes by outcome",
        &["ledger", "outcome"]
    )
    .expect("launchpad_registry_refreshes_total registers once");

    pub static ref REGISTRY_REFRESH_DURATION: HistogramVec = register_histogram_vec!(
        "launchpad_registry_refresh_duration_ms",
        "Pool registry refresh duration in milliseconds",
        &["ledger"],
        vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .expect("launchpad_registry_refresh_duration_ms registers once");

    /// Pools in the latest snapshot
    pub static ref REGISTRY_POOLS: IntGaugeVec = register_int_gauge_vec!(
        "launchpad_registry_pools",
        "Number of pools in the registry snapshot",
        &["ledger"]
    )
    .expect("launchpad_registry_pools registers once");

    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub static ref SESSION_CONNECTS: IntCounterVec = register_int_counter_vec!(
        "launchpad_session_connects_total",
        "Total wallet connection attempts by outcome",
        &["ledger", "outcome"]
    )
    .expect("launchpad_session_connects_total registers once");

    /// Teardowns forced by the wallet switching networks
    pub static ref SESSION_RELOADS: IntCounterVec = register_int_counter_vec!(
        "launchpad_session_reloads_total",
        "Total reloads triggered by network changes",
        &["ledger"]
    )
    .expect("launchpad_session_reloads_total registers once");

    // ═══════════════════════════════════════════════════════════════════════════
    // ERROR METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Errors surfaced to the user, by taxonomy label
    pub static ref ERRORS_SURFACED: IntCounterVec = register_int_counter_vec!(
        "launchpad_errors_surfaced_total",
        "Total errors surfaced to the user by kind",
        &["error_kind"]
    )
    .expect("launchpad_errors_surfaced_total registers once");
}
