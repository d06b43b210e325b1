//! Metrics and monitoring for the launchpad client
//!
//! This crate tracks transactions, registry refreshes and wallet sessions
//! per ledger.
//!
//! # Features
//!
//! - Prometheus metrics registered once per process, rendered on demand
//! - Tracing initialisation with env filter and optional JSON output
//! - Correlation IDs for following one operation across components
//!
//! # Example
//!
//! ```no_run
//! use launchpad_metrics::{init_tracing_with_metrics, MetricsCollector};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(MetricsCollector::new());
//! init_tracing_with_metrics("info", false, collector.clone()).unwrap();
//! println!("{}", collector.export_metrics().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use tracing::{init_tracing_with_metrics, CorrelationId, MetricsLayer, OperationSpan, TracingError};
