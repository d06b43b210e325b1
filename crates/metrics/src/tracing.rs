use std::sync::Arc;
use tracing::{field::Visit, Event, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use launchpad_types::{LedgerKind, TxKind};

use crate::collector::MetricsCollector;

/// Initialize tracing with metrics integration
///
/// `RUST_LOG` takes precedence over `level`. With `json` set, events are
/// written as JSON lines.
pub fn init_tracing_with_metrics(
    level: &str,
    json: bool,
    collector: Arc<MetricsCollector>,
) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("{level},launchpad=debug"))
            .map_err(|e| TracingError::InitError(e.to_string()))?,
    };

    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .json()
    });
    let text_layer = (!json).then(|| fmt::layer().with_target(true).with_level(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(MetricsLayer::new(collector))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts surfaced errors
///
/// Any event carrying an `error_kind` field is counted under that label.
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = ErrorKindVisitor::default();
        event.record(&mut visitor);

        if let Some(error_kind) = visitor.error_kind {
            self.collector.record_error(&error_kind);
        }
    }
}

#[derive(Default)]
struct ErrorKindVisitor {
    error_kind: Option<String>,
}

impl Visit for ErrorKindVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "error_kind" {
            self.error_kind = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "error_kind" {
            self.error_kind = Some(value.to_string());
        }
    }
}

/// Correlation ID for tracking one user operation across components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one write operation, from validation to confirmation
#[derive(Debug, Clone)]
pub struct OperationSpan {
    pub correlation_id: CorrelationId,
    pub ledger: LedgerKind,
    pub kind: TxKind,
    pub pool_id: Option<u64>,
}

impl OperationSpan {
    pub fn new(ledger: LedgerKind, kind: TxKind, pool_id: Option<u64>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            ledger,
            kind,
            pool_id,
        }
    }

    /// Span to instrument the operation's future with
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "operation",
            correlation_id = %self.correlation_id,
            ledger = %self.ledger,
            kind = %self.kind,
            pool_id = ?self.pool_id,
        )
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}
