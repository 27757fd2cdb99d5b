//! Prometheus metrics for registry operations
//!
//! Every engine operation is counted by entity, operation and outcome. The
//! counters live in a process-wide registry served at `/metrics`.

use crate::core::{ErrorKind, Result};
use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Operation counters
pub struct Metrics {
    /// `registry_operations_total{entity, op, outcome}`
    pub operations: IntCounterVec,
}

impl Metrics {
    /// Create and register the counters
    fn new(registry: &Registry) -> Result<Self> {
        let operations = IntCounterVec::new(
            Opts::new("registry_operations_total", "Registry operations by entity, operation and outcome"),
            &["entity", "op", "outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;
        Ok(Self { operations })
    }

    /// Get the global metrics instance, if registration succeeded
    pub fn global() -> Option<&'static Metrics> {
        static INSTANCE: Lazy<Option<Metrics>> = Lazy::new(|| match Metrics::new(&REGISTRY) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::error!(error = %e, "failed to register metrics");
                None
            }
        });
        INSTANCE.as_ref()
    }
}

/// Outcome label of a result
pub fn outcome<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => match e.kind() {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "error",
        },
    }
}

/// Count one operation
pub fn record<T>(entity: &str, op: &str, result: &Result<T>) {
    if let Some(metrics) = Metrics::global() {
        metrics
            .operations
            .with_label_values(&[entity, op, outcome(result)])
            .inc();
    }
}

/// Initialize the metrics registry by creating the global metrics instance
pub fn init_registry() {
    let _ = Metrics::global();
}

/// Get the Prometheus registry
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Collect all metrics in the Prometheus text format
pub fn gather() -> Result<String> {
    let encoder = TextEncoder::new();
    Ok(encoder.encode_to_string(&registry().gather())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome(&Ok::<_, Error>(1)), "ok");
        assert_eq!(outcome::<()>(&Err(Error::not_found("x"))), "not_found");
        assert_eq!(outcome::<()>(&Err(Error::bad_request("x"))), "bad_request");
    }

    #[test]
    fn test_recorded_operations_are_gathered() {
        record("registered model", "create", &Ok::<_, Error>(()));
        let text = gather().unwrap();
        assert!(text.contains("registry_operations_total"));
        assert!(text.contains("entity=\"registered model\""));
    }
}
