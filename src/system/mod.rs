//! System utilities and monitoring
//!
//! Metrics and health checks.

pub mod metrics;

pub mod health {
    //! Health checks
    use once_cell::sync::Lazy;
    use serde::{Deserialize, Serialize};
    use std::time::Instant;

    static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

    /// Health report served at `/health`
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HealthStatus {
        /// Overall service status
        pub status: ServiceStatus,
        /// Crate version
        pub version: String,
        /// Seconds since startup
        pub uptime: u64,
        /// Whether every registry type resolved at startup
        pub types_resolved: bool,
    }

    /// Service health status levels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ServiceStatus {
        /// Serving normally
        Healthy,
        /// Serving, but missing something
        Degraded,
    }

    /// Mark the process start; call once at startup
    pub fn mark_started() {
        Lazy::force(&STARTED);
    }

    /// Build the current health report
    pub fn check(types_resolved: bool) -> HealthStatus {
        HealthStatus {
            status: if types_resolved {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Degraded
            },
            version: crate::VERSION.to_string(),
            uptime: STARTED.elapsed().as_secs(),
            types_resolved,
        }
    }
}
