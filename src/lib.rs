//! Model Registry - typed model registry over a lineage metadata store
//!
//! Registered models, versions, artifacts, serving and experiment tracking
//! entities are mapped onto the three generic node kinds of a metadata store
//! (contexts, artifacts, executions) and the edges between them. The
//! [`registry::ModelRegistryService`] engine does the mapping; [`api`] exposes
//! it over HTTP.
#![warn(missing_docs)]

// Core foundational modules
pub mod core;
pub mod types;

// Main functional modules
pub mod store;
pub mod registry;
pub mod api;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, Result};
pub use registry::ModelRegistryService;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging and metrics for a process embedding the registry
pub fn init(config: &Config) -> Result<()> {
    crate::core::logging::init(&config.logging)?;

    tracing::info!("Initializing {} v{}", NAME, VERSION);

    system::health::mark_started();
    if config.metrics.enable_prometheus {
        system::metrics::init_registry();
    }

    Ok(())
}
