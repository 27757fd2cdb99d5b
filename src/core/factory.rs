//! Factory for the store backend and the application state

use std::sync::Arc;

use tracing::info;

use crate::core::config::{Config, StoreConfig, StoreType};
use crate::core::{AppState, Result, ResultExt};
use crate::registry::ModelRegistryService;
use crate::store::{schema, InMemoryStore};

/// Create a store based on configuration
pub fn create_store(config: &StoreConfig) -> InMemoryStore {
    match config.store_type {
        StoreType::Memory => InMemoryStore::with_page_size(config.default_page_size),
    }
}

/// Build the application state: store, registry types and engine
///
/// Fails if any registry type is missing from the store after the optional
/// bootstrap.
pub fn create_app_state(config: Config) -> Result<AppState<InMemoryStore>> {
    let store = Arc::new(create_store(&config.store));
    info!(store_type = ?config.store.store_type, "store initialized");

    if config.store.bootstrap_types {
        schema::bootstrap(&*store).context(|| "registering registry types")?;
        info!("registry types registered");
    }

    let service = ModelRegistryService::new(store).context(|| "resolving registry types")?;
    Ok(AppState::new(service, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn test_memory_store_creation() {
        let store = create_store(&StoreConfig::default());
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_app_state_bootstraps_types() {
        let state = create_app_state(Config::default()).unwrap();
        assert!(state.service.types().id(schema::REGISTERED_MODEL_TYPE).is_ok());
    }

    #[test]
    fn test_missing_types_refuse_to_start() {
        let mut config = Config::default();
        config.store.bootstrap_types = false;
        let err = create_app_state(config).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::Internal));
        assert!(err.to_string().contains("resolving registry types"));
    }
}
