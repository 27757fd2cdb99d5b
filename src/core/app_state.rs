//! Application State Management
//!
//! The state shared by every HTTP handler: the registry engine and the
//! configuration it was built from. Built by [`crate::core::factory`].

use std::sync::Arc;

use crate::core::config::Config;
use crate::registry::ModelRegistryService;
use crate::store::StoreImpl;

/// Central application state
pub struct AppState<S: StoreImpl> {
    /// Registry engine over the configured store
    pub service: Arc<ModelRegistryService<S>>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl<S: StoreImpl> AppState<S> {
    /// Create a new AppState; called by the factory once the engine is ready
    pub fn new(service: ModelRegistryService<S>, config: Config) -> Self {
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
        }
    }
}

impl<S: StoreImpl> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}
