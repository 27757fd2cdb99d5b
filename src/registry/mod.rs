//! Registry engine
//!
//! Maps the typed registry entities onto the three generic node kinds of the
//! metadata store. One shared create-or-update state machine
//! ([`upsert`]) is instantiated per entity family; each family module adds the
//! kind-specific mapping and the public operations for that kind.
//!
//! The engine holds no mutable state: every operation is a short sequence of
//! synchronous store calls over the shared store handle and the immutable type
//! registry resolved at startup.

use std::sync::Arc;

use crate::core::Result;
use crate::store::StoreImpl;

pub mod mapper;
pub mod query;
pub mod resolver;
pub mod type_registry;
pub mod upsert;

mod artifact;
mod experiment;
mod experiment_run;
mod inference_service;
mod metric_history;
mod model_version;
mod registered_model;
mod serve_model;
mod serving_environment;

pub use query::build_list_options;
pub use type_registry::TypeRegistry;

/// The model registry engine
pub struct ModelRegistryService<S: StoreImpl> {
    store: Arc<S>,
    types: Arc<TypeRegistry>,
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create the engine over a store whose registry types are already registered
    ///
    /// Fails if any expected type is missing from the store.
    pub fn new(store: Arc<S>) -> Result<Self> {
        let types = TypeRegistry::resolve(&*store)?;
        Ok(Self {
            store,
            types: Arc::new(types),
        })
    }

    /// Underlying store handle
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Resolved type registry
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }
}

impl<S: StoreImpl> Clone for ModelRegistryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            types: Arc::clone(&self.types),
        }
    }
}
