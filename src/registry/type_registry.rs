//! Startup-resolved map from registry type names to store type ids

use std::collections::HashMap;

use crate::core::{Error, Result};
use crate::store::schema::*;
use crate::store::{MetadataStore, NodeKind};

/// Every type the registry expects the store to know
pub const EXPECTED_TYPES: [(NodeKind, &str); 13] = [
    (NodeKind::Context, REGISTERED_MODEL_TYPE),
    (NodeKind::Context, MODEL_VERSION_TYPE),
    (NodeKind::Artifact, MODEL_ARTIFACT_TYPE),
    (NodeKind::Artifact, DOC_ARTIFACT_TYPE),
    (NodeKind::Artifact, DATA_SET_TYPE),
    (NodeKind::Artifact, METRIC_TYPE),
    (NodeKind::Artifact, PARAMETER_TYPE),
    (NodeKind::Artifact, METRIC_HISTORY_TYPE),
    (NodeKind::Context, SERVING_ENVIRONMENT_TYPE),
    (NodeKind::Context, INFERENCE_SERVICE_TYPE),
    (NodeKind::Execution, SERVE_MODEL_TYPE),
    (NodeKind::Context, EXPERIMENT_TYPE),
    (NodeKind::Context, EXPERIMENT_RUN_TYPE),
];

/// Immutable type name ↔ id map
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    ids: HashMap<&'static str, i64>,
    names: HashMap<i64, &'static str>,
}

impl TypeRegistry {
    /// Resolve every expected type; any missing type is fatal
    pub fn resolve<S: MetadataStore + ?Sized>(store: &S) -> Result<Self> {
        let mut ids = HashMap::with_capacity(EXPECTED_TYPES.len());
        let mut names = HashMap::with_capacity(EXPECTED_TYPES.len());

        for (kind, name) in EXPECTED_TYPES {
            let schema = store
                .get_type(kind, name)
                .map_err(|e| Error::config(format!("required {} type {} is not registered: {}", kind, name, e)))?;
            let id = schema
                .id
                .ok_or_else(|| Error::config(format!("store returned type {} without an id", name)))?;
            ids.insert(name, id);
            names.insert(id, name);
        }

        tracing::info!(types = ids.len(), "type registry resolved");
        Ok(Self { ids, names })
    }

    /// Store id of a registry type
    pub fn id(&self, name: &str) -> Result<i64> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| Error::not_found(format!("type {} is not part of the registry", name)))
    }

    /// Whether every expected type is present
    pub fn is_complete(&self) -> bool {
        EXPECTED_TYPES.iter().all(|(_, name)| self.ids.contains_key(name))
    }

    /// Registry type name of a store type id
    pub fn name_of(&self, type_id: i64) -> Option<&'static str> {
        self.names.get(&type_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, TypeSchema};

    #[test]
    fn test_resolve_after_bootstrap() {
        let store = InMemoryStore::new();
        bootstrap(&store).unwrap();
        let types = TypeRegistry::resolve(&store).unwrap();

        let id = types.id(MODEL_VERSION_TYPE).unwrap();
        assert_eq!(types.name_of(id), Some(MODEL_VERSION_TYPE));
        assert!(types.id("kf.Unknown").is_err());
    }

    #[test]
    fn test_missing_type_is_fatal() {
        let store = InMemoryStore::new();
        store
            .put_type(TypeSchema::new(NodeKind::Context, REGISTERED_MODEL_TYPE))
            .unwrap();
        assert!(matches!(TypeRegistry::resolve(&store), Err(Error::Config(_))));
    }
}
