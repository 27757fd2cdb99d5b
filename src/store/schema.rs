//! Registry type schemas
//!
//! Declares every `kf.*` node type the registry maps its entities onto and
//! registers them with a store. Registration is additive: running it against a
//! store that already knows a type only adds missing properties.

use crate::store::{MetadataStore, NodeKind, PropertyKind, StoreResult, TypeSchema};

/// Store type of RegisteredModel nodes
pub const REGISTERED_MODEL_TYPE: &str = "kf.RegisteredModel";
/// Store type of ModelVersion nodes
pub const MODEL_VERSION_TYPE: &str = "kf.ModelVersion";
/// Store type of ModelArtifact nodes
pub const MODEL_ARTIFACT_TYPE: &str = "kf.ModelArtifact";
/// Store type of DocArtifact nodes
pub const DOC_ARTIFACT_TYPE: &str = "kf.DocArtifact";
/// Store type of DataSet nodes
pub const DATA_SET_TYPE: &str = "kf.DataSet";
/// Store type of Metric nodes
pub const METRIC_TYPE: &str = "kf.Metric";
/// Store type of Parameter nodes
pub const PARAMETER_TYPE: &str = "kf.Parameter";
/// Store type of MetricHistory nodes
pub const METRIC_HISTORY_TYPE: &str = "kf.MetricHistory";
/// Store type of ServingEnvironment nodes
pub const SERVING_ENVIRONMENT_TYPE: &str = "kf.ServingEnvironment";
/// Store type of InferenceService nodes
pub const INFERENCE_SERVICE_TYPE: &str = "kf.InferenceService";
/// Store type of ServeModel nodes
pub const SERVE_MODEL_TYPE: &str = "kf.ServeModel";
/// Store type of Experiment nodes
pub const EXPERIMENT_TYPE: &str = "kf.Experiment";
/// Store type of ExperimentRun nodes
pub const EXPERIMENT_RUN_TYPE: &str = "kf.ExperimentRun";

fn metric_like(name: &str) -> TypeSchema {
    TypeSchema::new(NodeKind::Artifact, name)
        .property("description", PropertyKind::String)
        .property("value", PropertyKind::Double)
        .property("timestamp", PropertyKind::Int)
        .property("step", PropertyKind::Int)
}

/// All registry type schemas
pub fn registry_types() -> Vec<TypeSchema> {
    use PropertyKind::{Int, String as Str};

    vec![
        TypeSchema::new(NodeKind::Context, REGISTERED_MODEL_TYPE)
            .property("description", Str)
            .property("owner", Str)
            .property("state", Str),
        TypeSchema::new(NodeKind::Context, MODEL_VERSION_TYPE)
            .property("description", Str)
            .property("author", Str)
            .property("state", Str),
        TypeSchema::new(NodeKind::Artifact, MODEL_ARTIFACT_TYPE)
            .property("description", Str)
            .property("model_format_name", Str)
            .property("model_format_version", Str)
            .property("storage_key", Str)
            .property("storage_path", Str)
            .property("service_account_name", Str)
            .property("model_source_kind", Str)
            .property("model_source_class", Str)
            .property("model_source_group", Str)
            .property("model_source_id", Str)
            .property("model_source_name", Str)
            .property("experiment_id", Str)
            .property("experiment_run_id", Str),
        TypeSchema::new(NodeKind::Artifact, DOC_ARTIFACT_TYPE).property("description", Str),
        TypeSchema::new(NodeKind::Artifact, DATA_SET_TYPE)
            .property("description", Str)
            .property("digest", Str)
            .property("source_type", Str)
            .property("source", Str)
            .property("schema", Str)
            .property("profile", Str),
        metric_like(METRIC_TYPE),
        TypeSchema::new(NodeKind::Artifact, PARAMETER_TYPE)
            .property("description", Str)
            .property("value", Str)
            .property("parameter_type", Str),
        metric_like(METRIC_HISTORY_TYPE),
        TypeSchema::new(NodeKind::Context, SERVING_ENVIRONMENT_TYPE).property("description", Str),
        TypeSchema::new(NodeKind::Context, INFERENCE_SERVICE_TYPE)
            .property("description", Str)
            .property("registered_model_id", Int)
            .property("serving_environment_id", Int)
            .property("model_version_id", Int)
            .property("runtime", Str)
            .property("desired_state", Str),
        TypeSchema::new(NodeKind::Execution, SERVE_MODEL_TYPE)
            .property("description", Str)
            .property("model_version_id", Int),
        TypeSchema::new(NodeKind::Context, EXPERIMENT_TYPE)
            .property("description", Str)
            .property("owner", Str)
            .property("state", Str),
        TypeSchema::new(NodeKind::Context, EXPERIMENT_RUN_TYPE)
            .property("description", Str)
            .property("owner", Str)
            .property("state", Str)
            .property("status", Str)
            .property("start_time_since_epoch", Int)
            .property("end_time_since_epoch", Int)
            .property("experiment_id", Int),
    ]
}

/// Register every registry type with the store
pub fn bootstrap<S: MetadataStore + ?Sized>(store: &S) -> StoreResult<()> {
    for schema in registry_types() {
        let name = schema.name.clone();
        let id = store.put_type(schema)?;
        tracing::debug!(type_name = %name, type_id = id, "registered type");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_bootstrap_is_idempotent() {
        let store = InMemoryStore::new();
        bootstrap(&store).unwrap();
        let first = store.get_type(NodeKind::Context, REGISTERED_MODEL_TYPE).unwrap();
        bootstrap(&store).unwrap();
        let second = store.get_type(NodeKind::Context, REGISTERED_MODEL_TYPE).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.properties, second.properties);
    }

    #[test]
    fn test_every_type_is_registered() {
        let store = InMemoryStore::new();
        bootstrap(&store).unwrap();
        for schema in registry_types() {
            assert!(store.get_type(schema.kind, &schema.name).is_ok(), "{}", schema.name);
        }
    }
}
