//! Polymorphic artifacts
//!
//! The `artifactType` tag selects exactly one branch. Metric history entries
//! are read back as metrics.

use serde::{Deserialize, Serialize};

use crate::store::ArtifactState;
use crate::types::{impl_entity, wire_enum, Entity, EntityMeta};

/// Model weights or any other servable model payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Location of the artifact payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Artifact lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ArtifactState>,
    /// Model format (e.g. `onnx`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_format_name: Option<String>,
    /// Model format version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_format_version: Option<String>,
    /// Storage credentials key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    /// Path within the storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Service account used to read the storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Kind of the source that produced the model (e.g. `kfp`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_source_kind: Option<String>,
    /// Class of the model source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_source_class: Option<String>,
    /// Group of the model source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_source_group: Option<String>,
    /// Id of the model source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_source_id: Option<String>,
    /// Name of the model source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_source_name: Option<String>,
    /// Experiment the model was trained in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    /// Run the model was trained in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_run_id: Option<String>,
}

/// Documentation attached to a model or run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocArtifact {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Location of the artifact payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Artifact lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ArtifactState>,
}

/// Training or evaluation data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Location of the artifact payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Artifact lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ArtifactState>,
    /// Content digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Kind of dataset source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Dataset source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Data schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Data profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Scalar measurement, optionally per training step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Artifact lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ArtifactState>,
    /// Measured value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Measurement time in epoch millis, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Training step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
}

wire_enum! {
    /// How a parameter value should be interpreted
    ParameterType {
        String => "string",
        Number => "number",
        Boolean => "boolean",
        Object => "object",
    }
}

/// Hyperparameter or other configuration input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Artifact lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ArtifactState>,
    /// Parameter value as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// How to read `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<ParameterType>,
}

impl_entity! {
    ModelArtifact => "ModelArtifact",
    DocArtifact => "DocArtifact",
    DataSet => "DataSet",
    Metric => "Metric",
    Parameter => "Parameter",
}

wire_enum! {
    /// Discriminant of [`Artifact`], also accepted as a listing filter
    ArtifactType {
        ModelArtifact => "model-artifact",
        DocArtifact => "doc-artifact",
        DataSet => "dataset-artifact",
        Metric => "metric",
        Parameter => "parameter",
    }
}

/// Any artifact kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "artifactType")]
pub enum Artifact {
    /// Model payload
    #[serde(rename = "model-artifact")]
    ModelArtifact(ModelArtifact),
    /// Documentation
    #[serde(rename = "doc-artifact")]
    DocArtifact(DocArtifact),
    /// Dataset
    #[serde(rename = "dataset-artifact")]
    DataSet(DataSet),
    /// Metric
    #[serde(rename = "metric")]
    Metric(Metric),
    /// Parameter
    #[serde(rename = "parameter")]
    Parameter(Parameter),
}

impl Artifact {
    /// Discriminant of this artifact
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            Artifact::ModelArtifact(_) => ArtifactType::ModelArtifact,
            Artifact::DocArtifact(_) => ArtifactType::DocArtifact,
            Artifact::DataSet(_) => ArtifactType::DataSet,
            Artifact::Metric(_) => ArtifactType::Metric,
            Artifact::Parameter(_) => ArtifactType::Parameter,
        }
    }
}

impl Entity for Artifact {
    const KIND: &'static str = "Artifact";

    fn meta(&self) -> &EntityMeta {
        match self {
            Artifact::ModelArtifact(a) => &a.meta,
            Artifact::DocArtifact(a) => &a.meta,
            Artifact::DataSet(a) => &a.meta,
            Artifact::Metric(a) => &a.meta,
            Artifact::Parameter(a) => &a.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        match self {
            Artifact::ModelArtifact(a) => &mut a.meta,
            Artifact::DocArtifact(a) => &mut a.meta,
            Artifact::DataSet(a) => &mut a.meta,
            Artifact::Metric(a) => &mut a.meta,
            Artifact::Parameter(a) => &mut a.meta,
        }
    }
}

impl From<ModelArtifact> for Artifact {
    fn from(a: ModelArtifact) -> Self {
        Artifact::ModelArtifact(a)
    }
}

impl From<Metric> for Artifact {
    fn from(a: Metric) -> Self {
        Artifact::Metric(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_json() {
        let parsed: Artifact = serde_json::from_value(json!({
            "artifactType": "model-artifact",
            "name": "Pickle model",
            "uri": "s3://bucket/model.pkl",
            "state": "LIVE",
        }))
        .unwrap();
        match &parsed {
            Artifact::ModelArtifact(a) => {
                assert_eq!(a.meta.name.as_deref(), Some("Pickle model"));
                assert_eq!(a.state, Some(ArtifactState::Live));
            }
            other => panic!("unexpected branch {:?}", other),
        }
        assert_eq!(serde_json::to_value(&parsed).unwrap()["artifactType"], "model-artifact");
    }

    #[test]
    fn test_unknown_artifact_type_is_rejected() {
        let res: Result<Artifact, _> = serde_json::from_value(json!({"artifactType": "video", "name": "x"}));
        assert!(res.is_err());
    }
}
