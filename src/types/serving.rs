//! Serving entities

use serde::{Deserialize, Serialize};

use crate::store::ExecutionState;
use crate::types::{impl_entity, wire_enum, EntityMeta};

/// A place models are deployed to (for example a namespace)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServingEnvironment {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
}

wire_enum! {
    /// Desired deployment state of an inference service
    InferenceServiceState {
        Deployed => "DEPLOYED",
        Undeployed => "UNDEPLOYED",
    }
}

/// A deployment of a registered model inside a serving environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceService {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Served model; required, fixed at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_model_id: Option<String>,
    /// Owning environment; required, fixed at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_environment_id: Option<String>,
    /// Pinned version; the latest version is served when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version_id: Option<String>,
    /// Serving runtime name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Whether the service should be deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<InferenceServiceState>,
}

/// One act of serving a model version within an inference service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeModel {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Last observed serving state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_state: Option<ExecutionState>,
    /// Served version; required, fixed at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version_id: Option<String>,
}

impl_entity! {
    ServingEnvironment => "ServingEnvironment",
    InferenceService => "InferenceService",
    ServeModel => "ServeModel",
}
