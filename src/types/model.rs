//! Registered models and their versions

use serde::{Deserialize, Serialize};

use crate::types::{impl_entity, EntityMeta, LifecycleState};

/// A logical model, the root of its versions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredModel {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Owning user or team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
}

/// One version of a registered model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Author of the version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
    /// Owning registered model; fixed at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_model_id: Option<String>,
}

impl_entity! {
    RegisteredModel => "RegisteredModel",
    ModelVersion => "ModelVersion",
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_json() {
        let version = ModelVersion {
            meta: EntityMeta::named("v1"),
            registered_model_id: Some("1".to_string()),
            state: Some(LifecycleState::Live),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&version).unwrap(),
            json!({"name": "v1", "registeredModelId": "1", "state": "LIVE"})
        );

        let parsed: RegisteredModel = serde_json::from_value(json!({"name": "m", "owner": "me"})).unwrap();
        assert_eq!(parsed.meta.name.as_deref(), Some("m"));
        assert_eq!(parsed.owner.as_deref(), Some("me"));
    }
}
