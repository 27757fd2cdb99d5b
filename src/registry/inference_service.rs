//! Inference services (contexts owned by a serving environment)
//!
//! A service always names the registered model it serves. It may pin a model
//! version; without one the latest version of the model is the served one.

use tracing::debug;

use crate::core::{Error, Result};
use crate::registry::mapper::{owned_meta, parse_id, prefixed_name, NodeBase, PropertyReader};
use crate::registry::model_version::ModelVersionFamily;
use crate::registry::query::{by_params, owned_name, quote, QueryBuilder};
use crate::registry::registered_model::RegisteredModelFamily;
use crate::registry::serving_environment::ServingEnvironmentFamily;
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::{INFERENCE_SERVICE_TYPE, SERVING_ENVIRONMENT_TYPE};
use crate::store::{Context, StoreImpl};
use crate::types::{Entity, InferenceService, ListOptions, ListPage, ModelArtifact, ModelVersion, RegisteredModel};

pub(crate) struct InferenceServiceFamily;

fn optional_id(id: Option<&String>, what: &str) -> Result<Option<i64>> {
    id.map(|id| parse_id(id, what)).transpose()
}

impl Family for InferenceServiceFamily {
    type Entity = InferenceService;
    type Node = Context;

    const LABEL: &'static str = "inference service";
    const NAME_POLICY: NamePolicy = NamePolicy::Generated;
    const EDGE: ParentEdge = ParentEdge::ParentContext;
    const PARENT_REQUIRED: bool = true;
    const PARENT_LABEL: &'static str = ServingEnvironmentFamily::LABEL;
    const TYPES: &'static [&'static str] = &[INFERENCE_SERVICE_TYPE];
    const PARENT_TYPES: &'static [&'static str] = &[SERVING_ENVIRONMENT_TYPE];

    fn override_not_editable(existing: &InferenceService, update: &mut InferenceService) -> Result<()> {
        update.registered_model_id = existing.registered_model_id.clone();
        update.serving_environment_id = existing.serving_environment_id.clone();
        Ok(())
    }

    fn to_node(types: &TypeRegistry, service: &InferenceService, parent: Option<i64>) -> Result<Context> {
        let parent = parent.ok_or_else(|| Error::bad_request("inference service requires a serving environment"))?;
        let registered_model_id = optional_id(service.registered_model_id.as_ref(), RegisteredModelFamily::LABEL)?
            .ok_or_else(|| Error::bad_request("missing registeredModelId for inference service"))?;

        let mut base = NodeBase::new(
            &service.meta,
            types.id(INFERENCE_SERVICE_TYPE)?,
            prefixed_name(parent, settled_name(service)?),
        )?;
        base.props()
            .int("registered_model_id", Some(registered_model_id))
            .int("serving_environment_id", Some(parent))
            .int(
                "model_version_id",
                optional_id(service.model_version_id.as_ref(), ModelVersionFamily::LABEL)?,
            )
            .string("runtime", service.runtime.as_deref())
            .string("desired_state", service.desired_state.map(|s| s.as_str()));
        Ok(base.into_context())
    }

    fn to_domain(_types: &TypeRegistry, node: &Context) -> Result<InferenceService> {
        let props = PropertyReader(&node.properties);
        Ok(InferenceService {
            meta: owned_meta(node)?,
            registered_model_id: props.id("registered_model_id")?,
            serving_environment_id: props.id("serving_environment_id")?,
            model_version_id: props.id("model_version_id")?,
            runtime: props.string("runtime")?,
            desired_state: props.parsed("desired_state")?,
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update an inference service
    ///
    /// The owning environment comes from `servingEnvironmentId` on create. The
    /// served model, and the pinned version when given, must exist.
    pub fn upsert_inference_service(&self, service: InferenceService) -> Result<InferenceService> {
        if service.id().is_none() {
            let model_id = service
                .registered_model_id
                .as_deref()
                .ok_or_else(|| Error::bad_request("missing registeredModelId for inference service"))?;
            self.fetch_node::<RegisteredModelFamily>(parse_id(model_id, RegisteredModelFamily::LABEL)?)?;
        }
        if let Some(version_id) = service.model_version_id.as_deref() {
            self.fetch_node::<ModelVersionFamily>(parse_id(version_id, ModelVersionFamily::LABEL)?)?;
        }

        let parent = service.serving_environment_id.clone();
        self.upsert_entity::<InferenceServiceFamily>(service, parent.as_deref())
    }

    /// Get an inference service by id
    pub fn get_inference_service_by_id(&self, id: &str) -> Result<InferenceService> {
        self.get_entity::<InferenceServiceFamily>(id)
    }

    /// Find one inference service by name (within an environment) and/or external id
    pub fn get_inference_service_by_params(
        &self,
        name: Option<&str>,
        serving_environment_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<InferenceService> {
        let stored = owned_name(name, serving_environment_id, InferenceServiceFamily::PARENT_LABEL)?;
        self.find_one::<InferenceServiceFamily>(by_params(stored, external_id)?)
    }

    /// List inference services, optionally narrowed to one environment and runtime
    pub fn get_inference_services(
        &self,
        options: &ListOptions,
        serving_environment_id: Option<&str>,
        runtime: Option<&str>,
    ) -> Result<ListPage<InferenceService>> {
        let query = match serving_environment_id {
            Some(parent) => self.children_query::<InferenceServiceFamily>(parent)?,
            None => QueryBuilder::new(),
        };
        let query = query.and_opt(
            runtime
                .filter(|r| !r.is_empty())
                .map(|r| format!("properties.runtime.string_value = {}", quote(r))),
        );
        self.list_entities::<InferenceServiceFamily>(options, query)
    }

    /// Registered model served by an inference service
    pub fn get_registered_model_by_inference_service(&self, inference_service_id: &str) -> Result<RegisteredModel> {
        let service = self.get_inference_service_by_id(inference_service_id)?;
        let model_id = service.registered_model_id.ok_or_else(|| {
            Error::not_found(format!(
                "inference service {} has no registered model",
                inference_service_id
            ))
        })?;
        self.get_registered_model_by_id(&model_id)
    }

    /// Model version served by an inference service
    ///
    /// The pinned version if there is one, else the latest version of the model.
    pub fn get_model_version_by_inference_service(&self, inference_service_id: &str) -> Result<ModelVersion> {
        let service = self.get_inference_service_by_id(inference_service_id)?;
        if let Some(version_id) = service.model_version_id.as_deref() {
            return self.get_model_version_by_id(version_id);
        }

        let model_id = service.registered_model_id.as_deref().ok_or_else(|| {
            Error::not_found(format!(
                "inference service {} has no registered model",
                inference_service_id
            ))
        })?;
        debug!(inference_service_id, model_id, "no pinned version, serving latest");
        self.latest::<ModelVersionFamily>(self.children_query::<ModelVersionFamily>(model_id)?)
    }

    /// Latest model artifact of the version served by an inference service
    pub fn get_model_artifact_by_inference_service(&self, inference_service_id: &str) -> Result<ModelArtifact> {
        let version = self.get_model_version_by_inference_service(inference_service_id)?;
        let version_id = version
            .id()
            .ok_or_else(|| Error::not_found(format!("model version of {} has no id", inference_service_id)))?;
        self.latest_model_artifact(version_id)
    }
}
