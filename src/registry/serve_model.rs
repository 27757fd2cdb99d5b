//! Serve-model executions (associated with an inference service)

use crate::core::{Error, Result};
use crate::registry::inference_service::InferenceServiceFamily;
use crate::registry::mapper::{owned_meta, parse_id, prefixed_name, NodeBase, PropertyReader};
use crate::registry::model_version::ModelVersionFamily;
use crate::registry::query::{by_params, owned_name, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::{INFERENCE_SERVICE_TYPE, SERVE_MODEL_TYPE};
use crate::store::{Execution, StoreImpl};
use crate::types::{Entity, ListOptions, ListPage, ServeModel};

pub(crate) struct ServeModelFamily;

impl Family for ServeModelFamily {
    type Entity = ServeModel;
    type Node = Execution;

    const LABEL: &'static str = "serve model";
    const NAME_POLICY: NamePolicy = NamePolicy::Generated;
    const EDGE: ParentEdge = ParentEdge::Association;
    const PARENT_REQUIRED: bool = true;
    const PARENT_LABEL: &'static str = InferenceServiceFamily::LABEL;
    const TYPES: &'static [&'static str] = &[SERVE_MODEL_TYPE];
    const PARENT_TYPES: &'static [&'static str] = &[INFERENCE_SERVICE_TYPE];

    fn override_not_editable(existing: &ServeModel, update: &mut ServeModel) -> Result<()> {
        update.model_version_id = existing.model_version_id.clone();
        Ok(())
    }

    fn to_node(types: &TypeRegistry, serve: &ServeModel, parent: Option<i64>) -> Result<Execution> {
        let parent = parent.ok_or_else(|| Error::bad_request("serve model requires an inference service"))?;
        let version = serve
            .model_version_id
            .as_deref()
            .ok_or_else(|| Error::bad_request("missing modelVersionId for serve model"))?;

        let mut base = NodeBase::new(
            &serve.meta,
            types.id(SERVE_MODEL_TYPE)?,
            prefixed_name(parent, settled_name(serve)?),
        )?;
        base.props()
            .int("model_version_id", Some(parse_id(version, ModelVersionFamily::LABEL)?));
        Ok(base.into_execution(serve.last_known_state))
    }

    fn to_domain(_types: &TypeRegistry, node: &Execution) -> Result<ServeModel> {
        Ok(ServeModel {
            meta: owned_meta(node)?,
            last_known_state: node.last_known_state,
            model_version_id: PropertyReader(&node.properties).id("model_version_id")?,
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update a serve-model execution of an inference service
    pub fn upsert_serve_model(&self, serve: ServeModel, inference_service_id: Option<&str>) -> Result<ServeModel> {
        if serve.id().is_none() {
            let version = serve
                .model_version_id
                .as_deref()
                .ok_or_else(|| Error::bad_request("missing modelVersionId for serve model"))?;
            self.fetch_node::<ModelVersionFamily>(parse_id(version, ModelVersionFamily::LABEL)?)?;
        }
        self.upsert_entity::<ServeModelFamily>(serve, inference_service_id)
    }

    /// Get a serve model by id
    pub fn get_serve_model_by_id(&self, id: &str) -> Result<ServeModel> {
        self.get_entity::<ServeModelFamily>(id)
    }

    /// Find one serve model by name (within an inference service) and/or external id
    pub fn get_serve_model_by_params(
        &self,
        name: Option<&str>,
        inference_service_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<ServeModel> {
        let stored = owned_name(name, inference_service_id, ServeModelFamily::PARENT_LABEL)?;
        self.find_one::<ServeModelFamily>(by_params(stored, external_id)?)
    }

    /// List serve models, optionally only those of one inference service
    pub fn get_serve_models(
        &self,
        options: &ListOptions,
        inference_service_id: Option<&str>,
    ) -> Result<ListPage<ServeModel>> {
        let query = match inference_service_id {
            Some(parent) => self.children_query::<ServeModelFamily>(parent)?,
            None => QueryBuilder::new(),
        };
        self.list_entities::<ServeModelFamily>(options, query)
    }
}
