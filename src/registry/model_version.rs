//! Model versions (contexts owned by a registered model)

use crate::core::{Error, Result};
use crate::registry::mapper::{name_prefix, owned_meta, prefixed_name, NodeBase, PropertyReader};
use crate::registry::query::{by_params, owned_name, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::{MODEL_VERSION_TYPE, REGISTERED_MODEL_TYPE};
use crate::store::{Context, StoreImpl};
use crate::types::{ListOptions, ListPage, ModelVersion};

pub(crate) struct ModelVersionFamily;

impl Family for ModelVersionFamily {
    type Entity = ModelVersion;
    type Node = Context;

    const LABEL: &'static str = "model version";
    const NAME_POLICY: NamePolicy = NamePolicy::Required;
    const EDGE: ParentEdge = ParentEdge::ParentContext;
    const PARENT_REQUIRED: bool = true;
    const PARENT_LABEL: &'static str = "registered model";
    const TYPES: &'static [&'static str] = &[MODEL_VERSION_TYPE];
    const PARENT_TYPES: &'static [&'static str] = &[REGISTERED_MODEL_TYPE];

    fn override_not_editable(existing: &ModelVersion, update: &mut ModelVersion) -> Result<()> {
        update.registered_model_id = existing.registered_model_id.clone();
        Ok(())
    }

    fn to_node(types: &TypeRegistry, version: &ModelVersion, parent: Option<i64>) -> Result<Context> {
        let parent = parent.ok_or_else(|| Error::bad_request("model version requires a registered model"))?;
        let mut base = NodeBase::new(
            &version.meta,
            types.id(MODEL_VERSION_TYPE)?,
            prefixed_name(parent, settled_name(version)?),
        )?;
        base.props()
            .string("author", version.author.as_deref())
            .string("state", version.state.map(|s| s.as_str()));
        Ok(base.into_context())
    }

    fn to_domain(_types: &TypeRegistry, node: &Context) -> Result<ModelVersion> {
        let props = PropertyReader(&node.properties);
        Ok(ModelVersion {
            meta: owned_meta(node)?,
            author: props.string("author")?,
            state: props.parsed("state")?,
            registered_model_id: name_prefix(&node.name).map(str::to_string),
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update a model version
    ///
    /// On create the owning model is `registered_model_id`, falling back to the
    /// version's own `registeredModelId`. On update the owner is re-derived from
    /// the store and both are ignored.
    pub fn upsert_model_version(
        &self,
        version: ModelVersion,
        registered_model_id: Option<&str>,
    ) -> Result<ModelVersion> {
        let parent = registered_model_id
            .map(str::to_string)
            .or_else(|| version.registered_model_id.clone());
        self.upsert_entity::<ModelVersionFamily>(version, parent.as_deref())
    }

    /// Get a model version by id
    pub fn get_model_version_by_id(&self, id: &str) -> Result<ModelVersion> {
        self.get_entity::<ModelVersionFamily>(id)
    }

    /// Find one model version by name (within a registered model) and/or external id
    pub fn get_model_version_by_params(
        &self,
        name: Option<&str>,
        registered_model_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<ModelVersion> {
        let stored = owned_name(name, registered_model_id, ModelVersionFamily::PARENT_LABEL)?;
        self.find_one::<ModelVersionFamily>(by_params(stored, external_id)?)
    }

    /// List model versions, optionally only those of one registered model
    pub fn get_model_versions(
        &self,
        options: &ListOptions,
        registered_model_id: Option<&str>,
    ) -> Result<ListPage<ModelVersion>> {
        let query = match registered_model_id {
            Some(parent) => self.children_query::<ModelVersionFamily>(parent)?,
            None => QueryBuilder::new(),
        };
        self.list_entities::<ModelVersionFamily>(options, query)
    }
}
