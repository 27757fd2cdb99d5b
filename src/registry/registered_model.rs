//! Registered models (top-level contexts)

use crate::core::Result;
use crate::registry::mapper::{meta_from_node, NodeBase, PropertyReader};
use crate::registry::query::{by_params, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::REGISTERED_MODEL_TYPE;
use crate::store::{Context, StoreImpl};
use crate::types::{ListOptions, ListPage, RegisteredModel};

pub(crate) struct RegisteredModelFamily;

impl Family for RegisteredModelFamily {
    type Entity = RegisteredModel;
    type Node = Context;

    const LABEL: &'static str = "registered model";
    const NAME_POLICY: NamePolicy = NamePolicy::Required;
    const EDGE: ParentEdge = ParentEdge::None;
    const PARENT_REQUIRED: bool = false;
    const TYPES: &'static [&'static str] = &[REGISTERED_MODEL_TYPE];

    fn override_not_editable(_existing: &RegisteredModel, _update: &mut RegisteredModel) -> Result<()> {
        Ok(())
    }

    fn to_node(types: &TypeRegistry, model: &RegisteredModel, _parent: Option<i64>) -> Result<Context> {
        let mut base = NodeBase::new(
            &model.meta,
            types.id(REGISTERED_MODEL_TYPE)?,
            settled_name(model)?.to_string(),
        )?;
        base.props()
            .string("owner", model.owner.as_deref())
            .string("state", model.state.map(|s| s.as_str()));
        Ok(base.into_context())
    }

    fn to_domain(_types: &TypeRegistry, node: &Context) -> Result<RegisteredModel> {
        let props = PropertyReader(&node.properties);
        Ok(RegisteredModel {
            meta: meta_from_node(node, node.name.clone())?,
            owner: props.string("owner")?,
            state: props.parsed("state")?,
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update a registered model
    pub fn upsert_registered_model(&self, model: RegisteredModel) -> Result<RegisteredModel> {
        self.upsert_entity::<RegisteredModelFamily>(model, None)
    }

    /// Get a registered model by id
    pub fn get_registered_model_by_id(&self, id: &str) -> Result<RegisteredModel> {
        self.get_entity::<RegisteredModelFamily>(id)
    }

    /// Find one registered model by name and/or external id
    pub fn get_registered_model_by_params(
        &self,
        name: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<RegisteredModel> {
        self.find_one::<RegisteredModelFamily>(by_params(name.map(str::to_string), external_id)?)
    }

    /// List registered models
    pub fn get_registered_models(&self, options: &ListOptions) -> Result<ListPage<RegisteredModel>> {
        self.list_entities::<RegisteredModelFamily>(options, QueryBuilder::new())
    }
}
