//! Serving environments (top-level contexts)

use crate::core::Result;
use crate::registry::mapper::{meta_from_node, NodeBase};
use crate::registry::query::{by_params, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::SERVING_ENVIRONMENT_TYPE;
use crate::store::{Context, StoreImpl};
use crate::types::{ListOptions, ListPage, ServingEnvironment};

pub(crate) struct ServingEnvironmentFamily;

impl Family for ServingEnvironmentFamily {
    type Entity = ServingEnvironment;
    type Node = Context;

    const LABEL: &'static str = "serving environment";
    const NAME_POLICY: NamePolicy = NamePolicy::Required;
    const EDGE: ParentEdge = ParentEdge::None;
    const PARENT_REQUIRED: bool = false;
    const TYPES: &'static [&'static str] = &[SERVING_ENVIRONMENT_TYPE];

    fn override_not_editable(_existing: &ServingEnvironment, _update: &mut ServingEnvironment) -> Result<()> {
        Ok(())
    }

    fn to_node(types: &TypeRegistry, env: &ServingEnvironment, _parent: Option<i64>) -> Result<Context> {
        let base = NodeBase::new(
            &env.meta,
            types.id(SERVING_ENVIRONMENT_TYPE)?,
            settled_name(env)?.to_string(),
        )?;
        Ok(base.into_context())
    }

    fn to_domain(_types: &TypeRegistry, node: &Context) -> Result<ServingEnvironment> {
        Ok(ServingEnvironment {
            meta: meta_from_node(node, node.name.clone())?,
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update a serving environment
    pub fn upsert_serving_environment(&self, env: ServingEnvironment) -> Result<ServingEnvironment> {
        self.upsert_entity::<ServingEnvironmentFamily>(env, None)
    }

    /// Get a serving environment by id
    pub fn get_serving_environment_by_id(&self, id: &str) -> Result<ServingEnvironment> {
        self.get_entity::<ServingEnvironmentFamily>(id)
    }

    /// Find one serving environment by name and/or external id
    pub fn get_serving_environment_by_params(
        &self,
        name: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<ServingEnvironment> {
        self.find_one::<ServingEnvironmentFamily>(by_params(name.map(str::to_string), external_id)?)
    }

    /// List serving environments
    pub fn get_serving_environments(&self, options: &ListOptions) -> Result<ListPage<ServingEnvironment>> {
        self.list_entities::<ServingEnvironmentFamily>(options, QueryBuilder::new())
    }
}
