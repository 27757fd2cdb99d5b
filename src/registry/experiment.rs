//! Experiments (top-level contexts)

use crate::core::Result;
use crate::registry::mapper::{meta_from_node, NodeBase, PropertyReader};
use crate::registry::query::{by_params, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::EXPERIMENT_TYPE;
use crate::store::{Context, StoreImpl};
use crate::types::{Experiment, ListOptions, ListPage};

pub(crate) struct ExperimentFamily;

impl Family for ExperimentFamily {
    type Entity = Experiment;
    type Node = Context;

    const LABEL: &'static str = "experiment";
    const NAME_POLICY: NamePolicy = NamePolicy::Required;
    const EDGE: ParentEdge = ParentEdge::None;
    const PARENT_REQUIRED: bool = false;
    const TYPES: &'static [&'static str] = &[EXPERIMENT_TYPE];

    fn override_not_editable(_existing: &Experiment, _update: &mut Experiment) -> Result<()> {
        Ok(())
    }

    fn to_node(types: &TypeRegistry, experiment: &Experiment, _parent: Option<i64>) -> Result<Context> {
        let mut base = NodeBase::new(
            &experiment.meta,
            types.id(EXPERIMENT_TYPE)?,
            settled_name(experiment)?.to_string(),
        )?;
        base.props()
            .string("owner", experiment.owner.as_deref())
            .string("state", experiment.state.map(|s| s.as_str()));
        Ok(base.into_context())
    }

    fn to_domain(_types: &TypeRegistry, node: &Context) -> Result<Experiment> {
        let props = PropertyReader(&node.properties);
        Ok(Experiment {
            meta: meta_from_node(node, node.name.clone())?,
            owner: props.string("owner")?,
            state: props.parsed("state")?,
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update an experiment
    pub fn upsert_experiment(&self, experiment: Experiment) -> Result<Experiment> {
        self.upsert_entity::<ExperimentFamily>(experiment, None)
    }

    /// Get an experiment by id
    pub fn get_experiment_by_id(&self, id: &str) -> Result<Experiment> {
        self.get_entity::<ExperimentFamily>(id)
    }

    /// Find one experiment by name and/or external id
    pub fn get_experiment_by_params(&self, name: Option<&str>, external_id: Option<&str>) -> Result<Experiment> {
        self.find_one::<ExperimentFamily>(by_params(name.map(str::to_string), external_id)?)
    }

    /// List experiments
    pub fn get_experiments(&self, options: &ListOptions) -> Result<ListPage<Experiment>> {
        self.list_entities::<ExperimentFamily>(options, QueryBuilder::new())
    }
}
