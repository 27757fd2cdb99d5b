//! Experiment runs (contexts owned by an experiment)

use crate::core::{Error, Result};
use crate::registry::experiment::ExperimentFamily;
use crate::registry::mapper::{name_prefix, owned_meta, parse_millis, prefixed_name, NodeBase, PropertyReader};
use crate::registry::query::{by_params, owned_name, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::{EXPERIMENT_RUN_TYPE, EXPERIMENT_TYPE};
use crate::store::{Context, StoreImpl};
use crate::types::{ExperimentRun, ListOptions, ListPage};

pub(crate) struct ExperimentRunFamily;

impl Family for ExperimentRunFamily {
    type Entity = ExperimentRun;
    type Node = Context;

    const LABEL: &'static str = "experiment run";
    const NAME_POLICY: NamePolicy = NamePolicy::Generated;
    const EDGE: ParentEdge = ParentEdge::ParentContext;
    const PARENT_REQUIRED: bool = true;
    const PARENT_LABEL: &'static str = ExperimentFamily::LABEL;
    const TYPES: &'static [&'static str] = &[EXPERIMENT_RUN_TYPE];
    const PARENT_TYPES: &'static [&'static str] = &[EXPERIMENT_TYPE];

    fn override_not_editable(existing: &ExperimentRun, update: &mut ExperimentRun) -> Result<()> {
        update.experiment_id = existing.experiment_id.clone();
        Ok(())
    }

    fn to_node(types: &TypeRegistry, run: &ExperimentRun, parent: Option<i64>) -> Result<Context> {
        let parent = parent.ok_or_else(|| Error::bad_request("experiment run requires an experiment"))?;
        let mut base = NodeBase::new(
            &run.meta,
            types.id(EXPERIMENT_RUN_TYPE)?,
            prefixed_name(parent, settled_name(run)?),
        )?;
        base.props()
            .string("owner", run.owner.as_deref())
            .string("state", run.state.map(|s| s.as_str()))
            .string("status", run.status.map(|s| s.as_str()))
            .int(
                "start_time_since_epoch",
                parse_millis(run.start_time_since_epoch.as_ref(), "startTimeSinceEpoch")?,
            )
            .int(
                "end_time_since_epoch",
                parse_millis(run.end_time_since_epoch.as_ref(), "endTimeSinceEpoch")?,
            )
            .int("experiment_id", Some(parent));
        Ok(base.into_context())
    }

    fn to_domain(_types: &TypeRegistry, node: &Context) -> Result<ExperimentRun> {
        let props = PropertyReader(&node.properties);
        let experiment_id = match props.id("experiment_id")? {
            Some(id) => Some(id),
            None => name_prefix(&node.name).map(str::to_string),
        };
        Ok(ExperimentRun {
            meta: owned_meta(node)?,
            owner: props.string("owner")?,
            state: props.parsed("state")?,
            status: props.parsed("status")?,
            start_time_since_epoch: props.id("start_time_since_epoch")?,
            end_time_since_epoch: props.id("end_time_since_epoch")?,
            experiment_id,
        })
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update an experiment run
    ///
    /// On create the owner is `experiment_id`, falling back to the run's own
    /// `experimentId`.
    pub fn upsert_experiment_run(
        &self,
        run: ExperimentRun,
        experiment_id: Option<&str>,
    ) -> Result<ExperimentRun> {
        let parent = experiment_id.map(str::to_string).or_else(|| run.experiment_id.clone());
        self.upsert_entity::<ExperimentRunFamily>(run, parent.as_deref())
    }

    /// Get an experiment run by id
    pub fn get_experiment_run_by_id(&self, id: &str) -> Result<ExperimentRun> {
        self.get_entity::<ExperimentRunFamily>(id)
    }

    /// Find one experiment run by name (within an experiment) and/or external id
    pub fn get_experiment_run_by_params(
        &self,
        name: Option<&str>,
        experiment_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<ExperimentRun> {
        let stored = owned_name(name, experiment_id, ExperimentRunFamily::PARENT_LABEL)?;
        self.find_one::<ExperimentRunFamily>(by_params(stored, external_id)?)
    }

    /// List experiment runs, optionally only those of one experiment
    pub fn get_experiment_runs(
        &self,
        options: &ListOptions,
        experiment_id: Option<&str>,
    ) -> Result<ListPage<ExperimentRun>> {
        let query = match experiment_id {
            Some(parent) => self.children_query::<ExperimentRunFamily>(parent)?,
            None => QueryBuilder::new(),
        };
        self.list_entities::<ExperimentRunFamily>(options, query)
    }
}
