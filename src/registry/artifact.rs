//! Artifacts (polymorphic, attributed to any context or standalone)
//!
//! Metric writes under a parent converge on one record per metric name and
//! append a history entry on every write.

use tracing::debug;

use crate::core::{Error, Result};
use crate::registry::experiment_run::ExperimentRunFamily;
use crate::registry::mapper::{
    name_prefix, owned_meta, parse_id, parse_millis, prefixed_name, NodeBase, PropertyReader,
};
use crate::registry::metric_history::MetricHistoryFamily;
use crate::registry::model_version::ModelVersionFamily;
use crate::registry::query::{by_params, quote, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::schema::*;
use crate::store::{Artifact as ArtifactNode, StoreImpl};
use crate::types::{
    Artifact, ArtifactType, DataSet, DocArtifact, Entity, EntityMeta, ListOptions, ListPage, Metric, ModelArtifact,
    Parameter,
};

pub(crate) struct ArtifactFamily;

/// Store type of an artifact discriminant
pub(crate) fn store_type(artifact_type: ArtifactType) -> &'static str {
    match artifact_type {
        ArtifactType::ModelArtifact => MODEL_ARTIFACT_TYPE,
        ArtifactType::DocArtifact => DOC_ARTIFACT_TYPE,
        ArtifactType::DataSet => DATA_SET_TYPE,
        ArtifactType::Metric => METRIC_TYPE,
        ArtifactType::Parameter => PARAMETER_TYPE,
    }
}

/// Node for a metric or metric history entry
pub(crate) fn metric_node(type_id: i64, metric: &Metric, stored_name: String) -> Result<ArtifactNode> {
    let mut base = NodeBase::new(&metric.meta, type_id, stored_name)?;
    base.props()
        .double("value", metric.value)
        .int("timestamp", parse_millis(metric.timestamp.as_ref(), "timestamp")?)
        .int("step", metric.step);
    Ok(base.into_artifact(None, metric.state))
}

/// Metric fields of a metric or metric history node
pub(crate) fn metric_from_node(node: &ArtifactNode, meta: EntityMeta) -> Result<Metric> {
    let props = PropertyReader(&node.properties);
    Ok(Metric {
        meta,
        state: node.state,
        value: props.double("value")?,
        timestamp: props.int("timestamp")?.map(|t| t.to_string()),
        step: props.int("step")?,
    })
}

impl Family for ArtifactFamily {
    type Entity = Artifact;
    type Node = ArtifactNode;

    const LABEL: &'static str = "artifact";
    const NAME_POLICY: NamePolicy = NamePolicy::Generated;
    const EDGE: ParentEdge = ParentEdge::Attribution;
    const PARENT_REQUIRED: bool = false;
    const PARENT_LABEL: &'static str = "parent resource";
    const TYPES: &'static [&'static str] =
        &[MODEL_ARTIFACT_TYPE, DOC_ARTIFACT_TYPE, DATA_SET_TYPE, METRIC_TYPE, PARAMETER_TYPE];

    fn override_not_editable(existing: &Artifact, update: &mut Artifact) -> Result<()> {
        if existing.artifact_type() != update.artifact_type() {
            return Err(Error::bad_request(format!(
                "artifactType of artifact {} cannot change from {} to {}",
                existing.id().unwrap_or_default(),
                existing.artifact_type().as_str(),
                update.artifact_type().as_str()
            )));
        }
        Ok(())
    }

    fn to_node(types: &TypeRegistry, artifact: &Artifact, parent: Option<i64>) -> Result<ArtifactNode> {
        let local = settled_name(artifact)?;
        let stored_name = match parent {
            Some(parent) => prefixed_name(parent, local),
            None if name_prefix(local).is_some() => {
                return Err(Error::bad_request(format!(
                    "standalone artifact name '{}' must not start with '<id>:'",
                    local
                )))
            }
            None => local.to_string(),
        };
        let type_id = types.id(store_type(artifact.artifact_type()))?;

        let node = match artifact {
            Artifact::ModelArtifact(a) => {
                let mut base = NodeBase::new(&a.meta, type_id, stored_name)?;
                base.props()
                    .string("model_format_name", a.model_format_name.as_deref())
                    .string("model_format_version", a.model_format_version.as_deref())
                    .string("storage_key", a.storage_key.as_deref())
                    .string("storage_path", a.storage_path.as_deref())
                    .string("service_account_name", a.service_account_name.as_deref())
                    .string("model_source_kind", a.model_source_kind.as_deref())
                    .string("model_source_class", a.model_source_class.as_deref())
                    .string("model_source_group", a.model_source_group.as_deref())
                    .string("model_source_id", a.model_source_id.as_deref())
                    .string("model_source_name", a.model_source_name.as_deref())
                    .string("experiment_id", a.experiment_id.as_deref())
                    .string("experiment_run_id", a.experiment_run_id.as_deref());
                base.into_artifact(a.uri.clone(), a.state)
            }
            Artifact::DocArtifact(a) => NodeBase::new(&a.meta, type_id, stored_name)?.into_artifact(a.uri.clone(), a.state),
            Artifact::DataSet(a) => {
                let mut base = NodeBase::new(&a.meta, type_id, stored_name)?;
                base.props()
                    .string("digest", a.digest.as_deref())
                    .string("source_type", a.source_type.as_deref())
                    .string("source", a.source.as_deref())
                    .string("schema", a.schema.as_deref())
                    .string("profile", a.profile.as_deref());
                base.into_artifact(a.uri.clone(), a.state)
            }
            Artifact::Metric(m) => metric_node(type_id, m, stored_name)?,
            Artifact::Parameter(p) => {
                let mut base = NodeBase::new(&p.meta, type_id, stored_name)?;
                base.props()
                    .string("value", p.value.as_deref())
                    .string("parameter_type", p.parameter_type.map(|t| t.as_str()));
                base.into_artifact(None, p.state)
            }
        };
        Ok(node)
    }

    fn to_domain(types: &TypeRegistry, node: &ArtifactNode) -> Result<Artifact> {
        let meta = owned_meta(node)?;
        let props = PropertyReader(&node.properties);

        let artifact = match types.name_of(node.type_id) {
            Some(MODEL_ARTIFACT_TYPE) => Artifact::ModelArtifact(ModelArtifact {
                meta,
                uri: node.uri.clone(),
                state: node.state,
                model_format_name: props.string("model_format_name")?,
                model_format_version: props.string("model_format_version")?,
                storage_key: props.string("storage_key")?,
                storage_path: props.string("storage_path")?,
                service_account_name: props.string("service_account_name")?,
                model_source_kind: props.string("model_source_kind")?,
                model_source_class: props.string("model_source_class")?,
                model_source_group: props.string("model_source_group")?,
                model_source_id: props.string("model_source_id")?,
                model_source_name: props.string("model_source_name")?,
                experiment_id: props.string("experiment_id")?,
                experiment_run_id: props.string("experiment_run_id")?,
            }),
            Some(DOC_ARTIFACT_TYPE) => Artifact::DocArtifact(DocArtifact {
                meta,
                uri: node.uri.clone(),
                state: node.state,
            }),
            Some(DATA_SET_TYPE) => Artifact::DataSet(DataSet {
                meta,
                uri: node.uri.clone(),
                state: node.state,
                digest: props.string("digest")?,
                source_type: props.string("source_type")?,
                source: props.string("source")?,
                schema: props.string("schema")?,
                profile: props.string("profile")?,
            }),
            Some(METRIC_TYPE) => Artifact::Metric(metric_from_node(node, meta)?),
            Some(PARAMETER_TYPE) => Artifact::Parameter(Parameter {
                meta,
                state: node.state,
                value: props.string("value")?,
                parameter_type: props.parsed("parameter_type")?,
            }),
            _ => {
                return Err(Error::bad_request(format!(
                    "artifact {} has unknown type id {}",
                    node.id.unwrap_or_default(),
                    node.type_id
                )))
            }
        };
        Ok(artifact)
    }
}

fn expect_model_artifact(artifact: Artifact) -> Result<ModelArtifact> {
    match artifact {
        Artifact::ModelArtifact(a) => Ok(a),
        other => Err(Error::not_found(format!(
            "artifact {} is a {}, not a model artifact",
            other.id().unwrap_or_default(),
            other.artifact_type().as_str()
        ))),
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create or update an artifact, standalone or attributed to any context
    pub fn upsert_artifact(&self, mut artifact: Artifact, parent_resource_id: Option<&str>) -> Result<Artifact> {
        if let (Artifact::Metric(metric), Some(parent)) = (&artifact, parent_resource_id) {
            if let (None, Some(name)) = (metric.meta.id.as_ref(), metric.meta.name.as_deref()) {
                if let Some(existing) = self.existing_metric_id(name, parent)? {
                    debug!(metric = name, id = %existing, "metric exists under parent, updating");
                    artifact.meta_mut().id = Some(existing);
                }
            }
        }

        let saved = self.upsert_entity::<ArtifactFamily>(artifact, parent_resource_id)?;

        if let Artifact::Metric(metric) = &saved {
            let id = parse_id(saved.id().unwrap_or_default(), ArtifactFamily::LABEL)?;
            let node = self.fetch_node::<ArtifactFamily>(id)?;
            match self.parent_of::<ArtifactFamily>(&node)? {
                Some(parent) => self.record_metric_history(metric, parent)?,
                None => debug!(id, "standalone metric, no history recorded"),
            }
        }
        Ok(saved)
    }

    fn existing_metric_id(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        let parent = parse_id(parent_id, ArtifactFamily::PARENT_LABEL)?;
        let options = QueryBuilder::new()
            .and(format!("name = {}", quote(&prefixed_name(parent, name))))
            .build(&ListOptions::page(1));
        let page = self.store.get_artifacts_by_type(METRIC_TYPE, &options)?;
        Ok(page.items.first().and_then(|n| n.id).map(|id| id.to_string()))
    }

    fn record_metric_history(&self, metric: &Metric, parent: i64) -> Result<()> {
        let timestamp = metric
            .meta
            .last_update_time_since_epoch
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());
        let entry = Metric {
            meta: EntityMeta {
                name: Some(format!("{}__{}", metric.meta.name.as_deref().unwrap_or_default(), timestamp)),
                description: metric.meta.description.clone(),
                custom_properties: metric.meta.custom_properties.clone(),
                ..Default::default()
            },
            ..metric.clone()
        };
        self.upsert_entity::<MetricHistoryFamily>(Artifact::Metric(entry), Some(&parent.to_string()))?;
        Ok(())
    }

    /// Create or update an artifact owned by a model version
    pub fn upsert_model_version_artifact(
        &self,
        artifact: Artifact,
        model_version_id: Option<&str>,
    ) -> Result<Artifact> {
        if artifact.id().is_none() {
            let parent = model_version_id
                .ok_or_else(|| Error::bad_request("missing model version id, cannot create artifact"))?;
            self.fetch_node::<ModelVersionFamily>(parse_id(parent, ModelVersionFamily::LABEL)?)?;
        }
        self.upsert_artifact(artifact, model_version_id)
    }

    /// Create or update an artifact owned by an experiment run
    pub fn upsert_experiment_run_artifact(
        &self,
        artifact: Artifact,
        experiment_run_id: Option<&str>,
    ) -> Result<Artifact> {
        if artifact.id().is_none() {
            let parent = experiment_run_id
                .ok_or_else(|| Error::bad_request("missing experiment run id, cannot create artifact"))?;
            self.fetch_node::<ExperimentRunFamily>(parse_id(parent, ExperimentRunFamily::LABEL)?)?;
        }
        self.upsert_artifact(artifact, experiment_run_id)
    }

    /// Create or update a standalone model artifact
    pub fn upsert_model_artifact(&self, artifact: ModelArtifact) -> Result<ModelArtifact> {
        expect_model_artifact(self.upsert_artifact(Artifact::ModelArtifact(artifact), None)?)
    }

    /// Get any artifact by id
    pub fn get_artifact_by_id(&self, id: &str) -> Result<Artifact> {
        self.get_entity::<ArtifactFamily>(id)
    }

    /// Find one artifact by name (within a parent, if given) and/or external id
    pub fn get_artifact_by_params(
        &self,
        name: Option<&str>,
        parent_resource_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Artifact> {
        self.find_one::<ArtifactFamily>(self.artifact_params(name, parent_resource_id, external_id)?)
    }

    fn artifact_params(
        &self,
        name: Option<&str>,
        parent_resource_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<QueryBuilder> {
        let stored = match (name, parent_resource_id) {
            (Some(name), Some(parent)) => Some(prefixed_name(parse_id(parent, ArtifactFamily::PARENT_LABEL)?, name)),
            (name, _) => name.map(str::to_string),
        };
        by_params(stored, external_id)
    }

    /// List artifacts of every kind except metric history
    pub fn get_artifacts(
        &self,
        artifact_type: Option<ArtifactType>,
        options: &ListOptions,
        parent_resource_id: Option<&str>,
    ) -> Result<ListPage<Artifact>> {
        let query = match parent_resource_id {
            Some(parent) => self.children_query::<ArtifactFamily>(parent)?,
            None => QueryBuilder::new(),
        };
        let query = query.and_opt(artifact_type.map(|t| format!("type = {}", quote(store_type(t)))));
        self.list_entities::<ArtifactFamily>(options, query)
    }

    /// List the artifacts of an experiment run
    pub fn get_experiment_run_artifacts(
        &self,
        artifact_type: Option<ArtifactType>,
        options: &ListOptions,
        experiment_run_id: &str,
    ) -> Result<ListPage<Artifact>> {
        self.fetch_node::<ExperimentRunFamily>(parse_id(experiment_run_id, ExperimentRunFamily::LABEL)?)?;
        self.get_artifacts(artifact_type, options, Some(experiment_run_id))
    }

    /// Get a model artifact by id
    pub fn get_model_artifact_by_id(&self, id: &str) -> Result<ModelArtifact> {
        expect_model_artifact(self.get_artifact_by_id(id)?)
    }

    /// Find one model artifact by name (within a model version) and/or external id
    pub fn get_model_artifact_by_params(
        &self,
        name: Option<&str>,
        model_version_id: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<ModelArtifact> {
        let query = self
            .artifact_params(name, model_version_id, external_id)?
            .and(format!("type = {}", quote(MODEL_ARTIFACT_TYPE)));
        expect_model_artifact(self.find_one::<ArtifactFamily>(query)?)
    }

    /// List model artifacts, optionally only those of one model version
    pub fn get_model_artifacts(
        &self,
        options: &ListOptions,
        model_version_id: Option<&str>,
    ) -> Result<ListPage<ModelArtifact>> {
        let page = self.get_artifacts(Some(ArtifactType::ModelArtifact), options, model_version_id)?;
        let items = page
            .items
            .into_iter()
            .map(expect_model_artifact)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListPage::new(items, page.next_page_token, options.page_size))
    }

    /// Most recent model artifact of a model version
    pub(crate) fn latest_model_artifact(&self, model_version_id: &str) -> Result<ModelArtifact> {
        let query = self
            .children_query::<ArtifactFamily>(model_version_id)?
            .and(format!("type = {}", quote(MODEL_ARTIFACT_TYPE)));
        expect_model_artifact(self.latest::<ArtifactFamily>(query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn types() -> TypeRegistry {
        let store = InMemoryStore::new();
        bootstrap(&store).unwrap();
        TypeRegistry::resolve(&store).unwrap()
    }

    #[test]
    fn test_owned_name_round_trip() {
        let types = types();
        let artifact = Artifact::DocArtifact(DocArtifact {
            meta: EntityMeta::named("readme:v2"),
            uri: Some("s3://docs/readme.md".to_string()),
            ..Default::default()
        });
        let mut node = ArtifactFamily::to_node(&types, &artifact, Some(7)).unwrap();
        assert_eq!(node.name, "7:readme:v2");

        node.id = Some(3);
        let back = ArtifactFamily::to_domain(&types, &node).unwrap();
        assert_eq!(back.name(), Some("readme:v2"));
    }

    #[test]
    fn test_standalone_name_cannot_look_owned() {
        let types = types();
        let artifact = Artifact::Parameter(Parameter {
            meta: EntityMeta::named("12:lr"),
            ..Default::default()
        });
        assert!(matches!(
            ArtifactFamily::to_node(&types, &artifact, None),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_unknown_type_id_is_bad_request() {
        let types = types();
        let node = ArtifactNode {
            id: Some(1),
            type_id: 9999,
            name: "x".to_string(),
            ..Default::default()
        };
        assert!(matches!(ArtifactFamily::to_domain(&types, &node), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_bad_metric_timestamp() {
        let types = types();
        let metric = Artifact::Metric(Metric {
            meta: EntityMeta::named("loss"),
            timestamp: Some("yesterday".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            ArtifactFamily::to_node(&types, &metric, Some(1)),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_artifact_type_is_not_editable() {
        let existing = Artifact::DocArtifact(DocArtifact::default());
        let mut update = Artifact::DataSet(DataSet::default());
        assert!(ArtifactFamily::override_not_editable(&existing, &mut update).is_err());
    }
}
