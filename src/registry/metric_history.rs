//! Metric history: one immutable snapshot per metric write
//!
//! Entries are stored as `"<runId>:<metricName>__<timestamp>"` and attributed
//! to the same context as the metric they snapshot.

use crate::core::{Error, Result};
use crate::registry::artifact::{metric_from_node, metric_node};
use crate::registry::experiment_run::ExperimentRunFamily;
use crate::registry::mapper::{owned_meta, parse_id, prefixed_name};
use crate::registry::query::{linked_to_context, quote, QueryBuilder};
use crate::registry::upsert::{settled_name, Family, NamePolicy, ParentEdge};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::filter::like_escape;
use crate::store::schema::METRIC_HISTORY_TYPE;
use crate::store::{Artifact as ArtifactNode, StoreImpl};
use crate::types::{Artifact, Entity, ListOptions, ListPage, Metric};

pub(crate) struct MetricHistoryFamily;

/// Metric name of a history entry name (`"loss__1700000000000"` → `"loss"`)
fn metric_name(entry: &str) -> &str {
    entry.rsplit_once("__").map_or(entry, |(name, _)| name)
}

/// Predicate selecting the history entries of one metric
///
/// Entries of `n` are `<run>:n__<ts>`; entries of a metric named `n__x` share
/// the prefix but carry a second `__` after it.
fn history_of(run_id: i64, metric: &str) -> String {
    let prefix = like_escape(&format!("{}__", prefixed_name(run_id, metric)));
    format!(
        "name LIKE {} AND name NOT LIKE {}",
        quote(&format!("{}%", prefix)),
        quote(&format!("{}%\\_\\_%", prefix))
    )
}

/// Comma-separated step ids
fn parse_steps(step_ids: &str) -> Result<Vec<i64>> {
    step_ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::bad_request(format!("invalid step id '{}' in stepIds", s)))
        })
        .collect()
}

impl Family for MetricHistoryFamily {
    type Entity = Artifact;
    type Node = ArtifactNode;

    const LABEL: &'static str = "metric history";
    const NAME_POLICY: NamePolicy = NamePolicy::Generated;
    const EDGE: ParentEdge = ParentEdge::Attribution;
    const PARENT_REQUIRED: bool = true;
    const TYPES: &'static [&'static str] = &[METRIC_HISTORY_TYPE];

    fn override_not_editable(existing: &Artifact, _update: &mut Artifact) -> Result<()> {
        Err(Error::bad_request(format!(
            "metric history {} is immutable",
            existing.id().unwrap_or_default()
        )))
    }

    fn to_node(types: &TypeRegistry, entry: &Artifact, parent: Option<i64>) -> Result<ArtifactNode> {
        let Artifact::Metric(metric) = entry else {
            return Err(Error::bad_request(format!(
                "metric history entries must be metrics, got {}",
                entry.artifact_type().as_str()
            )));
        };
        let parent = parent.ok_or_else(|| Error::bad_request("metric history requires a parent"))?;
        metric_node(
            types.id(METRIC_HISTORY_TYPE)?,
            metric,
            prefixed_name(parent, settled_name(entry)?),
        )
    }

    fn to_domain(_types: &TypeRegistry, node: &ArtifactNode) -> Result<Artifact> {
        let mut meta = owned_meta(node)?;
        meta.name = meta.name.as_deref().map(|n| metric_name(n).to_string());
        Ok(Artifact::Metric(metric_from_node(node, meta)?))
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// List the recorded history of an experiment run's metrics
    ///
    /// `name` narrows to one metric, `step_ids` to a comma-separated set of steps.
    pub fn get_experiment_run_metric_history(
        &self,
        name: Option<&str>,
        step_ids: Option<&str>,
        options: &ListOptions,
        experiment_run_id: &str,
    ) -> Result<ListPage<Metric>> {
        let run_id = parse_id(experiment_run_id, ExperimentRunFamily::LABEL)?;
        self.fetch_node::<ExperimentRunFamily>(run_id)?;

        let steps = step_ids.map(parse_steps).transpose()?;
        let query = QueryBuilder::new()
            .and(linked_to_context(run_id))
            .and_opt(name.filter(|n| !n.is_empty()).map(|n| history_of(run_id, n)))
            .and_opt(steps.filter(|s| !s.is_empty()).map(|steps| {
                let list = steps.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
                format!("properties.step.int_value IN ({})", list)
            }));

        let page = self.list_entities::<MetricHistoryFamily>(options, query)?;
        let items = page
            .items
            .into_iter()
            .filter_map(|entry| match entry {
                Artifact::Metric(m) => Some(m),
                _ => None,
            })
            .collect();
        Ok(ListPage::new(items, page.next_page_token, options.page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_strips_timestamp() {
        assert_eq!(metric_name("loss__1700000000000"), "loss");
        assert_eq!(metric_name("val__loss__17"), "val__loss");
        assert_eq!(metric_name("plain"), "plain");
    }

    use crate::store::filter::{parse, FieldPath, Literal, Subject};

    /// Node exposing only its name
    struct Named(&'static str);

    impl Subject for Named {
        fn values(&self, _field: &FieldPath) -> Vec<Literal> {
            vec![Literal::String(self.0.to_string())]
        }
    }

    #[test]
    fn test_history_predicate_selects_one_metric() {
        let expr = parse(&history_of(7, "acc")).unwrap();
        assert!(expr.matches(&Named("7:acc__1700000000000")));
        assert!(!expr.matches(&Named("7:acc__top5__1700000000000")));
        assert!(!expr.matches(&Named("7:accuracy__1700000000000")));
        assert!(!expr.matches(&Named("8:acc__1700000000000")));

        let underscored = parse(&history_of(7, "val_loss")).unwrap();
        assert!(underscored.matches(&Named("7:val_loss__17")));
        assert!(!underscored.matches(&Named("7:valXloss__17")));
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!(parse_steps("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_steps("").unwrap(), Vec::<i64>::new());
        assert!(matches!(parse_steps("1,two"), Err(Error::BadRequest(_))));
    }
}
