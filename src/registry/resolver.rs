//! Relationship resolver
//!
//! Answers "who owns this node" and "what does this parent own" from the
//! stored edges. Client-supplied parent ids are never trusted on update.

use crate::core::{Error, Result};
use crate::registry::mapper::name_prefix;
use crate::registry::query::{child_context_of, linked_to_context, QueryBuilder};
use crate::registry::upsert::{Family, ParentEdge};
use crate::registry::ModelRegistryService;
use crate::store::{Node, OrderField, StoreImpl};
use crate::types::{ListOptions, SortOrder};

/// Structural predicate selecting the children of a parent for a family
pub fn children_predicate<F: Family>(parent_id: i64) -> Option<String> {
    match F::EDGE {
        ParentEdge::None => None,
        ParentEdge::ParentContext => Some(child_context_of(parent_id)),
        ParentEdge::Attribution | ParentEdge::Association => Some(linked_to_context(parent_id)),
    }
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Owning context of a stored node, derived from its edges
    ///
    /// Exactly one owner is required for owned kinds. An artifact may be
    /// attributed to several contexts; its owner is the one its composite name
    /// was built from, and an artifact without a composite name is standalone.
    pub(crate) fn parent_of<F: Family>(&self, node: &F::Node) -> Result<Option<i64>> {
        let id = node
            .id()
            .ok_or_else(|| Error::bad_request(format!("{} has no id", F::LABEL)))?;

        let parents = match F::EDGE {
            ParentEdge::None => return Ok(None),
            ParentEdge::ParentContext => self.store.get_parent_contexts_by_context(id)?,
            ParentEdge::Attribution => self.store.get_contexts_by_artifact(id)?,
            ParentEdge::Association => self.store.get_contexts_by_execution(id)?,
        };
        let mut parent_ids: Vec<i64> = parents.iter().filter_map(|c| c.id).collect();

        if F::EDGE == ParentEdge::Attribution {
            match name_prefix(node.name()).and_then(|p| p.parse::<i64>().ok()) {
                None => return Ok(None),
                Some(owner) => parent_ids.retain(|p| *p == owner),
            }
        }

        match parent_ids.as_slice() {
            [parent] => Ok(Some(*parent)),
            [] => Err(Error::not_found(format!("{} {} has no {}", F::LABEL, id, F::PARENT_LABEL))),
            _ => Err(Error::not_found(format!(
                "{} {} has multiple {}s",
                F::LABEL,
                id,
                F::PARENT_LABEL
            ))),
        }
    }

    /// Query for the children of a validated parent
    pub(crate) fn children_query<F: Family>(&self, parent_id: &str) -> Result<QueryBuilder> {
        let parent = self.parent_context::<F>(parent_id)?;
        let parent_id = parent.id.unwrap_or_default();
        Ok(QueryBuilder::new().and_opt(children_predicate::<F>(parent_id)))
    }

    /// Most recently created entity matching the query
    pub(crate) fn latest<F: Family>(&self, query: QueryBuilder) -> Result<F::Entity> {
        let options = ListOptions {
            page_size: Some(1),
            order_by: Some(OrderField::CreateTime),
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        };
        self.list_entities::<F>(&options, query)?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("no {} found", F::LABEL)))
    }
}
