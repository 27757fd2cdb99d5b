//! Create-or-update state machine shared by every entity family
//!
//! Create: check the parent argument, fetch the parent, settle the name, map,
//! write the node, write the parent edge, re-fetch.
//! Update: fetch the existing node, apply the not-editable override,
//! re-derive the parent from stored edges, map, write, re-fetch.
//!
//! Nothing here spans store calls atomically. A failure after the node write
//! and before the edge write leaves the node without its parent edge; this is
//! logged and the error is returned.

use tracing::{debug, info, warn};

use crate::core::{Error, Result};
use crate::registry::mapper::parse_id;
use crate::registry::query::{type_in, QueryBuilder};
use crate::registry::{ModelRegistryService, TypeRegistry};
use crate::store::{Association, Attribution, Context, Node, StoreError, StoreImpl};
use crate::system::metrics;
use crate::types::{Entity, ListOptions, ListPage};

/// Whether a missing name is an error or gets generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePolicy {
    /// Missing name is a bad request
    Required,
    /// Missing name is replaced by a random uuid
    Generated,
}

/// Edge linking a node to its owning context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentEdge {
    /// Top-level kind
    None,
    /// Context contained in a context
    ParentContext,
    /// Artifact attributed to a context
    Attribution,
    /// Execution associated with a context
    Association,
}

/// One entity family: a domain kind and the node type(s) it maps to
pub trait Family {
    /// Domain entity
    type Entity: Entity;
    /// Store node kind
    type Node: Node;

    /// Label used in messages and metrics
    const LABEL: &'static str;
    /// What happens to a missing name
    const NAME_POLICY: NamePolicy;
    /// Edge to the parent
    const EDGE: ParentEdge;
    /// Whether creation needs a parent
    const PARENT_REQUIRED: bool;
    /// Label of the parent, for messages
    const PARENT_LABEL: &'static str = "parent";
    /// Store types holding entities of this family
    const TYPES: &'static [&'static str];
    /// Accepted parent types; empty accepts any context
    const PARENT_TYPES: &'static [&'static str] = &[];

    /// Discard client changes to immutable fields
    fn override_not_editable(existing: &Self::Entity, update: &mut Self::Entity) -> Result<()>;

    /// Map an entity (name already settled) to a node
    fn to_node(types: &TypeRegistry, entity: &Self::Entity, parent: Option<i64>) -> Result<Self::Node>;

    /// Map a stored node back to an entity
    fn to_domain(types: &TypeRegistry, node: &Self::Node) -> Result<Self::Entity>;
}

/// Settled local name of an entity about to be mapped
pub fn settled_name<E: Entity>(entity: &E) -> Result<&str> {
    entity
        .name()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::bad_request(format!("missing required name for {}", E::KIND)))
}

impl<S: StoreImpl> ModelRegistryService<S> {
    /// Create (id absent) or update (id present) an entity
    pub(crate) fn upsert_entity<F: Family>(&self, entity: F::Entity, parent_id: Option<&str>) -> Result<F::Entity> {
        let (op, result) = match entity.id().map(str::to_string) {
            None => ("create", self.create::<F>(entity, parent_id)),
            Some(id) => ("update", self.update::<F>(&id, entity)),
        };
        metrics::record(F::LABEL, op, &result);
        result
    }

    fn create<F: Family>(&self, mut entity: F::Entity, parent_id: Option<&str>) -> Result<F::Entity> {
        let parent = match (F::EDGE, parent_id) {
            (ParentEdge::None, _) => None,
            (_, Some(parent_id)) => Some(self.parent_context::<F>(parent_id)?.id.unwrap_or_default()),
            (_, None) if F::PARENT_REQUIRED => {
                return Err(Error::bad_request(format!(
                    "missing {} id, cannot create {}",
                    F::PARENT_LABEL,
                    F::LABEL
                )))
            }
            (_, None) => None,
        };

        let meta = entity.meta_mut();
        if meta.name.as_deref().map_or(true, str::is_empty) {
            match F::NAME_POLICY {
                NamePolicy::Required => {
                    return Err(Error::bad_request(format!("missing required name for {}", F::LABEL)))
                }
                NamePolicy::Generated => meta.name = Some(uuid::Uuid::new_v4().to_string()),
            }
        }

        let node = F::to_node(&self.types, &entity, parent)?;
        let id = F::Node::put(&*self.store, vec![node])?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::internal(format!("store returned no id for new {}", F::LABEL)))?;

        if let Some(parent) = parent {
            if let Err(e) = self.link::<F>(id, parent) {
                warn!(kind = F::LABEL, id, parent, error = %e, "node written without its parent edge");
                return Err(e);
            }
        }

        info!(kind = F::LABEL, id, ?parent, "created");
        self.get_entity_by_store_id::<F>(id)
    }

    fn update<F: Family>(&self, id: &str, mut entity: F::Entity) -> Result<F::Entity> {
        let node_id = parse_id(id, F::LABEL)?;
        let existing_node = self.fetch_node::<F>(node_id)?;
        let existing = F::to_domain(&self.types, &existing_node)?;

        entity.meta_mut().name = existing.meta().name.clone();
        F::override_not_editable(&existing, &mut entity)?;

        let parent = self.parent_of::<F>(&existing_node)?;
        let node = F::to_node(&self.types, &entity, parent)?;
        F::Node::put(&*self.store, vec![node])?;

        info!(kind = F::LABEL, id = node_id, "updated");
        self.get_entity_by_store_id::<F>(node_id)
    }

    fn link<F: Family>(&self, child: i64, parent: i64) -> Result<()> {
        match F::EDGE {
            ParentEdge::None => Ok(()),
            ParentEdge::ParentContext => Ok(self.store.put_parent_context(child, parent)?),
            ParentEdge::Attribution => Ok(self.store.put_attributions_and_associations(
                &[Attribution {
                    context_id: parent,
                    artifact_id: child,
                }],
                &[],
            )?),
            ParentEdge::Association => Ok(self.store.put_attributions_and_associations(
                &[],
                &[Association {
                    context_id: parent,
                    execution_id: child,
                }],
            )?),
        }
    }

    /// Fetch and validate the parent context named by a create argument
    pub(crate) fn parent_context<F: Family>(&self, parent_id: &str) -> Result<Context> {
        let id = parse_id(parent_id, F::PARENT_LABEL)?;
        let not_found = || Error::not_found(format!("{} with id {} not found", F::PARENT_LABEL, id));
        let parent = self.store.get_contexts_by_id(&[id])?.into_iter().next().ok_or_else(not_found)?;

        if !F::PARENT_TYPES.is_empty() {
            let type_name = self.types.name_of(parent.type_id).unwrap_or_default();
            if !F::PARENT_TYPES.contains(&type_name) {
                return Err(not_found());
            }
        }
        Ok(parent)
    }

    /// Fetch a node of this family by store id
    pub(crate) fn fetch_node<F: Family>(&self, id: i64) -> Result<F::Node> {
        let not_found = || Error::not_found(format!("{} with id {} not found", F::LABEL, id));
        let node = F::Node::get_by_ids(&*self.store, &[id])?
            .into_iter()
            .next()
            .ok_or_else(not_found)?;

        match self.types.name_of(node.type_id()) {
            Some(name) if F::TYPES.contains(&name) => Ok(node),
            _ => Err(not_found()),
        }
    }

    fn get_entity_by_store_id<F: Family>(&self, id: i64) -> Result<F::Entity> {
        F::to_domain(&self.types, &self.fetch_node::<F>(id)?)
    }

    /// Get an entity by its decimal id
    pub(crate) fn get_entity<F: Family>(&self, id: &str) -> Result<F::Entity> {
        let result = parse_id(id, F::LABEL).and_then(|id| self.get_entity_by_store_id::<F>(id));
        metrics::record(F::LABEL, "get", &result);
        result
    }

    /// List entities of this family matching the accumulated predicates
    pub(crate) fn list_entities<F: Family>(
        &self,
        options: &ListOptions,
        query: QueryBuilder,
    ) -> Result<ListPage<F::Entity>> {
        let result = self.list_nodes::<F>(options, query).and_then(|page| {
            let items = page
                .items
                .iter()
                .map(|node| F::to_domain(&self.types, node))
                .collect::<Result<Vec<_>>>()?;
            Ok(ListPage::new(items, page.next_page_token, options.page_size))
        });
        metrics::record(F::LABEL, "list", &result);
        result
    }

    fn list_nodes<F: Family>(
        &self,
        options: &ListOptions,
        query: QueryBuilder,
    ) -> Result<crate::store::Page<F::Node>> {
        let page = match F::TYPES {
            [single] => F::Node::get_by_type(&*self.store, single, &query.build(options))?,
            many => F::Node::get_all(&*self.store, &query.and(type_in(many)).build(options))?,
        };
        debug!(kind = F::LABEL, items = page.items.len(), "listed");
        Ok(page)
    }

    /// Exactly one entity matching the predicates
    pub(crate) fn find_one<F: Family>(&self, query: QueryBuilder) -> Result<F::Entity> {
        let described = query.filter().unwrap_or_default();
        let page = self.list_nodes::<F>(&ListOptions::page(2), query)?;
        let result = match page.items.as_slice() {
            [] => Err(Error::not_found(format!("no {} found for {}", F::LABEL, described))),
            [node] => F::to_domain(&self.types, node),
            _ => Err(Error::not_found(format!("multiple {}s found for {}", F::LABEL, described))),
        };
        metrics::record(F::LABEL, "find", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityMeta;
    use crate::types::RegisteredModel;

    #[test]
    fn test_settled_name() {
        let unnamed = RegisteredModel::default();
        assert!(matches!(settled_name(&unnamed), Err(Error::BadRequest(_))));

        let named = RegisteredModel {
            meta: EntityMeta::named("m"),
            ..Default::default()
        };
        assert_eq!(settled_name(&named).unwrap(), "m");
    }
}
