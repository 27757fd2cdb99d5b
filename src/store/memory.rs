//! In-memory metadata store
//!
//! Node tables are DashMaps keyed by store id; edges live in ordered sets
//! behind parking_lot locks. Writes are serialized by a single write lock so a
//! batch is validated as a whole (type, schema, uniqueness) before any row is
//! touched. Reads never take the write lock.
//!
//! Timestamps come from a monotonic millisecond clock: two writes never share
//! a timestamp, which keeps time-ordered listings deterministic.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::store::filter::{self, Attribute, FieldPath, Literal, Relation, Subject};
use crate::store::{
    Artifact, Association, Attribution, Context, Execution, ListOperationOptions, MetadataStore, Node,
    NodeKind, OrderBy, OrderField, Page, Properties, StoreError, StoreResult, TypeSchema, Value,
    DEFAULT_PAGE_SIZE,
};

/// One table of nodes of the same kind
struct NodeTable<N: Node> {
    rows: DashMap<i64, N>,
    next_id: AtomicI64,
}

impl<N: Node> NodeTable<N> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn get(&self, id: i64) -> Option<N> {
        self.rows.get(&id).map(|r| r.value().clone())
    }

    fn snapshot(&self) -> Vec<N> {
        self.rows.iter().map(|r| r.value().clone()).collect()
    }
}

/// Position of the last item of a page, encoded into the next-page token
#[derive(Debug, Serialize, Deserialize)]
struct Cursor {
    field: OrderField,
    asc: bool,
    key: SortKey,
    id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
enum SortKey {
    Int(i64),
    Text(String),
}

/// In-memory implementation of the metadata store contract
pub struct InMemoryStore {
    types: DashMap<i64, TypeSchema>,
    type_ids: DashMap<(NodeKind, String), i64>,
    next_type_id: AtomicI64,

    contexts: NodeTable<Context>,
    artifacts: NodeTable<Artifact>,
    executions: NodeTable<Execution>,

    /// (child, parent)
    parent_edges: RwLock<BTreeSet<(i64, i64)>>,
    attributions: RwLock<BTreeSet<Attribution>>,
    associations: RwLock<BTreeSet<Association>>,

    write_lock: Mutex<()>,
    clock: AtomicI64,
    default_page_size: usize,
}

impl InMemoryStore {
    /// Create an empty store with the default page size
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store with a custom default page size
    pub fn with_page_size(default_page_size: usize) -> Self {
        Self {
            types: DashMap::new(),
            type_ids: DashMap::new(),
            next_type_id: AtomicI64::new(1),
            contexts: NodeTable::new(),
            artifacts: NodeTable::new(),
            executions: NodeTable::new(),
            parent_edges: RwLock::new(BTreeSet::new()),
            attributions: RwLock::new(BTreeSet::new()),
            associations: RwLock::new(BTreeSet::new()),
            write_lock: Mutex::new(()),
            clock: AtomicI64::new(0),
            default_page_size: default_page_size.max(1),
        }
    }

    /// Number of nodes across all tables
    pub fn node_count(&self) -> usize {
        self.contexts.rows.len() + self.artifacts.rows.len() + self.executions.rows.len()
    }

    /// Strictly increasing epoch-millis timestamp
    fn tick(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.clock.load(Ordering::Acquire);
        loop {
            let next = now.max(last + 1);
            match self.clock.compare_exchange(last, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    fn type_name(&self, type_id: i64) -> Option<String> {
        self.types.get(&type_id).map(|t| t.name.clone())
    }

    fn check_properties(schema: &TypeSchema, properties: &Properties) -> StoreResult<()> {
        for (name, value) in properties {
            match schema.properties.get(name) {
                None => {
                    return Err(StoreError::invalid_argument(format!(
                        "property '{}' is not declared by type {}",
                        name, schema.name
                    )))
                }
                Some(kind) if *kind != value.kind() => {
                    return Err(StoreError::invalid_argument(format!(
                        "property '{}' of type {} expects {:?}, got {:?}",
                        name,
                        schema.name,
                        kind,
                        value.kind()
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Validate and apply one batch of writes to a table
    fn put_nodes<N: Node>(&self, table: &NodeTable<N>, nodes: Vec<N>) -> StoreResult<Vec<i64>> {
        let _guard = self.write_lock.lock();

        // Validate the whole batch before touching any row
        let mut seen_names: HashMap<(i64, String), Option<i64>> = HashMap::new();
        let mut seen_external: HashMap<String, Option<i64>> = HashMap::new();
        for node in &nodes {
            let schema = self
                .types
                .get(&node.type_id())
                .map(|t| t.value().clone())
                .ok_or_else(|| StoreError::not_found(format!("type id {}", node.type_id())))?;
            if schema.kind != N::KIND {
                return Err(StoreError::invalid_argument(format!(
                    "type {} is a {} type, not a {} type",
                    schema.name,
                    schema.kind,
                    N::KIND
                )));
            }
            if node.name().is_empty() {
                return Err(StoreError::invalid_argument(format!("{} name must not be empty", N::KIND)));
            }
            Self::check_properties(&schema, node.properties())?;

            if let Some(id) = node.id() {
                let existing = table
                    .get(id)
                    .ok_or_else(|| StoreError::not_found(format!("{} id {}", N::KIND, id)))?;
                if existing.type_id() != node.type_id() {
                    return Err(StoreError::invalid_argument(format!(
                        "{} {} cannot change type",
                        N::KIND,
                        id
                    )));
                }
            }

            let name_key = (node.type_id(), node.name().to_string());
            let clash = table.rows.iter().any(|r| {
                r.value().type_id() == node.type_id() && r.value().name() == node.name() && Some(*r.key()) != node.id()
            });
            if clash || seen_names.insert(name_key, node.id()).is_some() {
                return Err(StoreError::already_exists(format!(
                    "{} with type {} and name '{}' already exists",
                    N::KIND,
                    schema.name,
                    node.name()
                )));
            }

            if let Some(external_id) = node.external_id() {
                let clash = table
                    .rows
                    .iter()
                    .any(|r| r.value().external_id() == Some(external_id) && Some(*r.key()) != node.id());
                if clash || seen_external.insert(external_id.to_string(), node.id()).is_some() {
                    return Err(StoreError::already_exists(format!(
                        "{} with external id '{}' already exists",
                        N::KIND,
                        external_id
                    )));
                }
            }
        }

        let mut ids = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            let now = self.tick();
            let id = match node.id() {
                Some(id) => {
                    let created = table.get(id).and_then(|n| n.create_time()).unwrap_or(now);
                    node.set_times(created, now);
                    id
                }
                None => {
                    let id = table.next_id.fetch_add(1, Ordering::SeqCst);
                    node.set_id(id);
                    node.set_times(now, now);
                    id
                }
            };
            table.rows.insert(id, node);
            ids.push(id);
        }
        Ok(ids)
    }

    fn get_nodes<N: Node>(table: &NodeTable<N>, ids: &[i64]) -> Vec<N> {
        ids.iter().filter_map(|id| table.get(*id)).collect()
    }

    /// Filter, order and paginate a candidate set
    fn list<N: Node>(&self, candidates: Vec<N>, options: &ListOperationOptions) -> StoreResult<Page<N>> {
        let expr = match options.filter_query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Some(filter::parse(q)?),
            _ => None,
        };

        let mut items: Vec<N> = match &expr {
            Some(expr) => candidates
                .into_iter()
                .filter(|node| expr.matches(&NodeSubject { store: self, node }))
                .collect(),
            None => candidates,
        };

        let order = options.order_by.unwrap_or(OrderBy {
            field: OrderField::Id,
            is_asc: true,
        });
        items.sort_by(|a, b| compare_position(&position(a, order.field), &position(b, order.field), order.is_asc));

        if let Some(token) = options.next_page_token.as_deref().filter(|t| !t.is_empty()) {
            let cursor = decode_cursor(token)?;
            if cursor.field != order.field || cursor.asc != order.is_asc {
                return Err(StoreError::invalid_argument(
                    "next page token does not match the requested ordering",
                ));
            }
            let after = (cursor.key, cursor.id);
            items.retain(|n| compare_position(&position(n, order.field), &after, order.is_asc) == CmpOrdering::Greater);
        }

        let page_size = options.max_result_size.filter(|s| *s > 0).unwrap_or(self.default_page_size);
        let has_more = items.len() > page_size;
        items.truncate(page_size);

        let next_page_token = match (has_more, items.last()) {
            (true, Some(last)) => {
                let (key, id) = position(last, order.field);
                encode_cursor(&Cursor {
                    field: order.field,
                    asc: order.is_asc,
                    key,
                    id,
                })?
            }
            _ => String::new(),
        };

        Ok(Page { items, next_page_token })
    }

    fn of_type<N: Node>(&self, table: &NodeTable<N>, type_name: &str) -> StoreResult<Vec<N>> {
        let type_id = self
            .type_ids
            .get(&(N::KIND, type_name.to_string()))
            .map(|id| *id)
            .ok_or_else(|| StoreError::not_found(format!("{} type {}", N::KIND, type_name)))?;
        Ok(table.snapshot().into_iter().filter(|n| n.type_id() == type_id).collect())
    }

    fn parents_of(&self, context_id: i64) -> Vec<i64> {
        self.parent_edges
            .read()
            .iter()
            .filter(|(child, _)| *child == context_id)
            .map(|(_, parent)| *parent)
            .collect()
    }

    fn children_of(&self, context_id: i64) -> Vec<i64> {
        self.parent_edges
            .read()
            .iter()
            .filter(|(_, parent)| *parent == context_id)
            .map(|(child, _)| *child)
            .collect()
    }

    fn contexts_of_artifact(&self, artifact_id: i64) -> Vec<i64> {
        self.attributions
            .read()
            .iter()
            .filter(|a| a.artifact_id == artifact_id)
            .map(|a| a.context_id)
            .collect()
    }

    fn contexts_of_execution(&self, execution_id: i64) -> Vec<i64> {
        self.associations
            .read()
            .iter()
            .filter(|a| a.execution_id == execution_id)
            .map(|a| a.context_id)
            .collect()
    }

    /// Contexts related to a node through a filter relation
    fn related<N: Node>(&self, node: &N, relation: Relation) -> Vec<Context> {
        let Some(id) = node.id() else {
            return Vec::new();
        };
        let ids = match (N::KIND, relation) {
            (NodeKind::Context, Relation::ParentContexts) => self.parents_of(id),
            (NodeKind::Context, Relation::ChildContexts) => self.children_of(id),
            (NodeKind::Artifact, Relation::Contexts) => self.contexts_of_artifact(id),
            (NodeKind::Execution, Relation::Contexts) => self.contexts_of_execution(id),
            _ => Vec::new(),
        };
        Self::get_nodes(&self.contexts, &ids)
    }

    fn attribute_values<N: Node>(&self, node: &N, attribute: &Attribute) -> Vec<Literal> {
        let value = match attribute {
            Attribute::Id => node.id().map(Literal::Int),
            Attribute::Name => Some(Literal::String(node.name().to_string())),
            Attribute::ExternalId => node.external_id().map(|s| Literal::String(s.to_string())),
            Attribute::Type => self.type_name(node.type_id()).map(Literal::String),
            Attribute::CreateTime => node.create_time().map(Literal::Int),
            Attribute::LastUpdateTime => node.last_update_time().map(Literal::Int),
            Attribute::Column(column) => node.column(column).map(Literal::String),
            Attribute::Property { custom, name, kind } => {
                let props = if *custom { node.custom_properties() } else { node.properties() };
                props.get(name).filter(|v| v.kind() == *kind).and_then(value_literal)
            }
        };
        value.into_iter().collect()
    }

    fn check_context(&self, id: i64) -> StoreResult<()> {
        if self.contexts.rows.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found(format!("context id {}", id)))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn value_literal(value: &Value) -> Option<Literal> {
    match value {
        Value::Int(i) => Some(Literal::Int(*i)),
        Value::Double(d) => Some(Literal::Double(*d)),
        Value::String(s) => Some(Literal::String(s.clone())),
        Value::Bool(b) => Some(Literal::Bool(*b)),
        Value::Struct(v) => Some(Literal::String(v.to_string())),
        Value::Proto { .. } => None,
    }
}

struct NodeSubject<'a, N: Node> {
    store: &'a InMemoryStore,
    node: &'a N,
}

impl<N: Node> Subject for NodeSubject<'_, N> {
    fn values(&self, field: &FieldPath) -> Vec<Literal> {
        match field.relation {
            None => self.store.attribute_values(self.node, &field.attribute),
            Some(relation) => self
                .store
                .related(self.node, relation)
                .iter()
                .flat_map(|ctx| self.store.attribute_values(ctx, &field.attribute))
                .collect(),
        }
    }
}

fn position<N: Node>(node: &N, field: OrderField) -> (SortKey, i64) {
    let id = node.id().unwrap_or_default();
    let key = match field {
        OrderField::Id => SortKey::Int(id),
        OrderField::CreateTime => SortKey::Int(node.create_time().unwrap_or_default()),
        OrderField::LastUpdateTime => SortKey::Int(node.last_update_time().unwrap_or_default()),
        OrderField::Name => SortKey::Text(node.name().to_string()),
    };
    (key, id)
}

/// Ordering of two positions in listing order (ties broken by id)
fn compare_position(a: &(SortKey, i64), b: &(SortKey, i64), asc: bool) -> CmpOrdering {
    let ord = a.cmp(b);
    if asc {
        ord
    } else {
        ord.reverse()
    }
}

fn encode_cursor(cursor: &Cursor) -> StoreResult<String> {
    let bytes = serde_json::to_vec(cursor).map_err(|e| StoreError::internal(format!("cursor encoding failed: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_cursor(token: &str) -> StoreResult<Cursor> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| StoreError::invalid_argument("malformed next page token"))?;
    serde_json::from_slice(&bytes).map_err(|_| StoreError::invalid_argument("malformed next page token"))
}

impl MetadataStore for InMemoryStore {
    fn put_type(&self, schema: TypeSchema) -> StoreResult<i64> {
        let _guard = self.write_lock.lock();
        let key = (schema.kind, schema.name.clone());

        if let Some(id) = self.type_ids.get(&key).map(|id| *id) {
            let mut existing = self
                .types
                .get_mut(&id)
                .ok_or_else(|| StoreError::internal(format!("type index points at missing type {}", id)))?;
            for (name, kind) in &schema.properties {
                match existing.properties.get(name) {
                    Some(current) if current != kind => {
                        return Err(StoreError::already_exists(format!(
                            "type {} already declares property '{}' as {:?}",
                            schema.name, name, current
                        )))
                    }
                    Some(_) => {}
                    None => {
                        existing.properties.insert(name.clone(), *kind);
                    }
                }
            }
            return Ok(id);
        }

        let id = self.next_type_id.fetch_add(1, Ordering::SeqCst);
        self.types.insert(id, TypeSchema { id: Some(id), ..schema });
        self.type_ids.insert(key, id);
        Ok(id)
    }

    fn get_type(&self, kind: NodeKind, name: &str) -> StoreResult<TypeSchema> {
        self.type_ids
            .get(&(kind, name.to_string()))
            .and_then(|id| self.types.get(&*id).map(|t| t.value().clone()))
            .ok_or_else(|| StoreError::not_found(format!("{} type {}", kind, name)))
    }

    fn put_contexts(&self, contexts: Vec<Context>) -> StoreResult<Vec<i64>> {
        self.put_nodes(&self.contexts, contexts)
    }

    fn get_contexts_by_id(&self, ids: &[i64]) -> StoreResult<Vec<Context>> {
        Ok(Self::get_nodes(&self.contexts, ids))
    }

    fn get_contexts_by_type(&self, type_name: &str, options: &ListOperationOptions) -> StoreResult<Page<Context>> {
        let candidates = self.of_type(&self.contexts, type_name)?;
        self.list(candidates, options)
    }

    fn get_contexts(&self, options: &ListOperationOptions) -> StoreResult<Page<Context>> {
        self.list(self.contexts.snapshot(), options)
    }

    fn put_artifacts(&self, artifacts: Vec<Artifact>) -> StoreResult<Vec<i64>> {
        self.put_nodes(&self.artifacts, artifacts)
    }

    fn get_artifacts_by_id(&self, ids: &[i64]) -> StoreResult<Vec<Artifact>> {
        Ok(Self::get_nodes(&self.artifacts, ids))
    }

    fn get_artifacts_by_type(&self, type_name: &str, options: &ListOperationOptions) -> StoreResult<Page<Artifact>> {
        let candidates = self.of_type(&self.artifacts, type_name)?;
        self.list(candidates, options)
    }

    fn get_artifacts(&self, options: &ListOperationOptions) -> StoreResult<Page<Artifact>> {
        self.list(self.artifacts.snapshot(), options)
    }

    fn put_executions(&self, executions: Vec<Execution>) -> StoreResult<Vec<i64>> {
        self.put_nodes(&self.executions, executions)
    }

    fn get_executions_by_id(&self, ids: &[i64]) -> StoreResult<Vec<Execution>> {
        Ok(Self::get_nodes(&self.executions, ids))
    }

    fn get_executions_by_type(&self, type_name: &str, options: &ListOperationOptions) -> StoreResult<Page<Execution>> {
        let candidates = self.of_type(&self.executions, type_name)?;
        self.list(candidates, options)
    }

    fn get_executions(&self, options: &ListOperationOptions) -> StoreResult<Page<Execution>> {
        self.list(self.executions.snapshot(), options)
    }

    fn put_parent_context(&self, child_id: i64, parent_id: i64) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        self.check_context(child_id)?;
        self.check_context(parent_id)?;
        if child_id == parent_id {
            return Err(StoreError::invalid_argument("a context cannot be its own parent"));
        }
        if !self.parent_edges.write().insert((child_id, parent_id)) {
            return Err(StoreError::already_exists(format!(
                "parent context edge {} -> {}",
                child_id, parent_id
            )));
        }
        Ok(())
    }

    fn get_parent_contexts_by_context(&self, context_id: i64) -> StoreResult<Vec<Context>> {
        Ok(Self::get_nodes(&self.contexts, &self.parents_of(context_id)))
    }

    fn get_children_contexts_by_context(&self, context_id: i64) -> StoreResult<Vec<Context>> {
        Ok(Self::get_nodes(&self.contexts, &self.children_of(context_id)))
    }

    fn put_attributions_and_associations(
        &self,
        attributions: &[Attribution],
        associations: &[Association],
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        for a in attributions {
            self.check_context(a.context_id)?;
            if !self.artifacts.rows.contains_key(&a.artifact_id) {
                return Err(StoreError::not_found(format!("artifact id {}", a.artifact_id)));
            }
        }
        for a in associations {
            self.check_context(a.context_id)?;
            if !self.executions.rows.contains_key(&a.execution_id) {
                return Err(StoreError::not_found(format!("execution id {}", a.execution_id)));
            }
        }
        // Re-writing an existing edge is a no-op
        self.attributions.write().extend(attributions.iter().copied());
        self.associations.write().extend(associations.iter().copied());
        Ok(())
    }

    fn get_contexts_by_artifact(&self, artifact_id: i64) -> StoreResult<Vec<Context>> {
        Ok(Self::get_nodes(&self.contexts, &self.contexts_of_artifact(artifact_id)))
    }

    fn get_contexts_by_execution(&self, execution_id: i64) -> StoreResult<Vec<Context>> {
        Ok(Self::get_nodes(&self.contexts, &self.contexts_of_execution(execution_id)))
    }

    fn get_artifacts_by_context(&self, context_id: i64, options: &ListOperationOptions) -> StoreResult<Page<Artifact>> {
        let ids: Vec<i64> = self
            .attributions
            .read()
            .iter()
            .filter(|a| a.context_id == context_id)
            .map(|a| a.artifact_id)
            .collect();
        self.list(Self::get_nodes(&self.artifacts, &ids), options)
    }

    fn get_executions_by_context(&self, context_id: i64, options: &ListOperationOptions) -> StoreResult<Page<Execution>> {
        let ids: Vec<i64> = self
            .associations
            .read()
            .iter()
            .filter(|a| a.context_id == context_id)
            .map(|a| a.execution_id)
            .collect();
        self.list(Self::get_nodes(&self.executions, &ids), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PropertyKind;

    fn store_with_type() -> (InMemoryStore, i64) {
        let store = InMemoryStore::new();
        let type_id = store
            .put_type(TypeSchema::new(NodeKind::Context, "test.Context").property("owner", PropertyKind::String))
            .unwrap();
        (store, type_id)
    }

    fn context(type_id: i64, name: &str) -> Context {
        Context {
            type_id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_assigns_ids_and_times() {
        let (store, type_id) = store_with_type();
        let ids = store.put_contexts(vec![context(type_id, "a"), context(type_id, "b")]).unwrap();
        assert_eq!(ids, vec![1, 2]);

        let stored = store.get_contexts_by_id(&ids).unwrap();
        assert!(stored[0].create_time_since_epoch.unwrap() < stored[1].create_time_since_epoch.unwrap());
    }

    #[test]
    fn test_duplicate_name_is_already_exists() {
        let (store, type_id) = store_with_type();
        store.put_contexts(vec![context(type_id, "a")]).unwrap();
        let err = store.put_contexts(vec![context(type_id, "a")]).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn test_undeclared_property_is_rejected() {
        let (store, type_id) = store_with_type();
        let mut ctx = context(type_id, "a");
        ctx.properties.insert("color".to_string(), Value::String("red".to_string()));
        assert!(matches!(store.put_contexts(vec![ctx]).unwrap_err(), StoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_update_keeps_create_time() {
        let (store, type_id) = store_with_type();
        let id = store.put_contexts(vec![context(type_id, "a")]).unwrap()[0];
        let before = store.get_contexts_by_id(&[id]).unwrap().remove(0);

        let mut update = before.clone();
        update.properties.insert("owner".to_string(), Value::String("me".to_string()));
        store.put_contexts(vec![update]).unwrap();

        let after = store.get_contexts_by_id(&[id]).unwrap().remove(0);
        assert_eq!(after.create_time_since_epoch, before.create_time_since_epoch);
        assert!(after.last_update_time_since_epoch > before.last_update_time_since_epoch);
    }

    #[test]
    fn test_pagination_follows_cursor() {
        let (store, type_id) = store_with_type();
        for name in ["a", "b", "c", "d", "e"] {
            store.put_contexts(vec![context(type_id, name)]).unwrap();
        }
        let mut options = ListOperationOptions {
            max_result_size: Some(2),
            ..Default::default()
        };
        let mut names = Vec::new();
        loop {
            let page = store.get_contexts_by_type("test.Context", &options).unwrap();
            names.extend(page.items.iter().map(|c| c.name.clone()));
            if page.next_page_token.is_empty() {
                break;
            }
            options.next_page_token = Some(page.next_page_token);
        }
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_parent_filter() {
        let (store, type_id) = store_with_type();
        let ids = store
            .put_contexts(vec![context(type_id, "parent"), context(type_id, "child"), context(type_id, "other")])
            .unwrap();
        store.put_parent_context(ids[1], ids[0]).unwrap();

        let options = ListOperationOptions {
            filter_query: Some(format!("parent_contexts_a.id = {}", ids[0])),
            ..Default::default()
        };
        let page = store.get_contexts_by_type("test.Context", &options).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "child");
    }

    #[test]
    fn test_bad_filter_is_invalid_argument() {
        let (store, _) = store_with_type();
        let options = ListOperationOptions {
            filter_query: Some("name = ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.get_contexts_by_type("test.Context", &options).unwrap_err(),
            StoreError::InvalidArgument(_)
        ));
    }
}
