//! Metadata store layer
//!
//! This module describes the contract of the lineage-tracking metadata graph
//! store the registry is layered on: three generic node kinds (contexts,
//! artifacts, executions), the edges between them, type schemas and the
//! filter-query language used for listings. The registry engine only talks to
//! the store through [`MetadataStore`], so any backend honouring the contract
//! can be plugged in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Store errors
pub mod error;

/// Filter-query language (parser and evaluator)
pub mod filter;

/// In-memory store backend
pub mod memory;

/// Type schema bootstrap
pub mod schema;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;

/// Store default page size when a listing does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Typed property map of a node
pub type Properties = BTreeMap<String, Value>;

/// Kind of a generic graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Grouping node (models, versions, experiments, ...)
    Context,
    /// Data node with a uri and a state
    Artifact,
    /// Process node with a last known state
    Execution,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Context => write!(f, "context"),
            NodeKind::Artifact => write!(f, "artifact"),
            NodeKind::Execution => write!(f, "execution"),
        }
    }
}

/// Kind tag of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Structured JSON value
    Struct,
    /// Opaque protobuf payload
    Proto,
    /// Boolean
    Bool,
}

impl PropertyKind {
    /// Accessor suffix used by the filter-query language
    pub fn accessor(&self) -> &'static str {
        match self {
            PropertyKind::Int => "int_value",
            PropertyKind::Double => "double_value",
            PropertyKind::String => "string_value",
            PropertyKind::Struct => "struct_value",
            PropertyKind::Proto => "proto_value",
            PropertyKind::Bool => "bool_value",
        }
    }

    /// Parse a filter accessor such as `string_value`
    pub fn from_accessor(accessor: &str) -> Option<Self> {
        match accessor {
            "int_value" => Some(PropertyKind::Int),
            "double_value" => Some(PropertyKind::Double),
            "string_value" => Some(PropertyKind::String),
            "struct_value" => Some(PropertyKind::Struct),
            "proto_value" => Some(PropertyKind::Proto),
            "bool_value" => Some(PropertyKind::Bool),
            _ => None,
        }
    }
}

/// A single property value stored on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Double value
    Double(f64),
    /// String value
    String(String),
    /// Structured value
    Struct(serde_json::Value),
    /// Protobuf value with its type url
    Proto {
        /// Fully qualified message type
        type_url: String,
        /// Serialized message
        value: Vec<u8>,
    },
    /// Boolean value
    Bool(bool),
}

impl Value {
    /// Kind tag of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            Value::Int(_) => PropertyKind::Int,
            Value::Double(_) => PropertyKind::Double,
            Value::String(_) => PropertyKind::String,
            Value::Struct(_) => PropertyKind::Struct,
            Value::Proto { .. } => PropertyKind::Proto,
            Value::Bool(_) => PropertyKind::Bool,
        }
    }
}

/// Lifecycle state of an artifact node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactState {
    /// Not set
    Unknown,
    /// Being written
    Pending,
    /// Available
    Live,
    /// Scheduled for deletion
    MarkedForDeletion,
    /// Deleted
    Deleted,
    /// Write abandoned
    Abandoned,
    /// Points at external data
    Reference,
}

impl ArtifactState {
    /// Upper-case name used in filter queries
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactState::Unknown => "UNKNOWN",
            ArtifactState::Pending => "PENDING",
            ArtifactState::Live => "LIVE",
            ArtifactState::MarkedForDeletion => "MARKED_FOR_DELETION",
            ArtifactState::Deleted => "DELETED",
            ArtifactState::Abandoned => "ABANDONED",
            ArtifactState::Reference => "REFERENCE",
        }
    }
}

impl FromStr for ArtifactState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(ArtifactState::Unknown),
            "PENDING" => Ok(ArtifactState::Pending),
            "LIVE" => Ok(ArtifactState::Live),
            "MARKED_FOR_DELETION" => Ok(ArtifactState::MarkedForDeletion),
            "DELETED" => Ok(ArtifactState::Deleted),
            "ABANDONED" => Ok(ArtifactState::Abandoned),
            "REFERENCE" => Ok(ArtifactState::Reference),
            other => Err(format!("unknown artifact state: {}", other)),
        }
    }
}

/// Last known state of an execution node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    /// Not set
    Unknown,
    /// Not started
    New,
    /// In progress
    Running,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
    /// Served from cache
    Cached,
    /// Stopped before finishing
    Canceled,
}

impl ExecutionState {
    /// Upper-case name used in filter queries
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Unknown => "UNKNOWN",
            ExecutionState::New => "NEW",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Complete => "COMPLETE",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cached => "CACHED",
            ExecutionState::Canceled => "CANCELED",
        }
    }
}

impl FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(ExecutionState::Unknown),
            "NEW" => Ok(ExecutionState::New),
            "RUNNING" => Ok(ExecutionState::Running),
            "COMPLETE" => Ok(ExecutionState::Complete),
            "FAILED" => Ok(ExecutionState::Failed),
            "CACHED" => Ok(ExecutionState::Cached),
            "CANCELED" => Ok(ExecutionState::Canceled),
            other => Err(format!("unknown execution state: {}", other)),
        }
    }
}

/// Registered node type with its fixed property schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Store-assigned type id (absent on registration)
    pub id: Option<i64>,
    /// Node kind the type applies to
    pub kind: NodeKind,
    /// Unique type name, e.g. `kf.RegisteredModel`
    pub name: String,
    /// Declared fixed properties and their kinds
    pub properties: BTreeMap<String, PropertyKind>,
}

impl TypeSchema {
    /// Create a schema for registration
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Declare a fixed property
    pub fn property(mut self, name: &str, kind: PropertyKind) -> Self {
        self.properties.insert(name.to_string(), kind);
        self
    }
}

/// Context node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// Store-assigned id
    pub id: Option<i64>,
    /// Type id from the type registry
    pub type_id: i64,
    /// Name, unique per type
    pub name: String,
    /// Optional alternate unique key
    pub external_id: Option<String>,
    /// Fixed-schema properties
    pub properties: Properties,
    /// Free-form properties
    pub custom_properties: Properties,
    /// Creation time in epoch millis (store computed)
    pub create_time_since_epoch: Option<i64>,
    /// Last update time in epoch millis (store computed)
    pub last_update_time_since_epoch: Option<i64>,
}

/// Artifact node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifact {
    /// Store-assigned id
    pub id: Option<i64>,
    /// Type id from the type registry
    pub type_id: i64,
    /// Name, unique per type
    pub name: String,
    /// Optional alternate unique key
    pub external_id: Option<String>,
    /// Location of the artifact payload
    pub uri: Option<String>,
    /// Lifecycle state
    pub state: Option<ArtifactState>,
    /// Fixed-schema properties
    pub properties: Properties,
    /// Free-form properties
    pub custom_properties: Properties,
    /// Creation time in epoch millis (store computed)
    pub create_time_since_epoch: Option<i64>,
    /// Last update time in epoch millis (store computed)
    pub last_update_time_since_epoch: Option<i64>,
}

/// Execution node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// Store-assigned id
    pub id: Option<i64>,
    /// Type id from the type registry
    pub type_id: i64,
    /// Name, unique per type
    pub name: String,
    /// Optional alternate unique key
    pub external_id: Option<String>,
    /// Last known state of the process
    pub last_known_state: Option<ExecutionState>,
    /// Fixed-schema properties
    pub properties: Properties,
    /// Free-form properties
    pub custom_properties: Properties,
    /// Creation time in epoch millis (store computed)
    pub create_time_since_epoch: Option<i64>,
    /// Last update time in epoch millis (store computed)
    pub last_update_time_since_epoch: Option<i64>,
}

/// Attribution edge: the context owns or produced the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribution {
    /// Owning context
    pub context_id: i64,
    /// Attributed artifact
    pub artifact_id: i64,
}

/// Association edge: the execution ran within the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Association {
    /// Owning context
    pub context_id: i64,
    /// Associated execution
    pub execution_id: i64,
}

/// Field a listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderField {
    /// Node id
    Id,
    /// Creation time
    CreateTime,
    /// Last update time
    LastUpdateTime,
    /// Node name
    Name,
}

/// Ordering of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by
    pub field: OrderField,
    /// Ascending when true
    pub is_asc: bool,
}

/// Generic list options understood by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOperationOptions {
    /// Maximum number of items in the page (store default if absent)
    pub max_result_size: Option<usize>,
    /// Ordering (store default ordering if absent)
    pub order_by: Option<OrderBy>,
    /// Filter query
    pub filter_query: Option<String>,
    /// Opaque cursor returned by a previous page
    pub next_page_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<N> {
    /// Items of the page
    pub items: Vec<N>,
    /// Cursor for the next page; empty when there are no more pages
    pub next_page_token: String,
}

/// Metadata store contract
///
/// Every call is a single synchronous request; the store owns atomicity of
/// each call and nothing spans calls.
pub trait MetadataStore: Send + Sync {
    /// Register a type schema; re-registering with additional properties
    /// extends the schema and keeps the id
    fn put_type(&self, schema: TypeSchema) -> StoreResult<i64>;

    /// Look up a type schema by kind and name
    fn get_type(&self, kind: NodeKind, name: &str) -> StoreResult<TypeSchema>;

    /// Create (id absent) or update (id present) contexts as one batch
    fn put_contexts(&self, contexts: Vec<Context>) -> StoreResult<Vec<i64>>;

    /// Fetch contexts by id; unknown ids are skipped
    fn get_contexts_by_id(&self, ids: &[i64]) -> StoreResult<Vec<Context>>;

    /// List contexts of one type
    fn get_contexts_by_type(&self, type_name: &str, options: &ListOperationOptions) -> StoreResult<Page<Context>>;

    /// List contexts of any type
    fn get_contexts(&self, options: &ListOperationOptions) -> StoreResult<Page<Context>>;

    /// Create or update artifacts as one batch
    fn put_artifacts(&self, artifacts: Vec<Artifact>) -> StoreResult<Vec<i64>>;

    /// Fetch artifacts by id; unknown ids are skipped
    fn get_artifacts_by_id(&self, ids: &[i64]) -> StoreResult<Vec<Artifact>>;

    /// List artifacts of one type
    fn get_artifacts_by_type(&self, type_name: &str, options: &ListOperationOptions) -> StoreResult<Page<Artifact>>;

    /// List artifacts of any type
    fn get_artifacts(&self, options: &ListOperationOptions) -> StoreResult<Page<Artifact>>;

    /// Create or update executions as one batch
    fn put_executions(&self, executions: Vec<Execution>) -> StoreResult<Vec<i64>>;

    /// Fetch executions by id; unknown ids are skipped
    fn get_executions_by_id(&self, ids: &[i64]) -> StoreResult<Vec<Execution>>;

    /// List executions of one type
    fn get_executions_by_type(&self, type_name: &str, options: &ListOperationOptions) -> StoreResult<Page<Execution>>;

    /// List executions of any type
    fn get_executions(&self, options: &ListOperationOptions) -> StoreResult<Page<Execution>>;

    /// Record that `child_id` is contained in `parent_id`
    fn put_parent_context(&self, child_id: i64, parent_id: i64) -> StoreResult<()>;

    /// Parents of a context
    fn get_parent_contexts_by_context(&self, context_id: i64) -> StoreResult<Vec<Context>>;

    /// Children of a context
    fn get_children_contexts_by_context(&self, context_id: i64) -> StoreResult<Vec<Context>>;

    /// Write attribution and association edges
    fn put_attributions_and_associations(
        &self,
        attributions: &[Attribution],
        associations: &[Association],
    ) -> StoreResult<()>;

    /// Contexts an artifact is attributed to
    fn get_contexts_by_artifact(&self, artifact_id: i64) -> StoreResult<Vec<Context>>;

    /// Contexts an execution is associated with
    fn get_contexts_by_execution(&self, execution_id: i64) -> StoreResult<Vec<Context>>;

    /// Artifacts attributed to a context
    fn get_artifacts_by_context(&self, context_id: i64, options: &ListOperationOptions) -> StoreResult<Page<Artifact>>;

    /// Executions associated with a context
    fn get_executions_by_context(&self, context_id: i64, options: &ListOperationOptions) -> StoreResult<Page<Execution>>;
}

/// Helper trait that combines all requirements for store implementations
/// This cleans up generic bounds throughout the codebase
pub trait StoreImpl: MetadataStore + Send + Sync + 'static {}

/// Blanket implementation for any type that meets the requirements
impl<T> StoreImpl for T where T: MetadataStore + Send + Sync + 'static {}

/// Uniform access to the three node kinds
///
/// Lets code that does not care which kind it handles (the in-memory tables,
/// the filter evaluator, the upsert orchestrator) work over all of them.
pub trait Node: Clone + fmt::Debug + Send + Sync + 'static {
    /// Kind of this node
    const KIND: NodeKind;

    /// Store id, absent before the first write
    fn id(&self) -> Option<i64>;
    /// Assign the store id
    fn set_id(&mut self, id: i64);
    /// Id of the node type
    fn type_id(&self) -> i64;
    /// Stored name
    fn name(&self) -> &str;
    /// External id, if set
    fn external_id(&self) -> Option<&str>;
    /// Type-defined properties
    fn properties(&self) -> &Properties;
    /// User-defined properties
    fn custom_properties(&self) -> &Properties;
    /// Creation time in epoch millis
    fn create_time(&self) -> Option<i64>;
    /// Last update time in epoch millis
    fn last_update_time(&self) -> Option<i64>;
    /// Stamp store-computed timestamps
    fn set_times(&mut self, created: i64, updated: i64);
    /// Kind-specific column (`uri`, `state`, `last_known_state`) as text
    fn column(&self, name: &str) -> Option<String>;

    /// Batch write through the matching store call
    fn put<S: MetadataStore + ?Sized>(store: &S, nodes: Vec<Self>) -> StoreResult<Vec<i64>>;
    /// Fetch by ids through the matching store call
    fn get_by_ids<S: MetadataStore + ?Sized>(store: &S, ids: &[i64]) -> StoreResult<Vec<Self>>;
    /// List one type through the matching store call
    fn get_by_type<S: MetadataStore + ?Sized>(
        store: &S,
        type_name: &str,
        options: &ListOperationOptions,
    ) -> StoreResult<Page<Self>>;
    /// List all types through the matching store call
    fn get_all<S: MetadataStore + ?Sized>(store: &S, options: &ListOperationOptions) -> StoreResult<Page<Self>>;
}

macro_rules! impl_node_common {
    () => {
        fn id(&self) -> Option<i64> {
            self.id
        }
        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
        fn type_id(&self) -> i64 {
            self.type_id
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn external_id(&self) -> Option<&str> {
            self.external_id.as_deref()
        }
        fn properties(&self) -> &Properties {
            &self.properties
        }
        fn custom_properties(&self) -> &Properties {
            &self.custom_properties
        }
        fn create_time(&self) -> Option<i64> {
            self.create_time_since_epoch
        }
        fn last_update_time(&self) -> Option<i64> {
            self.last_update_time_since_epoch
        }
        fn set_times(&mut self, created: i64, updated: i64) {
            self.create_time_since_epoch = Some(created);
            self.last_update_time_since_epoch = Some(updated);
        }
    };
}

impl Node for Context {
    const KIND: NodeKind = NodeKind::Context;

    impl_node_common!();

    fn column(&self, _name: &str) -> Option<String> {
        None
    }

    fn put<S: MetadataStore + ?Sized>(store: &S, nodes: Vec<Self>) -> StoreResult<Vec<i64>> {
        store.put_contexts(nodes)
    }

    fn get_by_ids<S: MetadataStore + ?Sized>(store: &S, ids: &[i64]) -> StoreResult<Vec<Self>> {
        store.get_contexts_by_id(ids)
    }

    fn get_by_type<S: MetadataStore + ?Sized>(
        store: &S,
        type_name: &str,
        options: &ListOperationOptions,
    ) -> StoreResult<Page<Self>> {
        store.get_contexts_by_type(type_name, options)
    }

    fn get_all<S: MetadataStore + ?Sized>(store: &S, options: &ListOperationOptions) -> StoreResult<Page<Self>> {
        store.get_contexts(options)
    }
}

impl Node for Artifact {
    const KIND: NodeKind = NodeKind::Artifact;

    impl_node_common!();

    fn column(&self, name: &str) -> Option<String> {
        match name {
            "uri" => self.uri.clone(),
            "state" => self.state.map(|s| s.as_str().to_string()),
            _ => None,
        }
    }

    fn put<S: MetadataStore + ?Sized>(store: &S, nodes: Vec<Self>) -> StoreResult<Vec<i64>> {
        store.put_artifacts(nodes)
    }

    fn get_by_ids<S: MetadataStore + ?Sized>(store: &S, ids: &[i64]) -> StoreResult<Vec<Self>> {
        store.get_artifacts_by_id(ids)
    }

    fn get_by_type<S: MetadataStore + ?Sized>(
        store: &S,
        type_name: &str,
        options: &ListOperationOptions,
    ) -> StoreResult<Page<Self>> {
        store.get_artifacts_by_type(type_name, options)
    }

    fn get_all<S: MetadataStore + ?Sized>(store: &S, options: &ListOperationOptions) -> StoreResult<Page<Self>> {
        store.get_artifacts(options)
    }
}

impl Node for Execution {
    const KIND: NodeKind = NodeKind::Execution;

    impl_node_common!();

    fn column(&self, name: &str) -> Option<String> {
        match name {
            "last_known_state" => self.last_known_state.map(|s| s.as_str().to_string()),
            _ => None,
        }
    }

    fn put<S: MetadataStore + ?Sized>(store: &S, nodes: Vec<Self>) -> StoreResult<Vec<i64>> {
        store.put_executions(nodes)
    }

    fn get_by_ids<S: MetadataStore + ?Sized>(store: &S, ids: &[i64]) -> StoreResult<Vec<Self>> {
        store.get_executions_by_id(ids)
    }

    fn get_by_type<S: MetadataStore + ?Sized>(
        store: &S,
        type_name: &str,
        options: &ListOperationOptions,
    ) -> StoreResult<Page<Self>> {
        store.get_executions_by_type(type_name, options)
    }

    fn get_all<S: MetadataStore + ?Sized>(store: &S, options: &ListOperationOptions) -> StoreResult<Page<Self>> {
        store.get_executions(options)
    }
}
