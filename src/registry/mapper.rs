//! Entity ↔ node conversion helpers
//!
//! The per-family mapping code lives next to each family; this module holds
//! the pieces they share: composite names, id parsing, typed property access
//! and the common meta fields.

use crate::core::{Error, Result};
use crate::store::{Artifact as ArtifactNode, Context, Execution, Node, Properties, Value};
use crate::types::{CustomProperties, EntityMeta, MetadataValue};

/// Separator between the parent id and the local name of an owned node
pub const NAME_SEPARATOR: char = ':';

/// Composite `"<parentId>:<localName>"` name
pub fn prefixed_name(parent_id: i64, local: &str) -> String {
    format!("{}{}{}", parent_id, NAME_SEPARATOR, local)
}

/// Local part of a stored name
///
/// Only a numeric prefix before the first separator is a parent id; anything
/// else is part of the name.
pub fn local_name(stored: &str) -> &str {
    match stored.split_once(NAME_SEPARATOR) {
        Some((prefix, local)) if is_id(prefix) => local,
        _ => stored,
    }
}

fn is_id(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Parent id encoded in a composite name, if any
pub fn name_prefix(stored: &str) -> Option<&str> {
    stored
        .split_once(NAME_SEPARATOR)
        .map(|(prefix, _)| prefix)
        .filter(|p| is_id(p))
}

/// Parse a decimal id crossing the boundary
pub fn parse_id(id: &str, what: &str) -> Result<i64> {
    id.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| Error::bad_request(format!("invalid {} id '{}'", what, id)))
}

/// Parse an optional decimal epoch-millis field
pub fn parse_millis(value: Option<&String>, field: &str) -> Result<Option<i64>> {
    value
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| Error::bad_request(format!("invalid {} '{}'", field, v)))
        })
        .transpose()
}

/// Typed writes into a property map, skipping absent values
pub struct PropertyWriter<'a>(pub &'a mut Properties);

impl PropertyWriter<'_> {
    /// Write a string property
    pub fn string(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), Value::String(v.to_string()));
        }
        self
    }

    /// Write an int property
    pub fn int(&mut self, key: &str, value: Option<i64>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), Value::Int(v));
        }
        self
    }

    /// Write a double property
    pub fn double(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), Value::Double(v));
        }
        self
    }
}

/// Typed reads from a property map; a value of the wrong kind is a bad request
pub struct PropertyReader<'a>(pub &'a Properties);

impl PropertyReader<'_> {
    /// Read a string property
    pub fn string(&self, key: &str) -> Result<Option<String>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(wrong_kind(key, "string", other)),
        }
    }

    /// Read an int property
    pub fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(wrong_kind(key, "int", other)),
        }
    }

    /// Read a double property
    pub fn double(&self, key: &str) -> Result<Option<f64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Double(d)) => Ok(Some(*d)),
            Some(other) => Err(wrong_kind(key, "double", other)),
        }
    }

    /// Read a string property holding an upper-case enum
    pub fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr<Err = Error>,
    {
        self.string(key)?.map(|s| s.parse()).transpose()
    }

    /// Read an int property as a decimal id string
    pub fn id(&self, key: &str) -> Result<Option<String>> {
        Ok(self.int(key)?.map(|i| i.to_string()))
    }
}

fn wrong_kind(key: &str, expected: &str, got: &Value) -> Error {
    Error::bad_request(format!(
        "property '{}' should hold a {} value, found {:?}",
        key,
        expected,
        got.kind()
    ))
}

/// Convert custom properties for the store
pub fn custom_to_store(custom: &CustomProperties) -> Result<Properties> {
    custom
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.to_store(k)?)))
        .collect()
}

/// Convert custom properties from the store
pub fn custom_from_store(custom: &Properties) -> CustomProperties {
    custom
        .iter()
        .map(|(k, v)| (k.clone(), MetadataValue::from_store(v)))
        .collect()
}

/// Node fields every family fills the same way
pub struct NodeBase {
    /// Store id when updating
    pub id: Option<i64>,
    /// Store type id
    pub type_id: i64,
    /// Full stored name (composite for owned nodes)
    pub name: String,
    /// Alternate unique key
    pub external_id: Option<String>,
    /// Fixed properties, `description` already written
    pub properties: Properties,
    /// User-defined properties
    pub custom_properties: Properties,
}

impl NodeBase {
    /// Collect the common fields of an entity
    pub fn new(meta: &EntityMeta, type_id: i64, stored_name: String) -> Result<Self> {
        let id = meta.id.as_deref().map(|id| parse_id(id, "entity")).transpose()?;
        let mut properties = Properties::new();
        PropertyWriter(&mut properties).string("description", meta.description.as_deref());
        Ok(Self {
            id,
            type_id,
            name: stored_name,
            external_id: meta.external_id.clone(),
            properties,
            custom_properties: custom_to_store(&meta.custom_properties)?,
        })
    }

    /// Property writer over the fixed properties
    pub fn props(&mut self) -> PropertyWriter<'_> {
        PropertyWriter(&mut self.properties)
    }

    /// Finish as a context node
    pub fn into_context(self) -> Context {
        Context {
            id: self.id,
            type_id: self.type_id,
            name: self.name,
            external_id: self.external_id,
            properties: self.properties,
            custom_properties: self.custom_properties,
            ..Default::default()
        }
    }

    /// Finish as an artifact node
    pub fn into_artifact(self, uri: Option<String>, state: Option<crate::store::ArtifactState>) -> ArtifactNode {
        ArtifactNode {
            id: self.id,
            type_id: self.type_id,
            name: self.name,
            external_id: self.external_id,
            uri,
            state,
            properties: self.properties,
            custom_properties: self.custom_properties,
            ..Default::default()
        }
    }

    /// Finish as an execution node
    pub fn into_execution(self, last_known_state: Option<crate::store::ExecutionState>) -> Execution {
        Execution {
            id: self.id,
            type_id: self.type_id,
            name: self.name,
            external_id: self.external_id,
            last_known_state,
            properties: self.properties,
            custom_properties: self.custom_properties,
            ..Default::default()
        }
    }
}

/// Common meta fields of a stored node; the name is taken as given
pub fn meta_from_node<N: Node>(node: &N, name: String) -> Result<EntityMeta> {
    Ok(EntityMeta {
        id: node.id().map(|id| id.to_string()),
        name: Some(name),
        external_id: node.external_id().map(str::to_string),
        description: PropertyReader(node.properties()).string("description")?,
        custom_properties: custom_from_store(node.custom_properties()),
        create_time_since_epoch: node.create_time().map(|t| t.to_string()),
        last_update_time_since_epoch: node.last_update_time().map(|t| t.to_string()),
    })
}

/// Common meta fields with the parent prefix stripped from the name
pub fn owned_meta<N: Node>(node: &N) -> Result<EntityMeta> {
    meta_from_node(node, local_name(node.name()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_names() {
        assert_eq!(prefixed_name(1, "v1"), "1:v1");
        assert_eq!(local_name("1:v1"), "v1");
        assert_eq!(local_name("12:a:b"), "a:b");
        assert_eq!(local_name("plain"), "plain");
        assert_eq!(local_name("a:b"), "a:b");
        assert_eq!(name_prefix("12:a:b"), Some("12"));
        assert_eq!(name_prefix("abc:d"), None);
        assert_eq!(name_prefix("plain"), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "model").unwrap(), 42);
        assert!(matches!(parse_id("x", "model"), Err(Error::BadRequest(_))));
        assert!(parse_id("-1", "model").is_err());
    }

    #[test]
    fn test_reader_rejects_wrong_kind() {
        let mut props = Properties::new();
        props.insert("step".to_string(), Value::String("one".to_string()));
        let reader = PropertyReader(&props);
        assert!(matches!(reader.int("step"), Err(Error::BadRequest(_))));
        assert_eq!(reader.string("step").unwrap().as_deref(), Some("one"));
        assert_eq!(reader.double("missing").unwrap(), None);
    }

    #[test]
    fn test_unknown_state_string_is_rejected() {
        use crate::types::LifecycleState;
        let mut props = Properties::new();
        props.insert("state".to_string(), Value::String("SHINY".to_string()));
        let res: Result<Option<LifecycleState>> = PropertyReader(&props).parsed("state");
        assert!(matches!(res, Err(Error::BadRequest(_))));
    }
}
