//! Custom property values
//!
//! A value has exactly one kind, carried in the `metadataType` tag. Integers
//! travel as decimal strings so they survive JSON number precision; struct and
//! proto payloads travel base64-encoded.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::store::Value;

/// One typed custom property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metadataType")]
pub enum MetadataValue {
    /// 64-bit integer as a decimal string
    MetadataIntValue {
        /// Decimal integer
        #[serde(rename = "intValue")]
        int_value: String,
    },
    /// Float
    MetadataDoubleValue {
        /// Value
        #[serde(rename = "doubleValue")]
        double_value: f64,
    },
    /// Text
    MetadataStringValue {
        /// Value
        #[serde(rename = "stringValue")]
        string_value: String,
    },
    /// JSON document, base64-encoded
    MetadataStructValue {
        /// Base64 JSON text
        #[serde(rename = "structValue")]
        struct_value: String,
    },
    /// Protobuf message with its type url, payload base64-encoded
    MetadataProtoValue {
        /// Fully qualified message type
        #[serde(rename = "type")]
        type_url: String,
        /// Base64 payload
        #[serde(rename = "protoValue")]
        proto_value: String,
    },
    /// Boolean
    MetadataBoolValue {
        /// Value
        #[serde(rename = "boolValue")]
        bool_value: bool,
    },
}

impl MetadataValue {
    /// Integer value
    pub fn int(value: i64) -> Self {
        MetadataValue::MetadataIntValue {
            int_value: value.to_string(),
        }
    }

    /// Double value
    pub fn double(value: f64) -> Self {
        MetadataValue::MetadataDoubleValue { double_value: value }
    }

    /// String value
    pub fn string(value: impl Into<String>) -> Self {
        MetadataValue::MetadataStringValue {
            string_value: value.into(),
        }
    }

    /// Bool value
    pub fn bool(value: bool) -> Self {
        MetadataValue::MetadataBoolValue { bool_value: value }
    }

    /// Struct value from a JSON document
    pub fn json(value: &serde_json::Value) -> Self {
        MetadataValue::MetadataStructValue {
            struct_value: STANDARD.encode(value.to_string()),
        }
    }

    /// Convert to a store value, rejecting malformed payloads
    pub fn to_store(&self, key: &str) -> Result<Value> {
        let value = match self {
            MetadataValue::MetadataIntValue { int_value } => Value::Int(
                int_value
                    .trim()
                    .parse()
                    .map_err(|_| Error::bad_request(format!("custom property '{}': invalid int value '{}'", key, int_value)))?,
            ),
            MetadataValue::MetadataDoubleValue { double_value } => Value::Double(*double_value),
            MetadataValue::MetadataStringValue { string_value } => Value::String(string_value.clone()),
            MetadataValue::MetadataStructValue { struct_value } => {
                let bytes = STANDARD
                    .decode(struct_value)
                    .map_err(|e| Error::bad_request(format!("custom property '{}': invalid base64: {}", key, e)))?;
                Value::Struct(
                    serde_json::from_slice(&bytes)
                        .map_err(|e| Error::bad_request(format!("custom property '{}': invalid struct: {}", key, e)))?,
                )
            }
            MetadataValue::MetadataProtoValue { type_url, proto_value } => Value::Proto {
                type_url: type_url.clone(),
                value: STANDARD
                    .decode(proto_value)
                    .map_err(|e| Error::bad_request(format!("custom property '{}': invalid base64: {}", key, e)))?,
            },
            MetadataValue::MetadataBoolValue { bool_value } => Value::Bool(*bool_value),
        };
        Ok(value)
    }

    /// Convert from a store value
    pub fn from_store(value: &Value) -> Self {
        match value {
            Value::Int(i) => MetadataValue::int(*i),
            Value::Double(d) => MetadataValue::double(*d),
            Value::String(s) => MetadataValue::string(s.clone()),
            Value::Struct(v) => MetadataValue::json(v),
            Value::Proto { type_url, value } => MetadataValue::MetadataProtoValue {
                type_url: type_url.clone(),
                proto_value: STANDARD.encode(value),
            },
            Value::Bool(b) => MetadataValue::bool(*b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let v = serde_json::to_value(MetadataValue::int(42)).unwrap();
        assert_eq!(v, json!({"metadataType": "MetadataIntValue", "intValue": "42"}));

        let parsed: MetadataValue =
            serde_json::from_value(json!({"metadataType": "MetadataStringValue", "stringValue": "x"})).unwrap();
        assert_eq!(parsed, MetadataValue::string("x"));
    }

    #[test]
    fn test_bad_payloads_are_bad_requests() {
        let bad_int = MetadataValue::MetadataIntValue {
            int_value: "forty".to_string(),
        };
        assert!(matches!(bad_int.to_store("k"), Err(Error::BadRequest(_))));

        let bad_struct = MetadataValue::MetadataStructValue {
            struct_value: "!!!".to_string(),
        };
        assert!(matches!(bad_struct.to_store("k"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_struct_value_decodes_to_json() {
        let value = MetadataValue::json(&json!({"layers": 3})).to_store("k").unwrap();
        assert_eq!(value, Value::Struct(json!({"layers": 3})));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let res: std::result::Result<MetadataValue, _> =
            serde_json::from_value(json!({"metadataType": "MetadataDateValue", "dateValue": "x"}));
        assert!(res.is_err());
    }
}
