//! Domain types exposed by the registry
//!
//! Every entity carries the common [`EntityMeta`] fields flattened into its
//! JSON form, plus its kind-specific optional fields. Ids and timestamps cross
//! the boundary as decimal strings.

/// Typed custom property values
pub mod value;
/// Registered models and model versions
pub mod model;
/// Polymorphic artifacts
pub mod artifact;
/// Serving environments, inference services and serve models
pub mod serving;
/// Experiments and experiment runs
pub mod experiment;
/// Listing options and pages
pub mod list;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use artifact::{Artifact, ArtifactType, DataSet, DocArtifact, Metric, ModelArtifact, Parameter, ParameterType};
pub use experiment::{Experiment, ExperimentRun, ExperimentRunStatus};
pub use list::{ListOptions, ListPage, SortOrder};
pub use model::{ModelVersion, RegisteredModel};
pub use serving::{InferenceService, InferenceServiceState, ServeModel, ServingEnvironment};
pub use value::MetadataValue;

pub use crate::store::{ArtifactState, ExecutionState, OrderField};

/// Free-form typed properties of an entity
pub type CustomProperties = BTreeMap<String, MetadataValue>;

/// Fields shared by every entity kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    /// Store-assigned id (absent on create)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Local name (without any parent prefix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Alternate unique key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User-defined properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_properties: CustomProperties,
    /// Creation time in epoch millis (output only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time_since_epoch: Option<String>,
    /// Last update time in epoch millis (output only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time_since_epoch: Option<String>,
}

impl EntityMeta {
    /// Meta with only a name set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Meta with only an id set
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

/// Common access to the shared fields of a domain entity
pub trait Entity: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human readable kind, used in messages and metrics
    const KIND: &'static str;

    /// Shared fields
    fn meta(&self) -> &EntityMeta;
    /// Shared fields, mutably
    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Store id, if assigned
    fn id(&self) -> Option<&str> {
        self.meta().id.as_deref()
    }

    /// Local name, if set
    fn name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }
}

macro_rules! impl_entity {
    ($($ty:ty => $kind:literal),+ $(,)?) => {
        $(
            impl $crate::types::Entity for $ty {
                const KIND: &'static str = $kind;

                fn meta(&self) -> &$crate::types::EntityMeta {
                    &self.meta
                }

                fn meta_mut(&mut self) -> &mut $crate::types::EntityMeta {
                    &mut self.meta
                }
            }
        )+
    };
}
pub(crate) use impl_entity;

/// Upper-case string enums carried in string properties
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[doc = concat!("`", $text, "`")]
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Wire name of the variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::core::Error;

            fn from_str(s: &str) -> $crate::core::Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::core::Error::bad_request(format!(
                        "unknown {} value '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}
pub(crate) use wire_enum;

wire_enum! {
    /// Lifecycle state of models, versions, experiments and runs
    LifecycleState {
        Live => "LIVE",
        Archived => "ARCHIVED",
    }
}
