//! Experiments and experiment runs

use serde::{Deserialize, Serialize};

use crate::types::{impl_entity, wire_enum, EntityMeta, LifecycleState};

/// A group of training runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Owning user or team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
}

wire_enum! {
    /// Progress of an experiment run
    ExperimentRunStatus {
        Scheduled => "SCHEDULED",
        Running => "RUNNING",
        Finished => "FINISHED",
        Failed => "FAILED",
        Killed => "KILLED",
    }
}

/// One run of an experiment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentRun {
    /// Shared entity fields
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Owning user or team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Lifecycle state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleState>,
    /// Run progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExperimentRunStatus>,
    /// Epoch millis, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_since_epoch: Option<String>,
    /// Epoch millis, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_since_epoch: Option<String>,
    /// Owning experiment; fixed at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
}

impl_entity! {
    Experiment => "Experiment",
    ExperimentRun => "ExperimentRun",
}
