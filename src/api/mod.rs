//! # API Module
//!
//! HTTP interface of the model registry. Every registry route lives under
//! `/api/model_registry/v1alpha3`:
//!
//! - `GET|POST /registered_models`, `GET|PATCH /registered_models/{id}`,
//!   `GET|POST /registered_models/{id}/versions`, `GET /registered_model`
//! - `GET|POST /model_versions`, `GET|PATCH /model_versions/{id}`,
//!   `GET|POST /model_versions/{id}/artifacts`, `GET /model_version`
//! - `GET|POST /model_artifacts`, `GET|PATCH /model_artifacts/{id}`, `GET /model_artifact`
//! - `GET|POST /artifacts`, `GET|PATCH /artifacts/{id}`, `GET /artifact`
//! - `GET|POST /serving_environments`, `GET|PATCH /serving_environments/{id}`,
//!   `GET|POST /serving_environments/{id}/inference_services`, `GET /serving_environment`
//! - `GET|POST /inference_services`, `GET|PATCH /inference_services/{id}`,
//!   `GET /inference_services/{id}/model|version|artifact`,
//!   `GET|POST /inference_services/{id}/serves`, `GET /inference_service`
//! - `GET|POST /experiments`, `GET|PATCH /experiments/{id}`,
//!   `GET|POST /experiments/{id}/experiment_runs`, `GET /experiment`
//! - `GET|POST /experiment_runs`, `GET|PATCH /experiment_runs/{id}`,
//!   `GET|POST /experiment_runs/{id}/artifacts`,
//!   `GET /experiment_runs/{id}/metric_history`, `GET /experiment_run`
//!
//! The singular paths find exactly one entity by `name` (with
//! `parentResourceId` for owned kinds) and/or `externalId`.
//!
//! System routes: `GET /health`, `GET /metrics`.

pub mod handlers;
pub mod server;

pub use server::{create_app, start_server, API_PREFIX};
