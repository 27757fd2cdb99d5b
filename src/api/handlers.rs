//! HTTP request handlers for the model registry API
//!
//! Handlers are thin: decode the request, call one engine operation, encode
//! the result. POST creates (or updates when the body carries an id); PATCH
//! merges the body onto the stored entity and writes the full result back.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::core::{AppState, Error, ErrorKind, Result};
use crate::registry::build_list_options;
use crate::store::StoreImpl;
use crate::system::{health, metrics};
use crate::types::{
    Artifact, ArtifactType, Entity, Experiment, ExperimentRun, InferenceService, ListOptions, ListPage, Metric,
    ModelArtifact, ModelVersion, RegisteredModel, ServeModel, ServingEnvironment,
};

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status reason phrase
    pub code: String,
    /// Human readable error
    pub message: String,
}

/// Engine error on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

/// Status code for an error classification
pub fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(self.0.kind());
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        let body = ErrorResponse {
            code: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type of every handler
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Query parameters accepted by listing endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Maximum items per page
    pub page_size: Option<String>,
    /// `ID`, `CREATE_TIME`, `LAST_UPDATE_TIME` or `NAME`
    pub order_by: Option<String>,
    /// `ASC` or `DESC`
    pub sort_order: Option<String>,
    /// Cursor from the previous page
    pub next_page_token: Option<String>,
    /// Filter in the store query language
    pub filter_query: Option<String>,
    /// Artifact listings only
    pub artifact_type: Option<String>,
    /// Owning context, where the listing allows one
    pub parent_resource_id: Option<String>,
    /// Metric name, metric history only
    pub name: Option<String>,
    /// Comma-separated steps, metric history only
    pub step_ids: Option<String>,
    /// Inference service listings only
    pub runtime: Option<String>,
}

impl ListParams {
    fn options(&self) -> Result<ListOptions> {
        build_list_options(
            self.page_size.as_deref(),
            self.order_by.as_deref(),
            self.sort_order.as_deref(),
            self.next_page_token.as_deref(),
            self.filter_query.as_deref(),
        )
    }

    fn artifact_type(&self) -> Result<Option<ArtifactType>> {
        present(self.artifact_type.as_deref()).map(str::parse).transpose()
    }
}

/// Query parameters accepted by find-one endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindParams {
    /// Local name
    pub name: Option<String>,
    /// External id
    pub external_id: Option<String>,
    /// Owning context for name lookups of owned kinds
    pub parent_resource_id: Option<String>,
}

impl FindParams {
    fn name(&self) -> Option<&str> {
        present(self.name.as_deref())
    }

    fn external_id(&self) -> Option<&str> {
        present(self.external_id.as_deref())
    }

    fn parent(&self) -> Option<&str> {
        present(self.parent_resource_id.as_deref())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| Error::bad_request(format!("invalid request body: {}", e)))
}

/// Apply a JSON merge patch: objects merge recursively, `null` removes a key
pub fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(map) = target {
                for (key, value) in fields {
                    if value.is_null() {
                        map.remove(&key);
                    } else {
                        merge_patch(map.entry(key).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other,
    }
}

/// Stored entity with a patch applied, addressed by the path id
fn patched<T: Entity>(existing: &T, patch: Value, id: &str) -> Result<T> {
    let mut doc = serde_json::to_value(existing)?;
    merge_patch(&mut doc, patch);
    let mut entity: T = parse_body(doc)?;
    entity.meta_mut().id = Some(id.to_string());
    Ok(entity)
}

/// 201 for a create, 200 for an update through POST
fn upserted<T: Serialize>(was_update: bool, entity: T) -> Response {
    let status = if was_update { StatusCode::OK } else { StatusCode::CREATED };
    (status, Json(entity)).into_response()
}

// System handlers

/// Liveness and readiness report
pub async fn health_check<S: StoreImpl>(State(state): State<AppState<S>>) -> Json<health::HealthStatus> {
    Json(health::check(state.service.types().is_complete()))
}

/// Prometheus text exposition
pub async fn metrics_handler<S: StoreImpl>(State(state): State<AppState<S>>) -> ApiResult<Response> {
    if !state.config.metrics.enable_prometheus {
        return Err(Error::not_found("metrics are disabled").into());
    }
    let body = metrics::gather()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}

// Registered models

/// List registered models
pub async fn list_registered_models<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<RegisteredModel>>> {
    Ok(Json(state.service.get_registered_models(&params.options()?)?))
}

/// Create a registered model, or update it when the body carries an id
pub async fn create_registered_model<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let model: RegisteredModel = parse_body(body)?;
    let was_update = model.id().is_some();
    Ok(upserted(was_update, state.service.upsert_registered_model(model)?))
}

/// Get a registered model by id
pub async fn get_registered_model<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RegisteredModel>> {
    Ok(Json(state.service.get_registered_model_by_id(&id)?))
}

/// Merge a patch onto a registered model
pub async fn update_registered_model<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<RegisteredModel>> {
    let existing = state.service.get_registered_model_by_id(&id)?;
    let model = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_registered_model(model)?))
}

/// Find one registered model by name and/or external id
pub async fn find_registered_model<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<RegisteredModel>> {
    Ok(Json(
        state
            .service
            .get_registered_model_by_params(params.name(), params.external_id())?,
    ))
}

/// Versions of one registered model
pub async fn list_registered_model_versions<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ModelVersion>>> {
    Ok(Json(state.service.get_model_versions(&params.options()?, Some(&id))?))
}

/// Create a version under the registered model in the path
pub async fn create_registered_model_version<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let version: ModelVersion = parse_body(body)?;
    let was_update = version.id().is_some();
    Ok(upserted(was_update, state.service.upsert_model_version(version, Some(&id))?))
}

// Model versions

/// List model versions
pub async fn list_model_versions<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ModelVersion>>> {
    Ok(Json(state.service.get_model_versions(
        &params.options()?,
        present(params.parent_resource_id.as_deref()),
    )?))
}

/// Create a model version, or update it when the body carries an id
pub async fn create_model_version<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let version: ModelVersion = parse_body(body)?;
    let was_update = version.id().is_some();
    Ok(upserted(was_update, state.service.upsert_model_version(version, None)?))
}

/// Get a model version by id
pub async fn get_model_version<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ModelVersion>> {
    Ok(Json(state.service.get_model_version_by_id(&id)?))
}

/// Merge a patch onto a model version
pub async fn update_model_version<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<ModelVersion>> {
    let existing = state.service.get_model_version_by_id(&id)?;
    let version = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_model_version(version, None)?))
}

/// Find one model version by name and/or external id
pub async fn find_model_version<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<ModelVersion>> {
    Ok(Json(state.service.get_model_version_by_params(
        params.name(),
        params.parent(),
        params.external_id(),
    )?))
}

/// Artifacts of one model version
pub async fn list_model_version_artifacts<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<Artifact>>> {
    Ok(Json(state.service.get_artifacts(
        params.artifact_type()?,
        &params.options()?,
        Some(&id),
    )?))
}

/// Create or update an artifact of the model version in the path
pub async fn upsert_model_version_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let artifact: Artifact = parse_body(body)?;
    let was_update = artifact.id().is_some();
    Ok(upserted(
        was_update,
        state.service.upsert_model_version_artifact(artifact, Some(&id))?,
    ))
}

// Model artifacts

/// List model artifacts
pub async fn list_model_artifacts<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ModelArtifact>>> {
    Ok(Json(state.service.get_model_artifacts(
        &params.options()?,
        present(params.parent_resource_id.as_deref()),
    )?))
}

/// Create a model artifact, or update it when the body carries an id
pub async fn create_model_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let artifact: ModelArtifact = parse_body(body)?;
    let was_update = artifact.id().is_some();
    Ok(upserted(was_update, state.service.upsert_model_artifact(artifact)?))
}

/// Get a model artifact by id
pub async fn get_model_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ModelArtifact>> {
    Ok(Json(state.service.get_model_artifact_by_id(&id)?))
}

/// Merge a patch onto a model artifact
pub async fn update_model_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<ModelArtifact>> {
    let existing = state.service.get_model_artifact_by_id(&id)?;
    let artifact = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_model_artifact(artifact)?))
}

/// Find one model artifact by name and/or external id
pub async fn find_model_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<ModelArtifact>> {
    Ok(Json(state.service.get_model_artifact_by_params(
        params.name(),
        params.parent(),
        params.external_id(),
    )?))
}

// Artifacts

/// List artifacts
pub async fn list_artifacts<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<Artifact>>> {
    Ok(Json(state.service.get_artifacts(
        params.artifact_type()?,
        &params.options()?,
        present(params.parent_resource_id.as_deref()),
    )?))
}

/// Create or update an artifact, standalone or under `parentResourceId`
pub async fn create_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let artifact: Artifact = parse_body(body)?;
    let was_update = artifact.id().is_some();
    Ok(upserted(
        was_update,
        state.service.upsert_artifact(artifact, params.parent())?,
    ))
}

/// Get a artifact by id
pub async fn get_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Artifact>> {
    Ok(Json(state.service.get_artifact_by_id(&id)?))
}

/// Merge a patch onto a artifact
pub async fn update_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Artifact>> {
    let existing = state.service.get_artifact_by_id(&id)?;
    let artifact = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_artifact(artifact, None)?))
}

/// Find one artifact by name and/or external id
pub async fn find_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<Artifact>> {
    Ok(Json(state.service.get_artifact_by_params(
        params.name(),
        params.parent(),
        params.external_id(),
    )?))
}

// Serving environments

/// List serving environments
pub async fn list_serving_environments<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ServingEnvironment>>> {
    Ok(Json(state.service.get_serving_environments(&params.options()?)?))
}

/// Create a serving environment, or update it when the body carries an id
pub async fn create_serving_environment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let env: ServingEnvironment = parse_body(body)?;
    let was_update = env.id().is_some();
    Ok(upserted(was_update, state.service.upsert_serving_environment(env)?))
}

/// Get a serving environment by id
pub async fn get_serving_environment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ServingEnvironment>> {
    Ok(Json(state.service.get_serving_environment_by_id(&id)?))
}

/// Merge a patch onto a serving environment
pub async fn update_serving_environment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<ServingEnvironment>> {
    let existing = state.service.get_serving_environment_by_id(&id)?;
    let env = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_serving_environment(env)?))
}

/// Find one serving environment by name and/or external id
pub async fn find_serving_environment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<ServingEnvironment>> {
    Ok(Json(
        state
            .service
            .get_serving_environment_by_params(params.name(), params.external_id())?,
    ))
}

/// Inference services of one serving environment
pub async fn list_environment_inference_services<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<InferenceService>>> {
    Ok(Json(state.service.get_inference_services(
        &params.options()?,
        Some(&id),
        present(params.runtime.as_deref()),
    )?))
}

/// Create an inference service in the serving environment of the path
pub async fn create_environment_inference_service<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let mut service: InferenceService = parse_body(body)?;
    let was_update = service.id().is_some();
    if !was_update {
        service.serving_environment_id = Some(id);
    }
    Ok(upserted(was_update, state.service.upsert_inference_service(service)?))
}

// Inference services

/// List inference services
pub async fn list_inference_services<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<InferenceService>>> {
    Ok(Json(state.service.get_inference_services(
        &params.options()?,
        present(params.parent_resource_id.as_deref()),
        present(params.runtime.as_deref()),
    )?))
}

/// Create a inference service, or update it when the body carries an id
pub async fn create_inference_service<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let service: InferenceService = parse_body(body)?;
    let was_update = service.id().is_some();
    Ok(upserted(was_update, state.service.upsert_inference_service(service)?))
}

/// Get a inference service by id
pub async fn get_inference_service<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<InferenceService>> {
    Ok(Json(state.service.get_inference_service_by_id(&id)?))
}

/// Merge a patch onto a inference service
pub async fn update_inference_service<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<InferenceService>> {
    let existing = state.service.get_inference_service_by_id(&id)?;
    let service = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_inference_service(service)?))
}

/// Find one inference service by name and/or external id
pub async fn find_inference_service<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<InferenceService>> {
    Ok(Json(state.service.get_inference_service_by_params(
        params.name(),
        params.parent(),
        params.external_id(),
    )?))
}

/// Registered model served by an inference service
pub async fn get_inference_service_model<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RegisteredModel>> {
    Ok(Json(state.service.get_registered_model_by_inference_service(&id)?))
}

/// Model version served by an inference service
pub async fn get_inference_service_version<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ModelVersion>> {
    Ok(Json(state.service.get_model_version_by_inference_service(&id)?))
}

/// Model artifact served by an inference service
pub async fn get_inference_service_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ModelArtifact>> {
    Ok(Json(state.service.get_model_artifact_by_inference_service(&id)?))
}

/// Serve-model executions of one inference service
pub async fn list_inference_service_serves<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ServeModel>>> {
    Ok(Json(state.service.get_serve_models(&params.options()?, Some(&id))?))
}

/// Record a serve-model execution of the inference service in the path
pub async fn create_inference_service_serve<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let serve: ServeModel = parse_body(body)?;
    let was_update = serve.id().is_some();
    Ok(upserted(was_update, state.service.upsert_serve_model(serve, Some(&id))?))
}

// Experiments

/// List experiments
pub async fn list_experiments<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<Experiment>>> {
    Ok(Json(state.service.get_experiments(&params.options()?)?))
}

/// Create a experiment, or update it when the body carries an id
pub async fn create_experiment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let experiment: Experiment = parse_body(body)?;
    let was_update = experiment.id().is_some();
    Ok(upserted(was_update, state.service.upsert_experiment(experiment)?))
}

/// Get a experiment by id
pub async fn get_experiment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Experiment>> {
    Ok(Json(state.service.get_experiment_by_id(&id)?))
}

/// Merge a patch onto a experiment
pub async fn update_experiment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Experiment>> {
    let existing = state.service.get_experiment_by_id(&id)?;
    let experiment = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_experiment(experiment)?))
}

/// Find one experiment by name and/or external id
pub async fn find_experiment<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<Experiment>> {
    Ok(Json(
        state
            .service
            .get_experiment_by_params(params.name(), params.external_id())?,
    ))
}

/// Runs of one experiment
pub async fn list_experiment_experiment_runs<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ExperimentRun>>> {
    Ok(Json(state.service.get_experiment_runs(&params.options()?, Some(&id))?))
}

/// Create a run under the experiment in the path
pub async fn create_experiment_experiment_run<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let run: ExperimentRun = parse_body(body)?;
    let was_update = run.id().is_some();
    Ok(upserted(was_update, state.service.upsert_experiment_run(run, Some(&id))?))
}

// Experiment runs

/// List experiment runs
pub async fn list_experiment_runs<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<ExperimentRun>>> {
    Ok(Json(state.service.get_experiment_runs(
        &params.options()?,
        present(params.parent_resource_id.as_deref()),
    )?))
}

/// Create a experiment run, or update it when the body carries an id
pub async fn create_experiment_run<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let run: ExperimentRun = parse_body(body)?;
    let was_update = run.id().is_some();
    Ok(upserted(was_update, state.service.upsert_experiment_run(run, None)?))
}

/// Get a experiment run by id
pub async fn get_experiment_run<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExperimentRun>> {
    Ok(Json(state.service.get_experiment_run_by_id(&id)?))
}

/// Merge a patch onto a experiment run
pub async fn update_experiment_run<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<ExperimentRun>> {
    let existing = state.service.get_experiment_run_by_id(&id)?;
    let run = patched(&existing, patch, &id)?;
    Ok(Json(state.service.upsert_experiment_run(run, None)?))
}

/// Find one experiment run by name and/or external id
pub async fn find_experiment_run<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Query(params): Query<FindParams>,
) -> ApiResult<Json<ExperimentRun>> {
    Ok(Json(state.service.get_experiment_run_by_params(
        params.name(),
        params.parent(),
        params.external_id(),
    )?))
}

/// Artifacts of one experiment run
pub async fn list_experiment_run_artifacts<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<Artifact>>> {
    Ok(Json(state.service.get_experiment_run_artifacts(
        params.artifact_type()?,
        &params.options()?,
        &id,
    )?))
}

/// Create or update an artifact of the experiment run in the path
pub async fn upsert_experiment_run_artifact<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let artifact: Artifact = parse_body(body)?;
    let was_update = artifact.id().is_some();
    Ok(upserted(
        was_update,
        state.service.upsert_experiment_run_artifact(artifact, Some(&id))?,
    ))
}

/// Recorded metric history of one experiment run
pub async fn get_experiment_run_metric_history<S: StoreImpl>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListPage<Metric>>> {
    Ok(Json(state.service.get_experiment_run_metric_history(
        present(params.name.as_deref()),
        present(params.step_ids.as_deref()),
        &params.options()?,
        &id,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch() {
        let mut doc = json!({"name": "m", "owner": "a", "customProperties": {"k": {"x": 1}}});
        merge_patch(
            &mut doc,
            json!({"owner": null, "description": "d", "customProperties": {"j": {"y": 2}}}),
        );
        assert_eq!(
            doc,
            json!({"name": "m", "description": "d", "customProperties": {"k": {"x": 1}, "j": {"y": 2}}})
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(ErrorKind::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_of(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_patch_keeps_path_id() {
        let existing = RegisteredModel {
            meta: crate::types::EntityMeta::with_id("4"),
            owner: Some("a".to_string()),
            ..Default::default()
        };
        let model = patched(&existing, json!({"id": "99", "owner": "b"}), "4").unwrap();
        assert_eq!(model.id(), Some("4"));
        assert_eq!(model.owner.as_deref(), Some("b"));
    }
}
