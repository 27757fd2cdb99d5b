//! HTTP server implementation for the model registry API

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::*;
use crate::core::{AppState, Result};
use crate::store::StoreImpl;

/// Path prefix of every registry route
pub const API_PREFIX: &str = "/api/model_registry/v1alpha3";

fn registry_routes<S: StoreImpl>() -> Router<AppState<S>> {
    Router::new()
        // Registered models
        .route(
            "/registered_models",
            get(list_registered_models::<S>).post(create_registered_model::<S>),
        )
        .route(
            "/registered_models/:id",
            get(get_registered_model::<S>).patch(update_registered_model::<S>),
        )
        .route(
            "/registered_models/:id/versions",
            get(list_registered_model_versions::<S>).post(create_registered_model_version::<S>),
        )
        .route("/registered_model", get(find_registered_model::<S>))
        // Model versions
        .route(
            "/model_versions",
            get(list_model_versions::<S>).post(create_model_version::<S>),
        )
        .route(
            "/model_versions/:id",
            get(get_model_version::<S>).patch(update_model_version::<S>),
        )
        .route(
            "/model_versions/:id/artifacts",
            get(list_model_version_artifacts::<S>).post(upsert_model_version_artifact::<S>),
        )
        .route("/model_version", get(find_model_version::<S>))
        // Model artifacts
        .route(
            "/model_artifacts",
            get(list_model_artifacts::<S>).post(create_model_artifact::<S>),
        )
        .route(
            "/model_artifacts/:id",
            get(get_model_artifact::<S>).patch(update_model_artifact::<S>),
        )
        .route("/model_artifact", get(find_model_artifact::<S>))
        // Artifacts
        .route("/artifacts", get(list_artifacts::<S>).post(create_artifact::<S>))
        .route("/artifacts/:id", get(get_artifact::<S>).patch(update_artifact::<S>))
        .route("/artifact", get(find_artifact::<S>))
        // Serving environments
        .route(
            "/serving_environments",
            get(list_serving_environments::<S>).post(create_serving_environment::<S>),
        )
        .route(
            "/serving_environments/:id",
            get(get_serving_environment::<S>).patch(update_serving_environment::<S>),
        )
        .route(
            "/serving_environments/:id/inference_services",
            get(list_environment_inference_services::<S>).post(create_environment_inference_service::<S>),
        )
        .route("/serving_environment", get(find_serving_environment::<S>))
        // Inference services
        .route(
            "/inference_services",
            get(list_inference_services::<S>).post(create_inference_service::<S>),
        )
        .route(
            "/inference_services/:id",
            get(get_inference_service::<S>).patch(update_inference_service::<S>),
        )
        .route("/inference_services/:id/model", get(get_inference_service_model::<S>))
        .route("/inference_services/:id/version", get(get_inference_service_version::<S>))
        .route("/inference_services/:id/artifact", get(get_inference_service_artifact::<S>))
        .route(
            "/inference_services/:id/serves",
            get(list_inference_service_serves::<S>).post(create_inference_service_serve::<S>),
        )
        .route("/inference_service", get(find_inference_service::<S>))
        // Experiments
        .route(
            "/experiments",
            get(list_experiments::<S>).post(create_experiment::<S>),
        )
        .route(
            "/experiments/:id",
            get(get_experiment::<S>).patch(update_experiment::<S>),
        )
        .route(
            "/experiments/:id/experiment_runs",
            get(list_experiment_experiment_runs::<S>).post(create_experiment_experiment_run::<S>),
        )
        .route("/experiment", get(find_experiment::<S>))
        // Experiment runs
        .route(
            "/experiment_runs",
            get(list_experiment_runs::<S>).post(create_experiment_run::<S>),
        )
        .route(
            "/experiment_runs/:id",
            get(get_experiment_run::<S>).patch(update_experiment_run::<S>),
        )
        .route(
            "/experiment_runs/:id/artifacts",
            get(list_experiment_run_artifacts::<S>).post(upsert_experiment_run_artifact::<S>),
        )
        .route(
            "/experiment_runs/:id/metric_history",
            get(get_experiment_run_metric_history::<S>),
        )
        .route("/experiment_run", get(find_experiment_run::<S>))
}

/// Creates the main application router with all routes and middleware
pub fn create_app<S: StoreImpl>(state: AppState<S>) -> Router {
    let router = Router::new()
        .nest(API_PREFIX, registry_routes::<S>())
        .route("/health", get(health_check::<S>))
        .route("/metrics", get(metrics_handler::<S>));

    let router = if state.config.server.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([CONTENT_TYPE])
            .allow_origin(Any);
        router.layer(cors)
    } else {
        router
    };

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Start the HTTP server and run until `shutdown` resolves
pub async fn start_server<S, F>(addr: SocketAddr, state: AppState<S>, shutdown: F) -> Result<()>
where
    S: StoreImpl,
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting model registry API server on {}", addr);

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}{}", addr, API_PREFIX);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    tracing::info!("Server stopped");
    Ok(())
}
