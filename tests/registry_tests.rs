//! Integration tests for the registry engine.
//!
//! Every test drives a fresh engine over the bundled in-memory store with the
//! registry types bootstrapped.

use std::sync::Arc;

use model_registry::core::ErrorKind;
use model_registry::store::{schema, InMemoryStore, MetadataStore};
use model_registry::types::*;
use model_registry::ModelRegistryService;

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn service() -> ModelRegistryService<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    schema::bootstrap(&*store).unwrap();
    ModelRegistryService::new(store).unwrap()
}

fn registered_model(svc: &ModelRegistryService<InMemoryStore>, name: &str) -> RegisteredModel {
    svc.upsert_registered_model(RegisteredModel {
        meta: EntityMeta::named(name),
        ..Default::default()
    })
    .unwrap()
}

fn version(svc: &ModelRegistryService<InMemoryStore>, model_id: &str, name: &str) -> ModelVersion {
    svc.upsert_model_version(
        ModelVersion {
            meta: EntityMeta::named(name),
            author: Some("alice".to_string()),
            ..Default::default()
        },
        Some(model_id),
    )
    .unwrap()
}

fn experiment_run(svc: &ModelRegistryService<InMemoryStore>) -> ExperimentRun {
    let experiment = svc
        .upsert_experiment(Experiment {
            meta: EntityMeta::named("churn"),
            ..Default::default()
        })
        .unwrap();
    svc.upsert_experiment_run(ExperimentRun::default(), experiment.id())
        .unwrap()
}

fn metric(name: &str, step: i64, value: f64) -> Artifact {
    Artifact::Metric(Metric {
        meta: EntityMeta::named(name),
        value: Some(value),
        step: Some(step),
        ..Default::default()
    })
}

fn kind<T: std::fmt::Debug>(result: model_registry::Result<T>) -> ErrorKind {
    result.unwrap_err().kind()
}

// ─────────────────────────────────────────────
// Model, version, artifact scenario
// ─────────────────────────────────────────────

#[test]
fn test_model_version_artifact_scenario() {
    let svc = service();

    let model = registered_model(&svc, "MyAwesomeModel");
    assert_eq!(model.id(), Some("1"));

    let v1 = version(&svc, "1", "v1");
    assert_eq!(v1.name(), Some("v1"));
    assert_eq!(v1.registered_model_id.as_deref(), Some("1"));

    let stored = svc
        .store()
        .get_contexts_by_id(&[v1.id().unwrap().parse().unwrap()])
        .unwrap();
    assert_eq!(stored[0].name, "1:v1");

    let artifact = svc
        .upsert_model_version_artifact(
            Artifact::ModelArtifact(ModelArtifact {
                meta: EntityMeta::named("Pickle model"),
                uri: Some("s3://models/pickle".to_string()),
                model_format_name: Some("sklearn".to_string()),
                ..Default::default()
            }),
            v1.id(),
        )
        .unwrap();
    assert_eq!(artifact.name(), Some("Pickle model"));

    let listed = svc.get_artifacts(None, &ListOptions::default(), v1.id()).unwrap();
    assert_eq!(listed.size, 1);
    assert_eq!(listed.items, vec![artifact.clone()]);

    let model_artifacts = svc.get_model_artifacts(&ListOptions::default(), v1.id()).unwrap();
    assert_eq!(model_artifacts.size, 1);
    assert_eq!(model_artifacts.items[0].model_format_name.as_deref(), Some("sklearn"));
}

#[test]
fn test_round_trip() {
    let svc = service();
    let mut custom = CustomProperties::new();
    custom.insert("team".to_string(), MetadataValue::string("vision"));
    custom.insert("epochs".to_string(), MetadataValue::int(12));

    let created = svc
        .upsert_registered_model(RegisteredModel {
            meta: EntityMeta {
                name: Some("resnet".to_string()),
                external_id: Some("ext-1".to_string()),
                description: Some("image classifier".to_string()),
                custom_properties: custom,
                ..Default::default()
            },
            owner: Some("bob".to_string()),
            state: Some(LifecycleState::Live),
        })
        .unwrap();

    let fetched = svc.get_registered_model_by_id(created.id().unwrap()).unwrap();
    assert_eq!(fetched, created);
    assert!(fetched.meta.create_time_since_epoch.is_some());

    let by_external = svc.get_registered_model_by_params(None, Some("ext-1")).unwrap();
    assert_eq!(by_external, created);
}

// ─────────────────────────────────────────────
// Parent validation
// ─────────────────────────────────────────────

#[test]
fn test_owned_kinds_require_an_existing_parent() {
    let svc = service();

    let orphan = ModelVersion {
        meta: EntityMeta::named("v1"),
        ..Default::default()
    };
    assert_eq!(kind(svc.upsert_model_version(orphan.clone(), None)), ErrorKind::BadRequest);
    assert_eq!(kind(svc.upsert_model_version(orphan, Some("999"))), ErrorKind::NotFound);

    assert_eq!(
        kind(svc.upsert_experiment_run(ExperimentRun::default(), None)),
        ErrorKind::BadRequest
    );
    assert_eq!(
        kind(svc.upsert_experiment_run(ExperimentRun::default(), Some("999"))),
        ErrorKind::NotFound
    );

    let doc = Artifact::DocArtifact(DocArtifact::default());
    assert_eq!(
        kind(svc.upsert_model_version_artifact(doc.clone(), None)),
        ErrorKind::BadRequest
    );
    assert_eq!(
        kind(svc.upsert_model_version_artifact(doc.clone(), Some("999"))),
        ErrorKind::NotFound
    );
    assert_eq!(
        kind(svc.upsert_experiment_run_artifact(doc.clone(), None)),
        ErrorKind::BadRequest
    );
    assert_eq!(
        kind(svc.upsert_experiment_run_artifact(doc, Some("999"))),
        ErrorKind::NotFound
    );
}

#[test]
fn test_parent_of_the_wrong_kind_is_not_found() {
    let svc = service();
    let experiment = svc
        .upsert_experiment(Experiment {
            meta: EntityMeta::named("exp"),
            ..Default::default()
        })
        .unwrap();

    let res = svc.upsert_model_version(
        ModelVersion {
            meta: EntityMeta::named("v1"),
            ..Default::default()
        },
        experiment.id(),
    );
    assert_eq!(kind(res), ErrorKind::NotFound);
}

#[test]
fn test_serving_entities_require_parents() {
    let svc = service();
    let model = registered_model(&svc, "m");
    let v1 = version(&svc, model.id().unwrap(), "v1");

    let service_without_env = InferenceService {
        registered_model_id: model.meta.id.clone(),
        ..Default::default()
    };
    assert_eq!(
        kind(svc.upsert_inference_service(service_without_env.clone())),
        ErrorKind::BadRequest
    );
    assert_eq!(
        kind(svc.upsert_inference_service(InferenceService {
            serving_environment_id: Some("999".to_string()),
            ..service_without_env
        })),
        ErrorKind::NotFound
    );

    let serve = ServeModel {
        model_version_id: v1.meta.id.clone(),
        ..Default::default()
    };
    assert_eq!(kind(svc.upsert_serve_model(serve.clone(), None)), ErrorKind::BadRequest);
    assert_eq!(kind(svc.upsert_serve_model(serve, Some("999"))), ErrorKind::NotFound);
}

#[test]
fn test_listing_under_missing_parent_is_not_found() {
    let svc = service();
    assert_eq!(
        kind(svc.get_model_versions(&ListOptions::default(), Some("42"))),
        ErrorKind::NotFound
    );
    assert_eq!(
        kind(svc.get_experiment_run_metric_history(None, None, &ListOptions::default(), "42")),
        ErrorKind::NotFound
    );
}

// ─────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────

#[test]
fn test_idempotent_re_update() {
    let svc = service();
    let model = registered_model(&svc, "m");
    let v1 = version(&svc, model.id().unwrap(), "v1");

    let again = svc.upsert_model_version(v1.clone(), None).unwrap();
    assert_eq!(again.id(), v1.id());
    assert_eq!(again.name(), v1.name());
    assert_eq!(again.registered_model_id, v1.registered_model_id);
    assert_eq!(again.meta.create_time_since_epoch, v1.meta.create_time_since_epoch);
}

#[test]
fn test_hostile_update_is_absorbed() {
    let svc = service();
    let model = registered_model(&svc, "m");
    let other = registered_model(&svc, "other");
    let v1 = version(&svc, model.id().unwrap(), "v1");

    let hostile = ModelVersion {
        meta: EntityMeta {
            id: v1.meta.id.clone(),
            name: None,
            description: Some("changed".to_string()),
            ..Default::default()
        },
        registered_model_id: other.meta.id.clone(),
        ..Default::default()
    };
    let updated = svc.upsert_model_version(hostile, other.id()).unwrap();

    assert_eq!(updated.name(), Some("v1"));
    assert_eq!(updated.registered_model_id, model.meta.id);
    assert_eq!(updated.meta.description.as_deref(), Some("changed"));
    assert_eq!(updated.author, None);

    let under_model = svc.get_model_versions(&ListOptions::default(), model.id()).unwrap();
    assert_eq!(under_model.size, 1);
    let under_other = svc.get_model_versions(&ListOptions::default(), other.id()).unwrap();
    assert_eq!(under_other.size, 0);
}

#[test]
fn test_update_of_unknown_id_is_not_found() {
    let svc = service();
    let ghost = RegisteredModel {
        meta: EntityMeta::with_id("77"),
        ..Default::default()
    };
    assert_eq!(kind(svc.upsert_registered_model(ghost)), ErrorKind::NotFound);
}

#[test]
fn test_artifact_type_cannot_change() {
    let svc = service();
    let doc = svc
        .upsert_artifact(
            Artifact::DocArtifact(DocArtifact {
                meta: EntityMeta::named("readme"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();

    let as_dataset = Artifact::DataSet(DataSet {
        meta: EntityMeta::with_id(doc.id().unwrap()),
        ..Default::default()
    });
    assert_eq!(kind(svc.upsert_artifact(as_dataset, None)), ErrorKind::BadRequest);
}

// ─────────────────────────────────────────────
// Uniqueness and lookups
// ─────────────────────────────────────────────

#[test]
fn test_duplicate_create_conflicts() {
    let svc = service();
    let model = registered_model(&svc, "m");
    version(&svc, model.id().unwrap(), "v1");

    let res = svc.upsert_model_version(
        ModelVersion {
            meta: EntityMeta::named("v1"),
            ..Default::default()
        },
        model.id(),
    );
    assert_eq!(kind(res), ErrorKind::Conflict);

    // same local name under another parent is fine
    let other = registered_model(&svc, "other");
    version(&svc, other.id().unwrap(), "v1");
}

#[test]
fn test_ambiguous_lookup_is_not_found() {
    let svc = service();
    for artifact in [
        Artifact::DocArtifact(DocArtifact {
            meta: EntityMeta::named("shared"),
            ..Default::default()
        }),
        Artifact::DataSet(DataSet {
            meta: EntityMeta::named("shared"),
            ..Default::default()
        }),
    ] {
        svc.upsert_artifact(artifact, None).unwrap();
    }

    let err = svc.get_artifact_by_params(Some("shared"), None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("multiple"));
}

#[test]
fn test_by_params_rules() {
    let svc = service();
    let model = registered_model(&svc, "m");
    version(&svc, model.id().unwrap(), "v1");

    assert_eq!(kind(svc.get_registered_model_by_params(None, None)), ErrorKind::BadRequest);
    assert_eq!(
        kind(svc.get_model_version_by_params(Some("v1"), None, None)),
        ErrorKind::BadRequest
    );
    assert_eq!(
        kind(svc.get_model_version_by_params(Some("v2"), model.id(), None)),
        ErrorKind::NotFound
    );

    let found = svc.get_model_version_by_params(Some("v1"), model.id(), None).unwrap();
    assert_eq!(found.name(), Some("v1"));
}

#[test]
fn test_standalone_artifact_names_cannot_look_owned() {
    let svc = service();
    let res = svc.upsert_artifact(
        Artifact::DocArtifact(DocArtifact {
            meta: EntityMeta::named("3:notes"),
            ..Default::default()
        }),
        None,
    );
    assert_eq!(kind(res), ErrorKind::BadRequest);

    let colon = svc
        .upsert_artifact(
            Artifact::DocArtifact(DocArtifact {
                meta: EntityMeta::named("notes:v2"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();
    assert_eq!(colon.name(), Some("notes:v2"));
}

#[test]
fn test_generated_names() {
    let svc = service();
    let artifact = svc
        .upsert_artifact(Artifact::DocArtifact(DocArtifact::default()), None)
        .unwrap();
    let name = artifact.name().unwrap();
    assert!(uuid::Uuid::parse_str(name).is_ok());

    assert_eq!(
        kind(svc.upsert_registered_model(RegisteredModel::default())),
        ErrorKind::BadRequest
    );
}

// ─────────────────────────────────────────────
// Listing
// ─────────────────────────────────────────────

#[test]
fn test_pagination_follows_cursor() {
    let svc = service();
    let model = registered_model(&svc, "m");
    for name in ["a", "b", "c"] {
        version(&svc, model.id().unwrap(), name);
    }

    let first = svc.get_model_versions(&ListOptions::page(1), model.id()).unwrap();
    assert_eq!(first.size, 1);
    assert!(!first.next_page_token.is_empty());

    let rest = svc
        .get_model_versions(&ListOptions::page(2).after(first.next_page_token.clone()), model.id())
        .unwrap();
    assert_eq!(rest.size, 2);
    assert!(rest.next_page_token.is_empty());

    let mut names: Vec<_> = first.items.iter().chain(&rest.items).filter_map(|v| v.name()).collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_last_update_ordering() {
    let svc = service();
    let model = registered_model(&svc, "m");
    let versions: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| version(&svc, model.id().unwrap(), name))
        .collect();

    let mut middle = versions[1].clone();
    middle.meta.description = Some("touched".to_string());
    svc.upsert_model_version(middle, None).unwrap();

    let options = ListOptions {
        order_by: Some(OrderField::LastUpdateTime),
        sort_order: Some(SortOrder::Desc),
        ..Default::default()
    };
    let page = svc.get_model_versions(&options, model.id()).unwrap();
    assert_eq!(page.items[0].id(), versions[1].id());
}

#[test]
fn test_caller_filter_cannot_escape_parent() {
    let svc = service();
    let first = registered_model(&svc, "first");
    let second = registered_model(&svc, "second");
    let a = version(&svc, first.id().unwrap(), "v1");
    let b = version(&svc, second.id().unwrap(), "v1");

    let options = ListOptions {
        filter_query: Some(format!("id = {} OR id = {}", a.id().unwrap(), b.id().unwrap())),
        ..Default::default()
    };
    let page = svc.get_model_versions(&options, first.id()).unwrap();
    assert_eq!(page.size, 1);
    assert_eq!(page.items[0].id(), a.id());
}

// ─────────────────────────────────────────────
// Metrics and history
// ─────────────────────────────────────────────

#[test]
fn test_metric_history_scenario() {
    let svc = service();
    let run = experiment_run(&svc);

    svc.upsert_experiment_run_artifact(metric("accuracy", 1, 0.7), run.id())
        .unwrap();
    svc.upsert_experiment_run_artifact(metric("accuracy", 2, 0.8), run.id())
        .unwrap();

    let all = svc
        .get_experiment_run_metric_history(None, None, &ListOptions::default(), run.id().unwrap())
        .unwrap();
    assert_eq!(all.size, 2);
    assert!(all.items.iter().all(|m| m.meta.name.as_deref() == Some("accuracy")));

    let step_one = svc
        .get_experiment_run_metric_history(None, Some("1"), &ListOptions::default(), run.id().unwrap())
        .unwrap();
    assert_eq!(step_one.size, 1);
    assert_eq!(step_one.items[0].step, Some(1));

    assert_eq!(
        kind(svc.get_experiment_run_metric_history(None, Some("one"), &ListOptions::default(), run.id().unwrap())),
        ErrorKind::BadRequest
    );
}

#[test]
fn test_metric_writes_converge_by_name() {
    let svc = service();
    let run = experiment_run(&svc);

    let first = svc
        .upsert_experiment_run_artifact(metric("loss", 1, 0.9), run.id())
        .unwrap();
    let second = svc
        .upsert_experiment_run_artifact(metric("loss", 2, 0.4), run.id())
        .unwrap();
    assert_eq!(first.id(), second.id());

    let metrics = svc
        .get_experiment_run_artifacts(Some(ArtifactType::Metric), &ListOptions::default(), run.id().unwrap())
        .unwrap();
    assert_eq!(metrics.size, 1);
    match &metrics.items[0] {
        Artifact::Metric(m) => {
            assert_eq!(m.step, Some(2));
            assert_eq!(m.value, Some(0.4));
        }
        other => panic!("expected a metric, got {:?}", other),
    }
}

#[test]
fn test_metric_history_filters_by_name() {
    let svc = service();
    let run = experiment_run(&svc);

    svc.upsert_experiment_run_artifact(metric("loss", 1, 0.9), run.id())
        .unwrap();
    svc.upsert_experiment_run_artifact(metric("loss_val", 1, 1.1), run.id())
        .unwrap();
    svc.upsert_experiment_run_artifact(metric("lossab", 1, 1.2), run.id())
        .unwrap();
    svc.upsert_experiment_run_artifact(metric("loss__top5", 1, 1.3), run.id())
        .unwrap();

    let loss = svc
        .get_experiment_run_metric_history(Some("loss"), None, &ListOptions::default(), run.id().unwrap())
        .unwrap();
    assert_eq!(loss.size, 1);
    assert_eq!(loss.items[0].value, Some(0.9));

    let top5 = svc
        .get_experiment_run_metric_history(Some("loss__top5"), None, &ListOptions::default(), run.id().unwrap())
        .unwrap();
    assert_eq!(top5.size, 1);
    assert_eq!(top5.items[0].meta.name.as_deref(), Some("loss__top5"));
}

#[test]
fn test_artifacts_listing_excludes_history() {
    let svc = service();
    let run = experiment_run(&svc);
    svc.upsert_experiment_run_artifact(metric("f1", 1, 0.5), run.id())
        .unwrap();

    let artifacts = svc
        .get_experiment_run_artifacts(None, &ListOptions::default(), run.id().unwrap())
        .unwrap();
    assert_eq!(artifacts.size, 1);
    assert_eq!(artifacts.items[0].artifact_type(), ArtifactType::Metric);
}

// ─────────────────────────────────────────────
// Serving
// ─────────────────────────────────────────────

#[test]
fn test_inference_service_resolution() {
    let svc = service();
    let model = registered_model(&svc, "m");
    let v1 = version(&svc, model.id().unwrap(), "v1");
    let v2 = version(&svc, model.id().unwrap(), "v2");
    let env = svc
        .upsert_serving_environment(ServingEnvironment {
            meta: EntityMeta::named("prod"),
        })
        .unwrap();

    for uri in ["s3://old", "s3://new"] {
        svc.upsert_model_version_artifact(
            Artifact::ModelArtifact(ModelArtifact {
                uri: Some(uri.to_string()),
                ..Default::default()
            }),
            v2.id(),
        )
        .unwrap();
    }

    let floating = svc
        .upsert_inference_service(InferenceService {
            registered_model_id: model.meta.id.clone(),
            serving_environment_id: env.meta.id.clone(),
            runtime: Some("kserve".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(floating.serving_environment_id, env.meta.id);

    let served = svc.get_model_version_by_inference_service(floating.id().unwrap()).unwrap();
    assert_eq!(served.id(), v2.id());
    let artifact = svc.get_model_artifact_by_inference_service(floating.id().unwrap()).unwrap();
    assert_eq!(artifact.uri.as_deref(), Some("s3://new"));
    let served_model = svc.get_registered_model_by_inference_service(floating.id().unwrap()).unwrap();
    assert_eq!(served_model, model);

    let pinned = svc
        .upsert_inference_service(InferenceService {
            registered_model_id: model.meta.id.clone(),
            serving_environment_id: env.meta.id.clone(),
            model_version_id: v1.meta.id.clone(),
            runtime: Some("triton".to_string()),
            ..Default::default()
        })
        .unwrap();
    let served = svc.get_model_version_by_inference_service(pinned.id().unwrap()).unwrap();
    assert_eq!(served.id(), v1.id());
    assert_eq!(
        kind(svc.get_model_artifact_by_inference_service(pinned.id().unwrap())),
        ErrorKind::NotFound
    );

    let kserve = svc
        .get_inference_services(&ListOptions::default(), env.id(), Some("kserve"))
        .unwrap();
    assert_eq!(kserve.size, 1);
    assert_eq!(kserve.items[0].id(), floating.id());
}

#[test]
fn test_serve_model_lifecycle() {
    let svc = service();
    let model = registered_model(&svc, "m");
    let v1 = version(&svc, model.id().unwrap(), "v1");
    let env = svc
        .upsert_serving_environment(ServingEnvironment {
            meta: EntityMeta::named("staging"),
        })
        .unwrap();
    let inference = svc
        .upsert_inference_service(InferenceService {
            registered_model_id: model.meta.id.clone(),
            serving_environment_id: env.meta.id.clone(),
            ..Default::default()
        })
        .unwrap();

    let serve = svc
        .upsert_serve_model(
            ServeModel {
                model_version_id: v1.meta.id.clone(),
                last_known_state: Some(ExecutionState::Running),
                ..Default::default()
            },
            inference.id(),
        )
        .unwrap();

    let mut done = serve.clone();
    done.last_known_state = Some(ExecutionState::Complete);
    done.model_version_id = Some("999".to_string());
    let done = svc.upsert_serve_model(done, None).unwrap();
    assert_eq!(done.model_version_id, v1.meta.id);
    assert_eq!(done.last_known_state, Some(ExecutionState::Complete));

    let listed = svc.get_serve_models(&ListOptions::default(), inference.id()).unwrap();
    assert_eq!(listed.items, vec![done]);
}
