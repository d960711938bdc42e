// tests/jobs.rs

//! Container and pod jobs end to end against the in-memory engine.

mod common;

use common::{FakeEngine, batch_prompter, container, scripted_prompter, test_config};
use podshift::{ContainerJob, EntityKind, Error, NetworkDecision, PodJob, SilentProgress};

#[test]
fn test_container_job() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    let mut web = container("web", "nginx", &["--network", "appnet"]);
    web.volumes = vec!["webdata".to_string()];
    engine.add_container(web);

    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    let report = ContainerJob::new("web", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap();

    assert_eq!(report.kind, EntityKind::Container);
    assert_eq!(report.migrated, vec!["web"]);
    assert_eq!(report.networks.len(), 1);
    assert_eq!(report.networks[0].decision, NetworkDecision::Created);
    assert_eq!(progress.steps().len(), ContainerJob::STEPS);

    assert_eq!(engine.created, vec!["web"]);
    assert_eq!(engine.stopped, vec!["web"]);
    assert_eq!(engine.exports, vec!["webdata"]);
    assert_eq!(engine.imports.len(), 1);
}

#[test]
fn test_container_job_rejects_missing_and_pod_members() {
    let (_dir, config) = test_config();
    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();

    let mut engine = FakeEngine::new();
    let err = ContainerJob::new("ghost", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap_err();
    assert!(matches!(err, Error::EngineQueryError(_)));

    engine.add_pod("app", &[], vec![container("app-web", "nginx", &[])]);
    let err = ContainerJob::new("app-web", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap_err();
    assert!(err.to_string().contains("pod 'app'"), "{}", err);
    assert!(engine.created.is_empty());
}

#[test]
fn test_container_job_existing_on_destination() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_container(container("web", "nginx", &[]));
    engine.remote_containers.push("web".to_string());

    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    let err = ContainerJob::new("web", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap_err();
    assert!(matches!(err, Error::ConflictError(_)));
    assert!(engine.stopped.is_empty());
}

#[test]
fn test_pod_job() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_pod(
        "app",
        &["--network", "appnet"],
        vec![
            container("app-web", "nginx", &["--pod", "app", "--requires", "app-db"]),
            container("app-db", "postgres", &["--pod", "app"]),
        ],
    );
    if let Some(pod) = engine.local_pods.get_mut("app") {
        pod.volumes = vec!["shared".to_string()];
    }

    let progress = SilentProgress::new();
    let (mut prompter, prompts) = scripted_prompter(vec![true]);
    let report = PodJob::new("app", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap();

    assert_eq!(report.kind, EntityKind::Pod);
    assert_eq!(report.migrated, vec!["app-db", "app-web"]);
    assert_eq!(report.pod_state.as_deref(), Some("Running"));
    assert_eq!(progress.steps().len(), PodJob::STEPS);
    // one question: create the pod network
    assert_eq!(prompts.borrow().len(), 1);

    assert_eq!(engine.remote_pods, vec!["app"]);
    assert_eq!(engine.created, vec!["app-db", "app-web"]);
    assert_eq!(engine.stopped[0], "app");
    assert_eq!(engine.exports, vec!["shared"]);
    assert_eq!(engine.started_pods, vec!["app"]);
}

#[test]
fn test_pod_job_existing_on_destination() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_pod("app", &[], vec![container("app-web", "nginx", &[])]);
    engine.remote_pods.push("app".to_string());

    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    let err = PodJob::new("app", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap_err();

    assert!(matches!(err, Error::ConflictError(_)));
    assert_eq!(engine.remote_pods, vec!["app"]);
    assert!(engine.stopped.is_empty());
}

#[test]
fn test_pod_member_check_failure_leaves_source_running() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_pod(
        "app",
        &[],
        vec![
            container("app-web", "nginx", &["--pod", "app"]),
            container("app-db", "postgres", &["--pod", "app", "--secret", "db-pass"]),
        ],
    );

    // no secret_dir and a batch policy that will not continue without it
    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    let err = PodJob::new("app", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap_err();

    assert!(matches!(err, Error::Declined(_)));
    assert!(engine.stopped.is_empty());
    assert!(engine.remote_pods.is_empty());
    assert!(engine.created.is_empty());
}

#[test]
fn test_pod_members_prepared_before_stop() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_pod(
        "app",
        &[],
        vec![
            container("app-web", "nginx", &["--pod", "app", "--requires", "app-db"]),
            container("app-db", "postgres", &["--pod", "app"]),
        ],
    );
    engine.fail_on("stop_pod");

    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    let report = PodJob::new("app", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap();

    assert_eq!(report.migrated, vec!["app-db", "app-web"]);
    let steps = progress.steps();
    let prepare = steps.iter().position(|s| s == "Prepare pod containers");
    let stop = steps.iter().position(|s| s == "Stop pod on source");
    assert!(prepare < stop, "{:?}", steps);
    // each image is synced once even though app-web is created after app-db
    assert_eq!(engine.image_queries, vec!["nginx", "postgres"]);
}

#[test]
fn test_post_create_failures_are_not_fatal() {
    for op in [
        "remote_init_container",
        "stop_container",
        "remote_start_container",
        "remote_container_running",
    ] {
        let (_dir, config) = test_config();
        let mut engine = FakeEngine::new();
        engine.add_container(container("web", "nginx", &[]));
        engine.fail_on(op);

        let progress = SilentProgress::new();
        let mut prompter = batch_prompter();
        let report = ContainerJob::new("web", &config, &progress)
            .run(&mut engine, &mut prompter)
            .unwrap_or_else(|e| panic!("{} failing aborted the job: {}", op, e));
        assert_eq!(report.migrated, vec!["web"], "{}", op);
        assert_eq!(engine.created, vec!["web"], "{}", op);
    }
}

#[test]
fn test_container_not_running_after_start() {
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_container(container("web", "nginx", &[]));
    engine.start_exits = true;

    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    let report = ContainerJob::new("web", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap();
    assert_eq!(report.migrated, vec!["web"]);
}

#[test]
fn test_volume_failures_in_container_job() {
    let mut web = container("web", "nginx", &[]);
    web.volumes = vec!["webdata".to_string()];

    // import: logged
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_container(web.clone());
    engine.fail_on("remote_import_volume");
    let progress = SilentProgress::new();
    let mut prompter = batch_prompter();
    assert!(
        ContainerJob::new("web", &config, &progress)
            .run(&mut engine, &mut prompter)
            .is_ok()
    );

    // export: fatal
    let (_dir, config) = test_config();
    let mut engine = FakeEngine::new();
    engine.add_container(web);
    engine.fail_on("export_volume");
    let progress = SilentProgress::new();
    let err = ContainerJob::new("web", &config, &progress)
        .run(&mut engine, &mut prompter)
        .unwrap_err();
    assert!(matches!(err, Error::EngineCommandError { .. }));
}
